use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        answer::{AnswerResponse, SubmitAnswerRequest},
        game::{CreateGameRequest, GameResponse, QuestionResponse, RoundResponse},
    },
    error::AppError,
    routes::session::SessionHeader,
    services::{
        answer_service::{self, AnswerTarget},
        game_service,
    },
    state::SharedState,
};

/// Game lifecycle, round and answer endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{game_id}", get(get_game).delete(delete_game))
        .route("/games/{game_id}/rounds", get(list_rounds))
        .route(
            "/games/{game_id}/rounds/{round_id}/questions",
            get(list_questions),
        )
        .route(
            "/games/{game_id}/rounds/{round_id}/questions/{question_id}/players/{player_id}",
            post(submit_answer).get(get_answer),
        )
}

/// Start a game in a room; its rounds are scheduled back-to-back from now.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = GameResponse),
        (status = 404, description = "Unknown room"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameResponse>), AppError> {
    let game = game_service::create_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

#[utoipa::path(
    get,
    path = "/games/{game_id}",
    tag = "games",
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game", body = GameResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(game_service::get_game(&state, game_id).await?))
}

/// Delete a game with its rounds, questions and answers. Host only.
#[utoipa::path(
    delete,
    path = "/games/{game_id}",
    tag = "games",
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("x-session-token" = String, Header, description = "Session token of the room host")
    ),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 403, description = "Caller is not the host"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
    session: SessionHeader,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, game_id, session.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/games/{game_id}/rounds",
    tag = "games",
    params(("game_id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Rounds ordered by number", body = [RoundResponse]),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn list_rounds(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<Vec<RoundResponse>>, AppError> {
    Ok(Json(game_service::list_rounds(&state, game_id).await?))
}

/// List the questions of a round once it has started.
#[utoipa::path(
    get,
    path = "/games/{game_id}/rounds/{round_id}/questions",
    tag = "games",
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("round_id" = Uuid, Path, description = "Round identifier")
    ),
    responses(
        (status = 200, description = "Questions with their options", body = [QuestionResponse]),
        (status = 400, description = "Round has not started yet"),
        (status = 404, description = "Unknown game or round")
    )
)]
pub async fn list_questions(
    State(state): State<SharedState>,
    Path((game_id, round_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<QuestionResponse>>, AppError> {
    Ok(Json(
        game_service::list_questions(&state, game_id, round_id).await?,
    ))
}

/// Submit the caller's answer. Accepted only once the round has ended, once per question.
#[utoipa::path(
    post,
    path = "/games/{game_id}/rounds/{round_id}/questions/{question_id}/players/{player_id}",
    tag = "answers",
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("round_id" = Uuid, Path, description = "Round identifier"),
        ("question_id" = Uuid, Path, description = "Question identifier"),
        ("player_id" = Uuid, Path, description = "Answering player"),
        ("x-session-token" = String, Header, description = "Session token bound to the player")
    ),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 201, description = "Answer accepted", body = AnswerResponse),
        (status = 400, description = "Invalid payload or round not closed yet"),
        (status = 403, description = "Caller is not this player"),
        (status = 404, description = "Unknown game, round, question, player or option"),
        (status = 409, description = "Question already answered by this player")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path((game_id, round_id, question_id, player_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    session: SessionHeader,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<(StatusCode, Json<AnswerResponse>), AppError> {
    payload.validate()?;
    let target = AnswerTarget {
        game_id,
        round_id,
        question_id,
        player_id,
    };
    let answer = answer_service::submit(&state, target, payload, session.token()).await?;
    Ok((StatusCode::CREATED, Json(answer)))
}

/// Read back the caller's own answer.
#[utoipa::path(
    get,
    path = "/games/{game_id}/rounds/{round_id}/questions/{question_id}/players/{player_id}",
    tag = "answers",
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("round_id" = Uuid, Path, description = "Round identifier"),
        ("question_id" = Uuid, Path, description = "Question identifier"),
        ("player_id" = Uuid, Path, description = "Answering player"),
        ("x-session-token" = String, Header, description = "Session token bound to the player")
    ),
    responses(
        (status = 200, description = "Recorded answer", body = AnswerResponse),
        (status = 403, description = "Caller is not this player"),
        (status = 404, description = "Unknown target or no answer recorded")
    )
)]
pub async fn get_answer(
    State(state): State<SharedState>,
    Path((game_id, round_id, question_id, player_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    session: SessionHeader,
) -> Result<Json<AnswerResponse>, AppError> {
    let target = AnswerTarget {
        game_id,
        round_id,
        question_id,
        player_id,
    };
    Ok(Json(
        answer_service::lookup(&state, target, session.token()).await?,
    ))
}
