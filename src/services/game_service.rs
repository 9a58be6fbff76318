//! Game lifecycle engine: starting a game materializes its back-to-back rounds.

use std::time::{Duration, SystemTime};

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        models::{GameEntity, RoundEntity},
        trivia_store::TriviaStore,
    },
    dto::game::{CreateGameRequest, GameResponse, QuestionResponse, RoundResponse},
    error::ServiceError,
    services::{authorization, room_service::load_room},
    state::{GatedOperation, RoundPhase, SessionToken, SharedState, round_gate},
};

/// Compute the rounds of a game started at `started_at`.
///
/// Round `i` (1-based) covers `[started_at + (i-1)*T, started_at + i*T)` where `T` is
/// `time_per_round` seconds, so consecutive rounds share their boundary instant.
pub fn materialize_rounds(
    game_id: Uuid,
    started_at: SystemTime,
    rounds: u32,
    time_per_round: u32,
) -> Result<Vec<RoundEntity>, ServiceError> {
    if rounds == 0 || time_per_round == 0 {
        return Err(ServiceError::InvalidInput(
            "settings must define at least one round of non-zero length".into(),
        ));
    }

    let overflow = || ServiceError::InvalidInput("round schedule exceeds the clock range".into());
    let length = u64::from(time_per_round);

    (1..=rounds)
        .map(|number| -> Result<RoundEntity, ServiceError> {
            let offset = u64::from(number - 1)
                .checked_mul(length)
                .ok_or_else(overflow)?;
            let round_start = started_at
                .checked_add(Duration::from_secs(offset))
                .ok_or_else(overflow)?;
            let round_end = round_start
                .checked_add(Duration::from_secs(length))
                .ok_or_else(overflow)?;

            Ok(RoundEntity {
                id: Uuid::new_v4(),
                game_id,
                number,
                started_at: round_start,
                ended_at: round_end,
            })
        })
        .collect()
}

pub(crate) async fn load_game(
    store: &dyn TriviaStore,
    game_id: Uuid,
) -> Result<GameEntity, ServiceError> {
    let Some(game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };
    Ok(game)
}

/// Load a round and check it belongs to `game_id`.
pub(crate) async fn load_round(
    store: &dyn TriviaStore,
    game_id: Uuid,
    round_id: Uuid,
) -> Result<RoundEntity, ServiceError> {
    match store.find_round(round_id).await? {
        Some(round) if round.game_id == game_id => Ok(round),
        _ => Err(ServiceError::NotFound(format!(
            "round `{round_id}` not found in game `{game_id}`"
        ))),
    }
}

/// Start a game in a room using the room's current settings.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameResponse, ServiceError> {
    let store = state.require_store().await?;
    let room = load_room(store.as_ref(), request.room_id).await?;
    let Some(settings) = store.find_settings(room.settings_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "settings of room `{}` not found",
            room.id
        )));
    };

    let now = state.now();
    let game = GameEntity {
        id: Uuid::new_v4(),
        room_id: room.id,
        started_at: now,
        ended_at: None,
    };
    let rounds = materialize_rounds(game.id, now, settings.rounds, settings.time_per_round)?;
    let round_count = rounds.len();

    store.create_game(game.clone(), rounds).await?;
    info!(
        game_id = %game.id,
        room_id = %room.id,
        rounds = round_count,
        "game created"
    );
    Ok(game.into())
}

/// Game by id.
pub async fn get_game(state: &SharedState, game_id: Uuid) -> Result<GameResponse, ServiceError> {
    let store = state.require_store().await?;
    Ok(load_game(store.as_ref(), game_id).await?.into())
}

/// Delete a game and everything attached to it. Host of the game's room only.
pub async fn delete_game(
    state: &SharedState,
    game_id: Uuid,
    token: Option<&SessionToken>,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let game = load_game(store.as_ref(), game_id).await?;
    authorization::require_host(state, token, game.room_id)?;

    if !store.delete_game(game_id).await? {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }
    info!(game_id = %game_id, room_id = %game.room_id, "game deleted");
    Ok(())
}

/// Rounds of a game in order, each tagged with its current phase.
pub async fn list_rounds(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<RoundResponse>, ServiceError> {
    let store = state.require_store().await?;
    load_game(store.as_ref(), game_id).await?;

    let now = state.now();
    let rounds = store.list_rounds(game_id).await?;
    Ok(rounds
        .into_iter()
        .map(|round| {
            let phase = RoundPhase::of(&round, now);
            RoundResponse::new(round, phase)
        })
        .collect())
}

/// Questions of a round with their options. Refused until the round opens.
pub async fn list_questions(
    state: &SharedState,
    game_id: Uuid,
    round_id: Uuid,
) -> Result<Vec<QuestionResponse>, ServiceError> {
    let store = state.require_store().await?;
    load_game(store.as_ref(), game_id).await?;
    let round = load_round(store.as_ref(), game_id, round_id).await?;

    if let Err(violation) = round_gate::check(&round, state.now(), GatedOperation::ListQuestions) {
        debug!(round_id = %round_id, phase = ?violation.phase, "question listing refused");
        return Err(violation.into());
    }

    let questions = store.list_questions(round_id).await?;
    let mut listed = Vec::with_capacity(questions.len());
    for question in questions {
        let options = store.list_options(question.id).await?;
        listed.push(QuestionResponse::new(question, options));
    }
    Ok(listed)
}
