use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Trivia Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::list_players,
        crate::routes::rooms::get_settings,
        crate::routes::rooms::update_settings,
        crate::routes::games::create_game,
        crate::routes::games::get_game,
        crate::routes::games::delete_game,
        crate::routes::games::list_rounds,
        crate::routes::games::list_questions,
        crate::routes::games::submit_answer,
        crate::routes::games::get_answer,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::room::RoomResponse,
            crate::dto::room::PlayerResponse,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::JoinRoomResponse,
            crate::dto::room::SettingsResponse,
            crate::dto::room::UpdateSettingsRequest,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::GameResponse,
            crate::dto::game::RoundResponse,
            crate::dto::game::QuestionResponse,
            crate::dto::game::QuestionOptionResponse,
            crate::dto::answer::SubmitAnswerRequest,
            crate::dto::answer::AnswerResponse,
            crate::dao::models::Difficulty,
            crate::state::RoundPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Rooms, players and room settings"),
        (name = "games", description = "Game lifecycle, rounds and questions"),
        (name = "answers", description = "Answer submission and lookup"),
    )
)]
pub struct ApiDoc;
