//! DTO definitions for games, rounds and the questions revealed during a round.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, QuestionEntity, QuestionOptionEntity, RoundEntity},
    dto::format_system_time,
    state::RoundPhase,
};

/// Payload starting a new game in a room.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateGameRequest {
    pub room_id: Uuid,
}

/// Game as exposed to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GameResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    /// RFC 3339 start timestamp.
    pub started_at: String,
    /// RFC 3339 end timestamp, absent while the game is ongoing.
    pub ended_at: Option<String>,
}

impl From<GameEntity> for GameResponse {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            room_id: value.room_id,
            started_at: format_system_time(value.started_at),
            ended_at: value.ended_at.map(format_system_time),
        }
    }
}

/// Round together with its phase at the time of the request.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundResponse {
    pub id: Uuid,
    pub game_id: Uuid,
    pub number: u32,
    pub started_at: String,
    pub ended_at: String,
    pub phase: RoundPhase,
}

impl RoundResponse {
    pub fn new(round: RoundEntity, phase: RoundPhase) -> Self {
        Self {
            id: round.id,
            game_id: round.game_id,
            number: round.number,
            started_at: format_system_time(round.started_at),
            ended_at: format_system_time(round.ended_at),
            phase,
        }
    }
}

/// Selectable option. Correctness is never exposed.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionOptionResponse {
    pub id: Uuid,
    pub text: String,
}

impl From<QuestionOptionEntity> for QuestionOptionResponse {
    fn from(value: QuestionOptionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub round_id: Uuid,
    /// Question type tag.
    pub kind: String,
    pub text: String,
    pub media_url: Option<String>,
    pub options: Vec<QuestionOptionResponse>,
}

impl QuestionResponse {
    pub fn new(question: QuestionEntity, options: Vec<QuestionOptionEntity>) -> Self {
        Self {
            id: question.id,
            round_id: question.round_id,
            kind: question.kind,
            text: question.text,
            media_url: question.media_url,
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}
