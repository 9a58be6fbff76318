use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Difficulty level configured for a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Trivia room hosting players and a single settings record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub id: Uuid,
    /// Short shareable code handed out to players.
    pub slug: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Settings owned by this room.
    pub settings_id: Uuid,
}

/// Game configuration owned by a room; replaced wholesale by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsEntity {
    /// Primary key of the settings record.
    pub id: Uuid,
    /// Number of rounds materialized when a game starts.
    pub rounds: u32,
    /// Length of every round, in seconds.
    pub time_per_round: u32,
    /// Number of questions expected per round.
    pub questions_per_round: u32,
    /// Difficulty of the question set.
    pub difficulty: Difficulty,
    /// Team size limit.
    pub max_players_per_team: u32,
}

/// Player registered in a room. `is_host` is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Primary key of the player.
    pub id: Uuid,
    /// Room the player joined.
    pub room_id: Uuid,
    /// Display name.
    pub username: String,
    /// Whether the player was the first to join the room.
    pub is_host: bool,
    /// Team the player belongs to, if any.
    pub team_id: Option<Uuid>,
}

/// One playthrough of a room's configured rounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Room the game belongs to.
    pub room_id: Uuid,
    /// Instant the game was started; round 1 opens at this instant.
    pub started_at: SystemTime,
    /// Instant the game ended, `None` while ongoing.
    pub ended_at: Option<SystemTime>,
}

/// Time-boxed window within a game. Invariant: `started_at < ended_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: Uuid,
    /// Game the round belongs to.
    pub game_id: Uuid,
    /// 1-based position of the round inside its game.
    pub number: u32,
    /// Instant the round opens.
    pub started_at: SystemTime,
    /// Instant the round closes.
    pub ended_at: SystemTime,
}

/// Question displayed during a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// Round the question belongs to.
    pub round_id: Uuid,
    /// Free-form type tag (e.g. "multiple_choice", "open").
    pub kind: String,
    /// Display text.
    pub text: String,
    /// Optional media attached to the question.
    pub media_url: Option<String>,
}

/// Selectable option of a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionOptionEntity {
    /// Primary key of the option.
    pub id: Uuid,
    /// Question the option belongs to.
    pub question_id: Uuid,
    /// Display text.
    pub text: String,
    /// Whether picking this option is a correct answer.
    pub is_correct: bool,
}

/// Identity of a ledger entry: at most one response exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub game_id: Uuid,
    pub round_id: Uuid,
    pub question_id: Uuid,
    pub player_id: Uuid,
}

/// Answer submitted by a player for a question. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEntity {
    /// Primary key of the response.
    pub id: Uuid,
    pub game_id: Uuid,
    pub round_id: Uuid,
    pub question_id: Uuid,
    pub player_id: Uuid,
    /// Instant the answer was accepted.
    pub submitted_at: SystemTime,
    /// Free-text reply.
    pub text_reply: Option<String>,
    /// Selected option, if the question offers options.
    pub option_id: Option<Uuid>,
    /// Correctness flag filled in by grading collaborators.
    pub is_correct: Option<bool>,
}

impl ResponseEntity {
    /// Ledger key of this response.
    pub fn key(&self) -> ResponseKey {
        ResponseKey {
            game_id: self.game_id,
            round_id: self.round_id,
            question_id: self.question_id,
            player_id: self.player_id,
        }
    }
}
