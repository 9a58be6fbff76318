//! DTO definitions for rooms, players and room settings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{Difficulty, PlayerEntity, RoomEntity, SettingsEntity},
    dto::{format_system_time, validation::validate_username},
};

/// Room as exposed to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoomResponse {
    pub id: Uuid,
    /// Short shareable code.
    pub slug: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    pub settings_id: Uuid,
}

impl From<RoomEntity> for RoomResponse {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id,
            slug: value.slug,
            created_at: format_system_time(value.created_at),
            settings_id: value.settings_id,
        }
    }
}

/// Player registered in a room.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlayerResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    pub username: String,
    pub is_host: bool,
    pub team_id: Option<Uuid>,
}

impl From<PlayerEntity> for PlayerResponse {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            room_id: value.room_id,
            username: value.username,
            is_host: value.is_host,
            team_id: value.team_id,
        }
    }
}

/// Request to join a room under a display name.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    /// 1 to 32 characters, surrounding whitespace ignored.
    pub username: String,
}

impl Validate for JoinRoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_username(&self.username) {
            errors.add("username", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Outcome of a join: the new player and the session token now bound to it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinRoomResponse {
    pub player: PlayerResponse,
    /// Token to present in the `x-session-token` header on subsequent calls.
    pub session_token: String,
}

/// Room settings as exposed to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingsResponse {
    pub id: Uuid,
    pub rounds: u32,
    /// Round length in seconds.
    pub time_per_round: u32,
    pub questions_per_round: u32,
    pub difficulty: Difficulty,
    pub max_players_per_team: u32,
}

impl From<SettingsEntity> for SettingsResponse {
    fn from(value: SettingsEntity) -> Self {
        Self {
            id: value.id,
            rounds: value.rounds,
            time_per_round: value.time_per_round,
            questions_per_round: value.questions_per_round,
            difficulty: value.difficulty,
            max_players_per_team: value.max_players_per_team,
        }
    }
}

/// Full replacement of a room's settings. Host only.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(range(min = 1, max = 50))]
    pub rounds: u32,
    #[validate(range(min = 1, max = 3600))]
    pub time_per_round: u32,
    #[validate(range(min = 1, max = 50))]
    pub questions_per_round: u32,
    pub difficulty: Difficulty,
    #[validate(range(min = 1, max = 50))]
    pub max_players_per_team: u32,
}

impl UpdateSettingsRequest {
    /// Apply the request onto an existing settings id.
    pub fn into_entity(self, id: Uuid) -> SettingsEntity {
        SettingsEntity {
            id,
            rounds: self.rounds,
            time_per_round: self.time_per_round,
            questions_per_round: self.questions_per_round,
            difficulty: self.difficulty,
            max_players_per_team: self.max_players_per_team,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(rounds: u32, time_per_round: u32) -> UpdateSettingsRequest {
        UpdateSettingsRequest {
            rounds,
            time_per_round,
            questions_per_round: 5,
            difficulty: Difficulty::Medium,
            max_players_per_team: 4,
        }
    }

    #[test]
    fn settings_ranges_are_enforced() {
        assert!(settings(3, 60).validate().is_ok());
        assert!(settings(0, 60).validate().is_err());
        assert!(settings(51, 60).validate().is_err());
        assert!(settings(3, 0).validate().is_err());
        assert!(settings(3, 3601).validate().is_err());
    }

    #[test]
    fn unknown_difficulty_is_rejected_at_parse_time() {
        let payload = r#"{"rounds":1,"time_per_round":1,"questions_per_round":1,
            "difficulty":"insane","max_players_per_team":1}"#;
        assert!(serde_json::from_str::<UpdateSettingsRequest>(payload).is_err());
    }

    #[test]
    fn join_request_requires_a_username() {
        let blank = JoinRoomRequest {
            username: "   ".into(),
        };
        let errors = blank.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));

        let ok = JoinRoomRequest {
            username: "ada".into(),
        };
        assert!(ok.validate().is_ok());
    }
}
