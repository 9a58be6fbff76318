use mongodb::bson::{self, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    Difficulty, GameEntity, PlayerEntity, QuestionEntity, QuestionOptionEntity, ResponseEntity,
    ResponseKey, RoomEntity, RoundEntity, SettingsEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    slug: String,
    created_at: DateTime,
    settings_id: bson::Uuid,
}

impl From<RoomEntity> for MongoRoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            slug: value.slug,
            created_at: DateTime::from_system_time(value.created_at),
            settings_id: uuid_as_binary(value.settings_id),
        }
    }
}

impl From<MongoRoomDocument> for RoomEntity {
    fn from(value: MongoRoomDocument) -> Self {
        Self {
            id: uuid_from_binary(value.id),
            slug: value.slug,
            created_at: value.created_at.to_system_time(),
            settings_id: uuid_from_binary(value.settings_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettingsDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    rounds: i64,
    time_per_round: i64,
    questions_per_round: i64,
    difficulty: Difficulty,
    max_players_per_team: i64,
}

impl From<SettingsEntity> for MongoSettingsDocument {
    fn from(value: SettingsEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            rounds: value.rounds.into(),
            time_per_round: value.time_per_round.into(),
            questions_per_round: value.questions_per_round.into(),
            difficulty: value.difficulty,
            max_players_per_team: value.max_players_per_team.into(),
        }
    }
}

impl From<MongoSettingsDocument> for SettingsEntity {
    fn from(value: MongoSettingsDocument) -> Self {
        Self {
            id: uuid_from_binary(value.id),
            rounds: clamp_u32(value.rounds),
            time_per_round: clamp_u32(value.time_per_round),
            questions_per_round: clamp_u32(value.questions_per_round),
            difficulty: value.difficulty,
            max_players_per_team: clamp_u32(value.max_players_per_team),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    room_id: bson::Uuid,
    username: String,
    is_host: bool,
    team_id: Option<bson::Uuid>,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            room_id: uuid_as_binary(value.room_id),
            username: value.username,
            is_host: value.is_host,
            team_id: value.team_id.map(uuid_as_binary),
        }
    }
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            id: uuid_from_binary(value.id),
            room_id: uuid_from_binary(value.room_id),
            username: value.username,
            is_host: value.is_host,
            team_id: value.team_id.map(uuid_from_binary),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    room_id: bson::Uuid,
    started_at: DateTime,
    ended_at: Option<DateTime>,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            room_id: uuid_as_binary(value.room_id),
            started_at: DateTime::from_system_time(value.started_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: uuid_from_binary(value.id),
            room_id: uuid_from_binary(value.room_id),
            started_at: value.started_at.to_system_time(),
            ended_at: value.ended_at.map(DateTime::to_system_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    game_id: bson::Uuid,
    number: i64,
    started_at: DateTime,
    ended_at: DateTime,
}

impl From<RoundEntity> for MongoRoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            game_id: uuid_as_binary(value.game_id),
            number: value.number.into(),
            started_at: DateTime::from_system_time(value.started_at),
            ended_at: DateTime::from_system_time(value.ended_at),
        }
    }
}

impl From<MongoRoundDocument> for RoundEntity {
    fn from(value: MongoRoundDocument) -> Self {
        Self {
            id: uuid_from_binary(value.id),
            game_id: uuid_from_binary(value.game_id),
            number: clamp_u32(value.number),
            started_at: value.started_at.to_system_time(),
            ended_at: value.ended_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    round_id: bson::Uuid,
    kind: String,
    text: String,
    media_url: Option<String>,
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            round_id: uuid_as_binary(value.round_id),
            kind: value.kind,
            text: value.text,
            media_url: value.media_url,
        }
    }
}

impl From<MongoQuestionDocument> for QuestionEntity {
    fn from(value: MongoQuestionDocument) -> Self {
        Self {
            id: uuid_from_binary(value.id),
            round_id: uuid_from_binary(value.round_id),
            kind: value.kind,
            text: value.text,
            media_url: value.media_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoOptionDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    question_id: bson::Uuid,
    text: String,
    is_correct: bool,
}

impl From<QuestionOptionEntity> for MongoOptionDocument {
    fn from(value: QuestionOptionEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            question_id: uuid_as_binary(value.question_id),
            text: value.text,
            is_correct: value.is_correct,
        }
    }
}

impl From<MongoOptionDocument> for QuestionOptionEntity {
    fn from(value: MongoOptionDocument) -> Self {
        Self {
            id: uuid_from_binary(value.id),
            question_id: uuid_from_binary(value.question_id),
            text: value.text,
            is_correct: value.is_correct,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoResponseDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    game_id: bson::Uuid,
    round_id: bson::Uuid,
    question_id: bson::Uuid,
    player_id: bson::Uuid,
    submitted_at: DateTime,
    text_reply: Option<String>,
    option_id: Option<bson::Uuid>,
    is_correct: Option<bool>,
}

impl From<ResponseEntity> for MongoResponseDocument {
    fn from(value: ResponseEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            game_id: uuid_as_binary(value.game_id),
            round_id: uuid_as_binary(value.round_id),
            question_id: uuid_as_binary(value.question_id),
            player_id: uuid_as_binary(value.player_id),
            submitted_at: DateTime::from_system_time(value.submitted_at),
            text_reply: value.text_reply,
            option_id: value.option_id.map(uuid_as_binary),
            is_correct: value.is_correct,
        }
    }
}

impl From<MongoResponseDocument> for ResponseEntity {
    fn from(value: MongoResponseDocument) -> Self {
        Self {
            id: uuid_from_binary(value.id),
            game_id: uuid_from_binary(value.game_id),
            round_id: uuid_from_binary(value.round_id),
            question_id: uuid_from_binary(value.question_id),
            player_id: uuid_from_binary(value.player_id),
            submitted_at: value.submitted_at.to_system_time(),
            text_reply: value.text_reply,
            option_id: value.option_id.map(uuid_from_binary),
            is_correct: value.is_correct,
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

fn uuid_from_binary(id: bson::Uuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}

/// Filter selecting the documents whose `field` references `id`.
pub fn by_ref(field: &str, id: Uuid) -> Document {
    let mut filter = Document::new();
    filter.insert(field, uuid_as_binary(id));
    filter
}

pub fn response_filter(key: ResponseKey) -> Document {
    doc! {
        "game_id": uuid_as_binary(key.game_id),
        "round_id": uuid_as_binary(key.round_id),
        "question_id": uuid_as_binary(key.question_id),
        "player_id": uuid_as_binary(key.player_id),
    }
}
