//! DTO definitions for the answer ledger.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::ResponseEntity,
    dto::{format_system_time, validation::validate_answer_text},
};

/// Answer submitted for a question. At least one of the fields must be present.
#[derive(Debug, Default, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Free-text reply, at most 1000 characters.
    #[serde(default)]
    pub answer: Option<String>,
    /// Option picked among the question's options.
    #[serde(default)]
    pub option_id: Option<Uuid>,
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.answer.is_none() && self.option_id.is_none() {
            let mut err = ValidationError::new("answer_missing");
            err.message = Some("Either `answer` or `option_id` must be provided".into());
            errors.add("answer", err);
        }

        if let Some(ref answer) = self.answer {
            if let Err(e) = validate_answer_text(answer) {
                errors.add("answer", e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Ledger entry as returned to its player.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnswerResponse {
    pub id: Uuid,
    pub game_id: Uuid,
    pub round_id: Uuid,
    pub question_id: Uuid,
    pub player_id: Uuid,
    /// RFC 3339 acceptance timestamp.
    pub submitted_at: String,
    pub answer: Option<String>,
    pub option_id: Option<Uuid>,
    /// Filled in by grading, absent until then.
    pub is_correct: Option<bool>,
}

impl From<ResponseEntity> for AnswerResponse {
    fn from(value: ResponseEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            round_id: value.round_id,
            question_id: value.question_id,
            player_id: value.player_id,
            submitted_at: format_system_time(value.submitted_at),
            answer: value.text_reply,
            option_id: value.option_id,
            is_correct: value.is_correct,
        }
    }
}
