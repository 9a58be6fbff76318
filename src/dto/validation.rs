//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted username, counted in characters after trimming.
pub const USERNAME_MAX_CHARS: usize = 32;
/// Longest accepted free-text answer, in characters.
pub const ANSWER_MAX_CHARS: usize = 1000;

/// Validates that a username has between 1 and [`USERNAME_MAX_CHARS`] characters once trimmed.
///
/// # Examples
///
/// ```ignore
/// validate_username("ada")   // Ok
/// validate_username("   ")   // Err - blank
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let count = username.trim().chars().count();
    if count == 0 {
        let mut err = ValidationError::new("username_blank");
        err.message = Some("Username must not be blank".into());
        return Err(err);
    }

    if count > USERNAME_MAX_CHARS {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!("Username must be at most {USERNAME_MAX_CHARS} characters (got {count})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a free-text answer does not exceed [`ANSWER_MAX_CHARS`] characters.
pub fn validate_answer_text(answer: &str) -> Result<(), ValidationError> {
    let count = answer.chars().count();
    if count > ANSWER_MAX_CHARS {
        let mut err = ValidationError::new("answer_length");
        err.message = Some(
            format!("Answer must be at most {ANSWER_MAX_CHARS} characters (got {count})").into(),
        );
        return Err(err);
    }
    Ok(())
}
