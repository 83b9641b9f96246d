//! Input validation and size limits for user-submitted text.
//!
//! Everything here runs before a request is dispatched. A failure means
//! no request is sent at all; there is nothing to roll back.

use crate::error::{KlqError, Result};

/// Maximum query text size (10KB).
pub const MAX_QUERY_TEXT_SIZE: usize = 10 * 1024;

/// Maximum reply text size (10KB).
pub const MAX_REPLY_TEXT_SIZE: usize = 10 * 1024;

/// Validates and normalizes text for submission.
///
/// Trims surrounding whitespace and rejects input that is empty after
/// trimming or larger than `max_size` bytes. Returns the trimmed text.
///
/// # Errors
/// Returns a validation error if the text is empty after trimming or
/// exceeds the size limit.
pub fn validate_submission_text(text: &str, max_size: usize) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(KlqError::validation("Text cannot be empty"));
    }
    if trimmed.len() > max_size {
        return Err(KlqError::validation(format!(
            "Text exceeds maximum size of {} bytes",
            max_size
        )));
    }
    Ok(trimmed.to_string())
}

/// Validates query text for submission.
pub fn validate_query_text(text: &str) -> Result<String> {
    validate_submission_text(text, MAX_QUERY_TEXT_SIZE)
}

/// Validates reply text for submission.
pub fn validate_reply_text(text: &str) -> Result<String> {
    validate_submission_text(text, MAX_REPLY_TEXT_SIZE)
}
