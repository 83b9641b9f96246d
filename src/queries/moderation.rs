//! Report-driven moderation gate and the submission word screen.
//!
//! Two independent rules live here:
//!
//! - A query whose accumulated report counter reaches the hide threshold
//!   is suppressed from rendering. Hidden status is recomputed on every
//!   reload from the server-provided counter, never cached locally, and
//!   there is no appeal or unhide path; report counts never decrement.
//! - Text submitted for a new query or reply is screened against a fixed
//!   denylist of disallowed substrings before dispatch. A match blocks the
//!   request entirely; nothing is sent.

use crate::error::{KlqError, Result};

/// Number of reports at which a query is hidden.
pub const REPORT_HIDE_THRESHOLD: u64 = 5;

/// Placeholder shown in place of a hidden query's body and replies.
pub const HIDDEN_QUERY_PLACEHOLDER: &str =
    "This query has been reported multiple times and is hidden.";

/// Disallowed substrings, matched case-insensitively and untokenized.
const BANNED_SUBSTRINGS: &[&str] = &[
    "madda",
    "sulli",
    "lavada",
    "lanja",
    "sulliga",
    "gudha",
    "gudhamuyy",
    "maddaguduv",
    "fuck",
    "fuckoff",
    "fuckyou",
    "fuck off",
    "bastardd",
    "loveyou",
    "stupid",
    "killyou",
    "kill",
    "lanjodaka",
];

/// Decides whether a query with the given report counter is suppressed.
pub fn should_hide(report_count: u64) -> bool {
    report_count >= REPORT_HIDE_THRESHOLD
}

/// Screens submission text against the denylist.
///
/// Matching is substring-based on the lowercased text, not tokenized, so
/// a disallowed word embedded in a longer word still blocks.
///
/// # Errors
/// Returns a validation error when any disallowed substring is present.
pub fn screen_text(text: &str) -> Result<()> {
    let lower = text.to_lowercase();
    if BANNED_SUBSTRINGS.iter().any(|word| lower.contains(word)) {
        return Err(KlqError::validation(
            "Inappropriate words detected in the text. Please revise and try again.",
        ));
    }
    Ok(())
}
