//! Wire data model for queries and replies.
//!
//! These structs mirror the payloads the query service returns from its
//! listing endpoint. The service owns all durable state; the client only
//! deserializes what it is given, applies defaults for omitted counters,
//! and never re-derives or caches any of it across reloads.

use crate::queries::types::{QueryId, ReplyId, UserId};
use serde::{Deserialize, Serialize};

/// Fallback display name when the author reference is missing.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// A response attached to a query or to another reply.
///
/// Nesting is unbounded in depth; replies arrive in server insertion order
/// and the client applies no reordering or deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Server-assigned stable identifier.
    pub id: ReplyId,
    /// User-authored body.
    pub text: String,
    /// Denormalized author reference; missing for anonymous content.
    #[serde(rename = "userId", default)]
    pub author_id: Option<UserId>,
    /// Denormalized author display name.
    #[serde(rename = "userName", default)]
    pub author_name: Option<String>,
    /// Server-aggregated upvote counter.
    #[serde(default)]
    pub likes: u64,
    /// Server-aggregated downvote counter.
    #[serde(default)]
    pub dislikes: u64,
    /// Nested replies, insertion order as returned by the server.
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl Reply {
    /// Returns the author display name, or a fallback when absent.
    pub fn display_name(&self) -> &str {
        self.author_name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }
}

/// A root discussion post with its nested reply tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Server-assigned stable identifier.
    pub id: QueryId,
    /// User-authored body.
    pub text: String,
    /// Denormalized author reference; missing for anonymous content.
    #[serde(rename = "userId", default)]
    pub author_id: Option<UserId>,
    /// Denormalized author display name.
    #[serde(rename = "userName", default)]
    pub author_name: Option<String>,
    /// Server-clock creation timestamp, rendered as-is.
    #[serde(rename = "timestamp", default)]
    pub created_at: Option<String>,
    /// Accumulated report counter, server authoritative.
    #[serde(rename = "reportCount", default)]
    pub report_count: u64,
    /// Top-level replies, insertion order as returned by the server.
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl Query {
    /// Returns the author display name, or a fallback when absent.
    pub fn display_name(&self) -> &str {
        self.author_name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }
}

/// Server-returned aggregate counters after a vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTotals {
    /// Updated upvote counter.
    #[serde(default)]
    pub likes: u64,
    /// Updated downvote counter.
    #[serde(default)]
    pub dislikes: u64,
}

/// Server-returned report state after a report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportState {
    /// Updated report counter.
    #[serde(rename = "reportCount", default)]
    pub report_count: u64,
}
