//! Core identifier and vote types for the queries discussion model.
//!
//! All ids are server-assigned and opaque: the client only compares them
//! and composes them into local storage keys, never inspects them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a query (root post).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

/// Opaque identifier of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyId(String);

/// Opaque identifier of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            /// Creates an id from its server-assigned string form.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

impl_id!(QueryId);
impl_id!(ReplyId);
impl_id!(UserId);

/// Per-viewer vote tri-state for a single reply.
///
/// At most one vote is active per viewer per reply. The aggregate like and
/// dislike counters are always server-derived; this type only tracks what
/// the current viewer last cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    /// An active upvote.
    Like,
    /// An active downvote.
    Dislike,
    /// No active vote.
    #[default]
    None,
}

impl VoteKind {
    /// Wire form of the vote, as sent to the query service.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Like => "like",
            VoteKind::Dislike => "dislike",
            VoteKind::None => "none",
        }
    }

    /// Returns true if a vote is active.
    pub fn is_active(&self) -> bool {
        !matches!(self, VoteKind::None)
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the effective vote to send for a requested vote.
///
/// Casting the same vote twice toggles it off (`None`); casting the
/// opposite vote overwrites the previous one in a single request. This
/// mapping is computed client-side and sent explicitly to the server.
pub fn effective_vote(current: VoteKind, requested: VoteKind) -> VoteKind {
    if current == requested {
        VoteKind::None
    } else {
        requested
    }
}
