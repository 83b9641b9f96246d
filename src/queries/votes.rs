//! Per-viewer vote state cache and report markers.
//!
//! The cache persists the last vote the *current* viewer cast per reply so
//! the UI can restore highlight state after a reload without asking the
//! server. It never feeds into aggregate counts; those always come from
//! the server response to the vote request.
//!
//! The same store keeps "already reported" markers per (query, viewer),
//! consulted before a report is dispatched so a repeat report is blocked
//! without a network call.

use crate::error::Result;
use crate::queries::types::{QueryId, ReplyId, UserId, VoteKind};
use crate::store::{viewer_key, ClientStore, CF_REPORTS, CF_VOTES};
use std::sync::Arc;
use tracing::trace;

const VOTE_KEY_PREFIX: &str = "vote_reply_";
const REPORT_KEY_PREFIX: &str = "reported_query_";

/// Store-backed cache of viewer-specific presentation state.
#[derive(Debug, Clone)]
pub struct VoteStateCache {
    store: Arc<ClientStore>,
}

impl VoteStateCache {
    /// Creates a cache over the shared client store.
    pub fn new(store: Arc<ClientStore>) -> Self {
        Self { store }
    }

    /// Returns the last vote the viewer cast on a reply, `None` if never.
    pub fn get(&self, reply: &ReplyId, viewer: &UserId) -> Result<VoteKind> {
        let key = viewer_key(VOTE_KEY_PREFIX, reply.as_str(), viewer.as_str());
        Ok(self
            .store
            .get::<VoteKind>(CF_VOTES, &key)?
            .unwrap_or(VoteKind::None))
    }

    /// Records the viewer's effective vote on a reply.
    ///
    /// A `None` vote clears the entry instead of storing it.
    pub fn set(&self, reply: &ReplyId, viewer: &UserId, vote: VoteKind) -> Result<()> {
        let key = viewer_key(VOTE_KEY_PREFIX, reply.as_str(), viewer.as_str());
        trace!(reply = %reply, vote = %vote, "caching vote state");
        match vote {
            VoteKind::None => self.store.delete(CF_VOTES, &key),
            _ => self.store.put(CF_VOTES, &key, &vote),
        }
    }

    /// Returns true if the viewer already reported the query.
    pub fn has_reported(&self, query: &QueryId, viewer: &UserId) -> Result<bool> {
        let key = viewer_key(REPORT_KEY_PREFIX, query.as_str(), viewer.as_str());
        self.store.exists(CF_REPORTS, &key)
    }

    /// Marks the query as reported by the viewer.
    ///
    /// Markers are never removed; there is no un-report path.
    pub fn mark_reported(&self, query: &QueryId, viewer: &UserId) -> Result<()> {
        let key = viewer_key(REPORT_KEY_PREFIX, query.as_str(), viewer.as_str());
        self.store.put_raw(CF_REPORTS, &key, b"1")
    }
}
