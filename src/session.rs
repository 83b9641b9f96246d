//! Cached identity and session state for the signed-in viewer.
//!
//! The identity/session provider is an external collaborator: this module
//! only reads and writes what it was handed — an opaque viewer id/name and
//! a bearer token — and never validates or refreshes either. The cached
//! identity is used for ownership comparisons and permission gating in the
//! renderer; the server re-validates every write regardless.

use crate::error::Result;
use crate::queries::types::UserId;
use crate::store::{ClientStore, CF_SESSION};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const KEY_CURRENT_USER: &[u8] = b"currentUser";
const KEY_TOKEN: &[u8] = b"token";
const KEY_REDIRECT: &[u8] = b"redirectAfterLogin";

/// The locally cached identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    /// Opaque user id, used only for ownership comparisons.
    pub id: UserId,
    /// Display name; falls back elsewhere when absent.
    pub name: Option<String>,
}

/// Checks whether the viewer may edit or delete the given content.
///
/// Ownership is immutable after creation and modeled as an opaque id
/// comparison, not a structural distinction between "mine" and "theirs".
/// Content without an author reference is owned by nobody.
pub fn can_modify(author_id: Option<&UserId>, viewer: Option<&Viewer>) -> bool {
    match (author_id, viewer) {
        (Some(author), Some(viewer)) => author == &viewer.id,
        _ => false,
    }
}

/// Store-backed session cache.
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: Arc<ClientStore>,
}

impl SessionStore {
    /// Creates a session cache over the shared client store.
    pub fn new(store: Arc<ClientStore>) -> Self {
        Self { store }
    }

    /// Caches the viewer identity and bearer token after a sign-in.
    pub fn set_session(&self, viewer: &Viewer, token: &str) -> Result<()> {
        self.store.put(CF_SESSION, KEY_CURRENT_USER, viewer)?;
        self.store
            .put_raw(CF_SESSION, KEY_TOKEN, token.as_bytes())?;
        debug!(viewer = %viewer.id, "cached session");
        Ok(())
    }

    /// Discards the cached session.
    pub fn clear_session(&self) -> Result<()> {
        self.store.delete(CF_SESSION, KEY_CURRENT_USER)?;
        self.store.delete(CF_SESSION, KEY_TOKEN)?;
        Ok(())
    }

    /// Returns the cached viewer identity, if signed in.
    pub fn current_viewer(&self) -> Result<Option<Viewer>> {
        self.store.get(CF_SESSION, KEY_CURRENT_USER)
    }

    /// Returns the cached bearer token, if signed in.
    pub fn token(&self) -> Result<Option<String>> {
        let raw = self.store.get_raw(CF_SESSION, KEY_TOKEN)?;
        Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Returns true when a bearer token is cached.
    pub fn is_logged_in(&self) -> Result<bool> {
        Ok(self.token()?.is_some())
    }

    /// Records where to return after a login forced by a gated affordance.
    pub fn set_redirect_after_login(&self, target: &str) -> Result<()> {
        self.store
            .put_raw(CF_SESSION, KEY_REDIRECT, target.as_bytes())
    }

    /// Consumes the redirect flag, returning it at most once.
    pub fn take_redirect_after_login(&self) -> Result<Option<String>> {
        let raw = self.store.get_raw(CF_SESSION, KEY_REDIRECT)?;
        if raw.is_some() {
            self.store.delete(CF_SESSION, KEY_REDIRECT)?;
        }
        Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}
