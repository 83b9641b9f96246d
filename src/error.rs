//! Error types for klqueries operations.

use thiserror::Error;

/// Result type alias for klqueries operations.
pub type Result<T> = std::result::Result<T, KlqError>;

/// Main error type for klqueries operations.
#[derive(Error, Debug)]
pub enum KlqError {
    /// Input rejected before dispatch (empty text, disallowed words).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Action attempted without the required identity or ownership.
    #[error("Permission error: {0}")]
    Permission(String),

    /// The query service answered with a non-success response.
    #[error("Service error: {0}")]
    Service(String),

    /// Transport-level failure talking to the query service.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local key-value store errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A payload could not be turned into a visible representation.
    #[error("Render error: {0}")]
    Render(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KlqError {
    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Creates a new permission error.
    pub fn permission<T: ToString>(msg: T) -> Self {
        Self::Permission(msg.to_string())
    }

    /// Creates a new service error.
    pub fn service<T: ToString>(msg: T) -> Self {
        Self::Service(msg.to_string())
    }

    /// Creates a new storage error.
    pub fn storage<T: ToString>(msg: T) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new render error.
    pub fn render<T: ToString>(msg: T) -> Self {
        Self::Render(msg.to_string())
    }

    /// Returns true if the failure was caught locally, before any request
    /// was sent to the query service.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Permission(_) | Self::Storage(_)
        )
    }
}
