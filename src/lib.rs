//! # klqueries - threaded campus discussion client
//!
//! Client core for a threaded discussion board backed by a remote query
//! service. The service owns all durable state; this crate maintains the
//! client's view of it and the small amount of state that is genuinely
//! the client's own (session cache, per-viewer vote highlights, report
//! markers).
//!
//! ## Design
//!
//! - **Mutate-then-reload**: writes never patch the local model. Each
//!   operation sends one request and, on success, reloads the full
//!   listing, rebuilding the thread tree from scratch.
//! - **Server-authoritative counters**: vote and report counts are
//!   adopted verbatim from responses, never derived locally.
//! - **Local persistence**: a RocksDB-backed store replaces the browser
//!   key/value cache for session and vote state.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use klqueries::queries::{HttpQueryService, QueriesClient};
//! use klqueries::store::ClientStore;
//! use std::sync::Arc;
//! # async fn run() -> klqueries::Result<()> {
//! let store = Arc::new(ClientStore::open("client-state")?);
//! let service = HttpQueryService::new("http://localhost:8080");
//! let mut client = QueriesClient::new(service, store);
//!
//! client.reload().await?;
//! for entry in client.tree().queries() {
//!     println!("{}: {}", entry.display_name(), entry.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod queries;
pub mod session;
pub mod store;
pub mod validation;

pub use error::{KlqError, Result};
pub use queries::{QueriesClient, QueryService};
pub use session::{SessionStore, Viewer};
pub use store::ClientStore;
