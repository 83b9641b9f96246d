//! Client-maintained threaded discussion system.
//!
//! This module implements a discussion client over a remote query
//! service that exclusively owns durable state. Queries carry
//! recursively nested replies; the client is a thin, stateless-by-default
//! projection of whatever the service last returned:
//!
//! - **Mutate, then reload**: every write is a single request followed by
//!   a full re-fetch that discards and rebuilds the thread tree.
//! - **Tri-state votes**: one vote per viewer per reply (like, dislike,
//!   or none), toggled client-side and confirmed by server counters.
//! - **Report-driven hiding**: a query reported past the threshold
//!   collapses to a placeholder, recomputed on every reload.
//!
//! ## Structure
//!
//! ```text
//! QueriesClient (dispatch)
//!     ├── QueryService (service)        remote boundary
//!     ├── ThreadTree (tree)             rebuilt per reload
//!     ├── VoteStateCache (votes)        persisted viewer state
//!     └── render                        tree -> rows
//! ```

pub mod dispatch;
pub mod model;
pub mod moderation;
pub mod render;
pub mod service;
pub mod tree;
pub mod types;
pub mod votes;

pub use dispatch::{QueriesClient, DEFAULT_SORT};
pub use model::{Query, Reply, ReportState, VoteTotals, ANONYMOUS_NAME};
pub use moderation::{
    screen_text, should_hide, HIDDEN_QUERY_PLACEHOLDER, REPORT_HIDE_THRESHOLD,
};
pub use render::{render, EditorState, QueryActions, ReplyActions, Row, INDENT_STEP};
pub use service::{HttpQueryService, QueryService};
pub use tree::{QueryEntry, ReplyNode, ThreadTree};
pub use types::{effective_vote, QueryId, ReplyId, UserId, VoteKind};
pub use votes::VoteStateCache;
