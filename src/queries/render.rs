//! Flattening the thread tree into renderable rows.
//!
//! Rendering is a pure projection of the tree plus viewer-specific state:
//! the whole listing is re-derived after every reload, never patched. Each
//! query becomes a header row, a body row, one row per reply in depth-first
//! order with indentation proportional to nesting depth, and a trailing
//! reply input row. A query at or past the report threshold collapses to
//! its header and a placeholder row; the suppression is recomputed here on
//! every pass from the server counter and never stored.
//!
//! Affordances are exclusive per row: the viewer's own content carries
//! edit/delete, everyone else's carries vote (replies) or report (queries).

use crate::queries::moderation::{should_hide, HIDDEN_QUERY_PLACEHOLDER};
use crate::queries::tree::ThreadTree;
use crate::queries::types::{QueryId, ReplyId, VoteKind};
use crate::queries::votes::VoteStateCache;
use crate::session::{can_modify, Viewer};
use tracing::warn;

/// Horizontal indentation per nesting level, in pixels.
pub const INDENT_STEP: usize = 20;

/// Affordances attached to a query header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryActions {
    /// The viewer owns the query.
    EditDelete,
    /// Anyone else's query.
    Report,
}

/// Affordances attached to a reply row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyActions {
    /// The viewer owns the reply.
    EditDelete,
    /// Anyone else's reply.
    Vote,
}

/// One flattened row of the listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Query author line with its affordances.
    QueryHeader {
        id: QueryId,
        author: String,
        timestamp: String,
        actions: QueryActions,
    },
    /// Query body text.
    QueryBody { id: QueryId, text: String },
    /// Placeholder standing in for a hidden query's body and replies.
    HiddenQuery { id: QueryId, placeholder: String },
    /// A single reply, indented by nesting depth.
    Reply {
        id: ReplyId,
        depth: usize,
        indent: usize,
        author: String,
        text: String,
        likes: u64,
        dislikes: u64,
        active_vote: VoteKind,
        actions: ReplyActions,
    },
    /// Input slot for a new top-level reply under a query.
    ReplyInput { query_id: QueryId },
    /// A row that could not be resolved from the arena.
    Unrenderable { message: String },
}

/// Flattens the tree into rows for the given viewer.
///
/// A missing viewer gets the non-owner affordances everywhere and no
/// active vote highlight. Vote cache read failures degrade to no
/// highlight rather than failing the whole render.
pub fn render(tree: &ThreadTree, votes: &VoteStateCache, viewer: Option<&Viewer>) -> Vec<Row> {
    let mut rows = Vec::new();

    for entry in tree.queries() {
        let query_actions = if can_modify(entry.author_id.as_ref(), viewer) {
            QueryActions::EditDelete
        } else {
            QueryActions::Report
        };
        rows.push(Row::QueryHeader {
            id: entry.id.clone(),
            author: entry.display_name().to_string(),
            // Server timestamps are opaque; an absent one reads "unknown".
            timestamp: entry
                .created_at
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            actions: query_actions,
        });

        // Hidden queries keep their listing slot but lose body, replies
        // and the reply input.
        if should_hide(entry.report_count) {
            rows.push(Row::HiddenQuery {
                id: entry.id.clone(),
                placeholder: HIDDEN_QUERY_PLACEHOLDER.to_string(),
            });
            continue;
        }

        rows.push(Row::QueryBody {
            id: entry.id.clone(),
            text: entry.text.clone(),
        });

        for idx in tree.walk(entry) {
            let Some(node) = tree.node(idx) else {
                rows.push(Row::Unrenderable {
                    message: format!("reply at index {} missing from arena", idx),
                });
                continue;
            };

            let actions = if can_modify(node.author_id.as_ref(), viewer) {
                ReplyActions::EditDelete
            } else {
                ReplyActions::Vote
            };
            let active_vote = match viewer {
                Some(viewer) => votes.get(&node.id, &viewer.id).unwrap_or_else(|e| {
                    warn!(reply = %node.id, error = %e, "vote cache read failed");
                    VoteKind::None
                }),
                None => VoteKind::None,
            };

            rows.push(Row::Reply {
                id: node.id.clone(),
                depth: node.depth,
                indent: node.depth * INDENT_STEP,
                author: node.display_name().to_string(),
                text: node.text.clone(),
                likes: node.likes,
                dislikes: node.dislikes,
                active_vote,
                actions,
            });
        }

        rows.push(Row::ReplyInput {
            query_id: entry.id.clone(),
        });
    }

    rows
}

/// Tracks which reply is being edited inline.
///
/// At most one edit is open at a time; starting a second one is refused
/// until the first finishes.
#[derive(Debug, Default)]
pub struct EditorState {
    editing: Option<ReplyId>,
}

impl EditorState {
    /// Opens an inline editor for the reply. Returns false if another
    /// edit is already open.
    pub fn begin(&mut self, id: ReplyId) -> bool {
        if self.editing.is_some() {
            return false;
        }
        self.editing = Some(id);
        true
    }

    /// Closes the open editor, if any.
    pub fn finish(&mut self) {
        self.editing = None;
    }

    /// Returns true if the given reply is currently being edited.
    pub fn is_editing(&self, id: &ReplyId) -> bool {
        self.editing.as_ref() == Some(id)
    }
}
