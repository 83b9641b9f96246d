//! In-memory thread tree model.
//!
//! One page of queries with their nested replies, rebuilt from scratch on
//! every successful reload. The tree has no independent lifecycle: it is
//! fully discarded and replaced, never patched in place by in-flight
//! requests.
//!
//! Replies are stored in an owned arena indexed by position, with each
//! node holding an ordered list of child indices. Lookup by id goes
//! through an index map instead of chasing a recursive ownership chain,
//! and depth is recorded per node so rendering stays a pure function of
//! the arena.

use crate::queries::model::{Query, Reply, ANONYMOUS_NAME};
use crate::queries::types::{QueryId, ReplyId, UserId};
use std::collections::HashMap;

/// A reply flattened into the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyNode {
    /// Server-assigned stable identifier.
    pub id: ReplyId,
    /// User-authored body.
    pub text: String,
    /// Denormalized author reference.
    pub author_id: Option<UserId>,
    /// Denormalized author display name.
    pub author_name: Option<String>,
    /// Server-aggregated upvote counter.
    pub likes: u64,
    /// Server-aggregated downvote counter.
    pub dislikes: u64,
    /// Nesting depth, 0 for replies directly under a query.
    pub depth: usize,
    /// Arena index of the parent reply, if any.
    pub parent: Option<usize>,
    /// Arena indices of child replies, insertion order preserved.
    pub children: Vec<usize>,
}

impl ReplyNode {
    /// Returns the author display name, or a fallback when absent.
    pub fn display_name(&self) -> &str {
        self.author_name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }
}

/// A query with its top-level reply indices.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEntry {
    /// Server-assigned stable identifier.
    pub id: QueryId,
    /// User-authored body.
    pub text: String,
    /// Denormalized author reference.
    pub author_id: Option<UserId>,
    /// Denormalized author display name.
    pub author_name: Option<String>,
    /// Server-clock creation timestamp.
    pub created_at: Option<String>,
    /// Accumulated report counter, server authoritative.
    pub report_count: u64,
    /// Arena indices of top-level replies.
    pub roots: Vec<usize>,
}

impl QueryEntry {
    /// Returns the author display name, or a fallback when absent.
    pub fn display_name(&self) -> &str {
        self.author_name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }
}

/// The rebuilt-per-reload discussion tree.
///
/// Construction is pure: the same payload always yields a tree with
/// identical shape and ordering. Ids are assumed globally unique; when the
/// server violates that, the first occurrence wins for lookups.
#[derive(Debug, Default)]
pub struct ThreadTree {
    queries: Vec<QueryEntry>,
    nodes: Vec<ReplyNode>,
    index: HashMap<ReplyId, usize>,
}

impl ThreadTree {
    /// Builds a tree from one page of queries, exactly as delivered.
    ///
    /// No reordering, no deduplication, no depth limiting.
    pub fn from_queries(queries: Vec<Query>) -> Self {
        let mut tree = Self::default();
        for query in queries {
            let mut entry = QueryEntry {
                id: query.id,
                text: query.text,
                author_id: query.author_id,
                author_name: query.author_name,
                created_at: query.created_at,
                report_count: query.report_count,
                roots: Vec::new(),
            };
            for reply in query.replies {
                let idx = tree.insert_reply(reply, 0, None);
                entry.roots.push(idx);
            }
            tree.queries.push(entry);
        }
        tree
    }

    fn insert_reply(&mut self, reply: Reply, depth: usize, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(ReplyNode {
            id: reply.id.clone(),
            text: reply.text,
            author_id: reply.author_id,
            author_name: reply.author_name,
            likes: reply.likes,
            dislikes: reply.dislikes,
            depth,
            parent,
            children: Vec::new(),
        });
        // First occurrence wins, matching depth-first first-match lookup.
        self.index.entry(reply.id).or_insert(idx);

        for child in reply.replies {
            let child_idx = self.insert_reply(child, depth + 1, Some(idx));
            self.nodes[idx].children.push(child_idx);
        }
        idx
    }

    /// Returns the queries in server-delivered order.
    pub fn queries(&self) -> &[QueryEntry] {
        &self.queries
    }

    /// Returns the query entry with the given id, if present.
    pub fn query(&self, id: &QueryId) -> Option<&QueryEntry> {
        self.queries.iter().find(|q| &q.id == id)
    }

    /// Returns the arena node at the given index.
    pub fn node(&self, idx: usize) -> Option<&ReplyNode> {
        self.nodes.get(idx)
    }

    /// Finds a reply by id anywhere in the tree (first match).
    pub fn find_reply(&self, id: &ReplyId) -> Option<&ReplyNode> {
        self.index.get(id).and_then(|&idx| self.nodes.get(idx))
    }

    /// Walks one query's replies depth-first, yielding arena indices in
    /// render order. Depth is recorded on each node.
    pub fn walk(&self, entry: &QueryEntry) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack: Vec<usize> = entry.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            order.push(idx);
            if let Some(node) = self.nodes.get(idx) {
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        order
    }

    /// Removes a reply node from the visible tree.
    ///
    /// Only the node itself is detached; the model holds no write
    /// authority and does not cascade-delete descendants. They remain
    /// addressable by id until the next reload decides their fate.
    pub fn remove_reply(&mut self, id: &ReplyId) -> bool {
        let Some(idx) = self.index.get(id).copied() else {
            return false;
        };
        let parent = match self.nodes.get(idx) {
            Some(node) => node.parent,
            None => return false,
        };
        match parent {
            Some(parent_idx) => {
                if let Some(parent_node) = self.nodes.get_mut(parent_idx) {
                    parent_node.children.retain(|&c| c != idx);
                }
            }
            None => {
                for entry in &mut self.queries {
                    entry.roots.retain(|&c| c != idx);
                }
            }
        }
        self.index.remove(id);
        true
    }

    /// Total number of reply nodes in the arena.
    pub fn reply_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree holds no queries.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
