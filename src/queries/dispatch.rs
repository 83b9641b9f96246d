//! Mutation dispatch and the mutate-then-reload consistency discipline.
//!
//! The client never applies a mutation locally. Every operation is a
//! single request against the query service followed, on success, by a
//! full reload that discards and rebuilds the thread tree. Failures
//! surface as a single error per operation with the local model left
//! untouched; nothing is retried automatically.
//!
//! Reloads carry a monotonically increasing sequence number. Rapid
//! search/sort input can issue overlapping reloads; only the response
//! with the highest sequence seen so far is applied, so a slow stale
//! response can never clobber a newer tree.

use crate::error::{KlqError, Result};
use crate::queries::model::{Query, ReportState, VoteTotals};
use crate::queries::moderation::screen_text;
use crate::queries::service::QueryService;
use crate::queries::tree::ThreadTree;
use crate::queries::types::{effective_vote, QueryId, ReplyId, VoteKind};
use crate::queries::votes::VoteStateCache;
use crate::session::{SessionStore, Viewer};
use crate::store::ClientStore;
use crate::validation::{validate_query_text, validate_reply_text};
use std::sync::Arc;
use tracing::{info, warn};

/// Default sort key sent when the user has not picked one.
pub const DEFAULT_SORT: &str = "newest";

/// Redirect target recorded when an unauthenticated user hits a gated
/// affordance.
const REDIRECT_TARGET: &str = "queries";

/// Client over the remote query service.
///
/// Holds the transient reconstruction of server state (the thread tree)
/// plus the only client-persisted state: the session cache and the
/// per-viewer vote/report markers.
pub struct QueriesClient<S: QueryService> {
    service: S,
    session: SessionStore,
    votes: VoteStateCache,
    tree: ThreadTree,
    search: Option<String>,
    sort: String,
    issued_reloads: u64,
    applied_reload: u64,
}

impl<S: QueryService> QueriesClient<S> {
    /// Creates a client over the given service and local store.
    pub fn new(service: S, store: Arc<ClientStore>) -> Self {
        Self {
            service,
            session: SessionStore::new(store.clone()),
            votes: VoteStateCache::new(store),
            tree: ThreadTree::default(),
            search: None,
            sort: DEFAULT_SORT.to_string(),
            issued_reloads: 0,
            applied_reload: 0,
        }
    }

    /// The current thread tree. Replaced wholesale on every reload.
    pub fn tree(&self) -> &ThreadTree {
        &self.tree
    }

    /// The cached session.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The per-viewer vote state cache.
    pub fn votes(&self) -> &VoteStateCache {
        &self.votes
    }

    /// Sets the search text for subsequent reloads.
    ///
    /// The text is lowercased before dispatch; the server decides what
    /// matching means.
    pub fn set_search(&mut self, search: Option<String>) {
        self.search = search.map(|s| s.to_lowercase());
    }

    /// Sets the sort key for subsequent reloads.
    pub fn set_sort(&mut self, sort: impl Into<String>) {
        self.sort = sort.into();
    }

    /// Issues a new reload sequence number.
    fn next_reload_seq(&mut self) -> u64 {
        self.issued_reloads += 1;
        self.issued_reloads
    }

    /// Applies a reload response if it is still the newest one.
    ///
    /// Returns false when a later reload already landed; the stale
    /// payload is dropped without touching the tree.
    fn apply_reload(&mut self, seq: u64, queries: Vec<Query>) -> bool {
        if seq <= self.applied_reload {
            warn!(seq, applied = self.applied_reload, "dropping stale reload");
            return false;
        }
        self.applied_reload = seq;
        self.tree = ThreadTree::from_queries(queries);
        info!(seq, queries = self.tree.queries().len(), "applied reload");
        true
    }

    /// Re-fetches the full listing and rebuilds the thread tree.
    ///
    /// Returns true if the response was applied, false if a newer reload
    /// raced ahead of it.
    pub async fn reload(&mut self) -> Result<bool> {
        let seq = self.next_reload_seq();
        let token = self.session.token()?;
        let queries = self
            .service
            .list_queries(self.search.as_deref(), Some(&self.sort), token.as_deref())
            .await?;
        Ok(self.apply_reload(seq, queries))
    }

    /// Resolves the signed-in viewer and token, or records the redirect
    /// flag and fails without sending anything.
    fn require_session(&self) -> Result<(Viewer, String)> {
        let viewer = self.session.current_viewer()?;
        let token = self.session.token()?;
        match (viewer, token) {
            (Some(viewer), Some(token)) => Ok((viewer, token)),
            _ => {
                self.session.set_redirect_after_login(REDIRECT_TARGET)?;
                Err(KlqError::permission("Sign in to continue"))
            }
        }
    }

    /// Creates a new query.
    ///
    /// The text must be non-empty after trimming and pass the disallowed
    /// word screen; either failure blocks the dispatch entirely.
    pub async fn submit_query(&mut self, text: &str) -> Result<()> {
        let (viewer, token) = self.require_session()?;
        let text = validate_query_text(text)?;
        screen_text(&text)?;

        self.service
            .create_query(&viewer.id, &token, &text)
            .await?;
        info!("submitted query");
        self.reload().await?;
        Ok(())
    }

    /// Replaces the text of a query the viewer owns.
    pub async fn edit_query(&mut self, id: &QueryId, text: &str) -> Result<()> {
        let (viewer, token) = self.require_session()?;
        let text = validate_query_text(text)?;

        self.service
            .edit_query(id, &viewer.id, &token, &text)
            .await?;
        self.reload().await?;
        Ok(())
    }

    /// Deletes a query the viewer owns.
    pub async fn delete_query(&mut self, id: &QueryId) -> Result<()> {
        let (viewer, token) = self.require_session()?;

        self.service.delete_query(id, &viewer.id, &token).await?;
        self.reload().await?;
        Ok(())
    }

    /// Creates a top-level reply under a query.
    pub async fn submit_reply(&mut self, query: &QueryId, text: &str) -> Result<()> {
        let (viewer, token) = self.require_session()?;
        let text = validate_reply_text(text)?;
        screen_text(&text)?;

        self.service
            .create_reply(query, &viewer.id, &token, &text)
            .await?;
        self.reload().await?;
        Ok(())
    }

    /// Creates a nested reply under another reply.
    pub async fn submit_nested_reply(&mut self, parent: &ReplyId, text: &str) -> Result<()> {
        let (viewer, token) = self.require_session()?;
        let text = validate_reply_text(text)?;
        screen_text(&text)?;

        self.service
            .create_nested_reply(parent, &viewer.id, &token, &text)
            .await?;
        self.reload().await?;
        Ok(())
    }

    /// Replaces the text of a reply the viewer owns.
    pub async fn edit_reply(&mut self, id: &ReplyId, text: &str) -> Result<()> {
        let (viewer, token) = self.require_session()?;
        let text = validate_reply_text(text)?;

        self.service
            .edit_reply(id, &viewer.id, &token, &text)
            .await?;
        self.reload().await?;
        Ok(())
    }

    /// Deletes a reply the viewer owns.
    pub async fn delete_reply(&mut self, id: &ReplyId) -> Result<()> {
        let (viewer, token) = self.require_session()?;

        self.service.delete_reply(id, &viewer.id, &token).await?;
        self.reload().await?;
        Ok(())
    }

    /// Casts a vote on a reply.
    ///
    /// The effective tri-state is computed client-side from the cached
    /// vote (same kind toggles to none, opposite kind overwrites) and
    /// sent explicitly. The returned counters are adopted verbatim; the
    /// cache is updated only after the service accepted the vote.
    pub async fn vote_reply(&mut self, id: &ReplyId, requested: VoteKind) -> Result<VoteTotals> {
        let (viewer, token) = self.require_session()?;

        let cached = self.votes.get(id, &viewer.id)?;
        let effective = effective_vote(cached, requested);

        let totals = self
            .service
            .vote_reply(id, &viewer.id, &token, effective)
            .await?;
        self.votes.set(id, &viewer.id, effective)?;

        info!(reply = %id, vote = %effective, "vote accepted");
        self.reload().await?;
        Ok(totals)
    }

    /// Reports a query.
    ///
    /// A viewer who already reported the query is blocked locally,
    /// without a network call. Successful reports are marked so the
    /// block holds across reloads.
    pub async fn report_query(&mut self, id: &QueryId) -> Result<ReportState> {
        let (viewer, token) = self.require_session()?;

        if self.votes.has_reported(id, &viewer.id)? {
            return Err(KlqError::validation("You've already reported this query"));
        }

        let state = self.service.report_query(id, &viewer.id, &token).await?;
        self.votes.mark_reported(id, &viewer.id)?;

        info!(query = %id, report_count = state.report_count, "query reported");
        self.reload().await?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::model::Reply;
    use crate::queries::types::UserId;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory stand-in for the remote query service.
    #[derive(Default)]
    struct FakeState {
        queries: Vec<Query>,
        next_id: u64,
        vote_responses: VecDeque<VoteTotals>,
        log: Vec<String>,
    }

    #[derive(Clone, Default)]
    struct FakeQueryService {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeQueryService {
        fn log(&self) -> Vec<String> {
            self.state.lock().unwrap().log.clone()
        }

        fn push_vote_response(&self, totals: VoteTotals) {
            self.state.lock().unwrap().vote_responses.push_back(totals);
        }

        fn seed_query(&self, query: Query) {
            self.state.lock().unwrap().queries.push(query);
        }

        fn find_reply_mut<'a>(replies: &'a mut Vec<Reply>, id: &ReplyId) -> Option<&'a mut Reply> {
            for reply in replies {
                if &reply.id == id {
                    return Some(reply);
                }
                if let Some(found) = Self::find_reply_mut(&mut reply.replies, id) {
                    return Some(found);
                }
            }
            None
        }

        fn remove_reply(replies: &mut Vec<Reply>, id: &ReplyId) {
            replies.retain(|r| &r.id != id);
            for reply in replies {
                Self::remove_reply(&mut reply.replies, id);
            }
        }
    }

    #[async_trait::async_trait]
    impl QueryService for FakeQueryService {
        async fn list_queries(
            &self,
            search: Option<&str>,
            sort: Option<&str>,
            _token: Option<&str>,
        ) -> Result<Vec<Query>> {
            let mut state = self.state.lock().unwrap();
            state.log.push(format!(
                "list:{}:{}",
                search.unwrap_or(""),
                sort.unwrap_or("")
            ));
            Ok(state.queries.clone())
        }

        async fn create_query(&self, viewer: &UserId, _token: &str, text: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("q{}", state.next_id);
            state.log.push(format!("create_query:{}", text));
            state.queries.push(Query {
                id: QueryId::new(id),
                text: text.to_string(),
                author_id: Some(viewer.clone()),
                author_name: Some("Fake".to_string()),
                created_at: None,
                report_count: 0,
                replies: Vec::new(),
            });
            Ok(())
        }

        async fn edit_query(
            &self,
            id: &QueryId,
            _viewer: &UserId,
            _token: &str,
            text: &str,
        ) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.log.push(format!("edit_query:{}", id));
            match state.queries.iter_mut().find(|q| &q.id == id) {
                Some(query) => {
                    query.text = text.to_string();
                    Ok(())
                }
                None => Err(KlqError::service("no such query")),
            }
        }

        async fn delete_query(&self, id: &QueryId, _viewer: &UserId, _token: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.log.push(format!("delete_query:{}", id));
            state.queries.retain(|q| &q.id != id);
            Ok(())
        }

        async fn create_reply(
            &self,
            query: &QueryId,
            viewer: &UserId,
            _token: &str,
            text: &str,
        ) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("r{}", state.next_id);
            state.log.push(format!("create_reply:{}", query));
            let reply = Reply {
                id: ReplyId::new(id),
                text: text.to_string(),
                author_id: Some(viewer.clone()),
                author_name: Some("Fake".to_string()),
                likes: 0,
                dislikes: 0,
                replies: Vec::new(),
            };
            match state.queries.iter_mut().find(|q| &q.id == query) {
                Some(q) => {
                    q.replies.push(reply);
                    Ok(())
                }
                None => Err(KlqError::service("no such query")),
            }
        }

        async fn create_nested_reply(
            &self,
            parent: &ReplyId,
            viewer: &UserId,
            _token: &str,
            text: &str,
        ) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("r{}", state.next_id);
            state.log.push(format!("create_nested_reply:{}", parent));
            let child = Reply {
                id: ReplyId::new(id),
                text: text.to_string(),
                author_id: Some(viewer.clone()),
                author_name: Some("Fake".to_string()),
                likes: 0,
                dislikes: 0,
                replies: Vec::new(),
            };
            for query in &mut state.queries {
                if let Some(target) = Self::find_reply_mut(&mut query.replies, parent) {
                    target.replies.push(child);
                    return Ok(());
                }
            }
            Err(KlqError::service("no such reply"))
        }

        async fn edit_reply(
            &self,
            id: &ReplyId,
            _viewer: &UserId,
            _token: &str,
            text: &str,
        ) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.log.push(format!("edit_reply:{}", id));
            for query in &mut state.queries {
                if let Some(target) = Self::find_reply_mut(&mut query.replies, id) {
                    target.text = text.to_string();
                    return Ok(());
                }
            }
            Err(KlqError::service("no such reply"))
        }

        async fn delete_reply(&self, id: &ReplyId, _viewer: &UserId, _token: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.log.push(format!("delete_reply:{}", id));
            for query in &mut state.queries {
                Self::remove_reply(&mut query.replies, id);
            }
            Ok(())
        }

        async fn vote_reply(
            &self,
            id: &ReplyId,
            _viewer: &UserId,
            _token: &str,
            vote: VoteKind,
        ) -> Result<VoteTotals> {
            let mut state = self.state.lock().unwrap();
            state.log.push(format!("vote:{}:{}", id, vote));
            Ok(state
                .vote_responses
                .pop_front()
                .unwrap_or(VoteTotals { likes: 0, dislikes: 0 }))
        }

        async fn report_query(
            &self,
            id: &QueryId,
            _viewer: &UserId,
            _token: &str,
        ) -> Result<ReportState> {
            let mut state = self.state.lock().unwrap();
            state.log.push(format!("report:{}", id));
            match state.queries.iter_mut().find(|q| &q.id == id) {
                Some(query) => {
                    query.report_count += 1;
                    Ok(ReportState {
                        report_count: query.report_count,
                    })
                }
                None => Err(KlqError::service("no such query")),
            }
        }
    }

    fn create_client() -> (QueriesClient<FakeQueryService>, FakeQueryService, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store =
            Arc::new(ClientStore::open(temp_dir.path().join("store")).expect("Failed to open"));
        let service = FakeQueryService::default();
        let client = QueriesClient::new(service.clone(), store);
        (client, service, temp_dir)
    }

    fn sign_in(client: &QueriesClient<FakeQueryService>, id: &str) {
        let viewer = Viewer {
            id: UserId::new(id),
            name: Some("Tester".to_string()),
        };
        client.session().set_session(&viewer, "tok").unwrap();
    }

    #[tokio::test]
    async fn test_submit_query_then_reload_shows_it() {
        let (mut client, service, _temp) = create_client();
        sign_in(&client, "u1");

        client.submit_query("  Where is the exam hall?  ").await.unwrap();

        let queries = client.tree().queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].text, "Where is the exam hall?");
        // Exactly one mutation followed by one reload.
        let log = service.log();
        assert_eq!(log[0], "create_query:Where is the exam hall?");
        assert!(log[1].starts_with("list:"));
    }

    #[tokio::test]
    async fn test_unauthenticated_submit_sets_redirect_and_sends_nothing() {
        let (mut client, service, _temp) = create_client();

        let err = client.submit_query("hello").await.unwrap_err();
        assert!(matches!(err, KlqError::Permission(_)));
        assert!(service.log().is_empty());
        assert_eq!(
            client.session().take_redirect_after_login().unwrap().as_deref(),
            Some("queries")
        );
    }

    #[tokio::test]
    async fn test_denylist_blocks_before_dispatch() {
        let (mut client, service, _temp) = create_client();
        sign_in(&client, "u1");

        let err = client.submit_query("fuckoff now").await.unwrap_err();
        assert!(matches!(err, KlqError::Validation(_)));
        assert!(service.log().is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_edit_rejected_without_request() {
        let (mut client, service, _temp) = create_client();
        sign_in(&client, "u1");

        let err = client
            .edit_query(&QueryId::new("q1"), "   \n ")
            .await
            .unwrap_err();
        assert!(matches!(err, KlqError::Validation(_)));
        assert!(service.log().is_empty());
    }

    #[tokio::test]
    async fn test_nested_reply_appears_under_target() {
        let (mut client, _service, _temp) = create_client();
        sign_in(&client, "u1");

        client.submit_query("root").await.unwrap();
        let query_id = client.tree().queries()[0].id.clone();
        client.submit_reply(&query_id, "first").await.unwrap();

        let reply_id = {
            let entry = client.tree().query(&query_id).unwrap();
            let idx = entry.roots[0];
            client.tree().node(idx).unwrap().id.clone()
        };
        client.submit_nested_reply(&reply_id, "second").await.unwrap();

        let nested = client.tree().find_reply(&reply_id).unwrap();
        assert_eq!(nested.children.len(), 1);
        let child = client.tree().node(nested.children[0]).unwrap();
        assert_eq!(child.text, "second");
        assert_eq!(child.depth, 1);
    }

    #[tokio::test]
    async fn test_vote_toggle_sequence() {
        let (mut client, service, _temp) = create_client();
        sign_in(&client, "u1");
        let reply = ReplyId::new("r1");
        let viewer = UserId::new("u1");

        // Viewer's cached vote is like; the reply shows 3 likes, 1 dislike.
        client.votes().set(&reply, &viewer, VoteKind::Like).unwrap();
        service.push_vote_response(VoteTotals { likes: 2, dislikes: 2 });

        // Clicking the downvote affordance sends effective "dislike".
        let totals = client.vote_reply(&reply, VoteKind::Dislike).await.unwrap();
        assert_eq!(totals, VoteTotals { likes: 2, dislikes: 2 });
        assert_eq!(client.votes().get(&reply, &viewer).unwrap(), VoteKind::Dislike);
        assert!(service.log().contains(&"vote:r1:dislike".to_string()));

        // Clicking downvote again toggles to "none".
        service.push_vote_response(VoteTotals { likes: 2, dislikes: 1 });
        client.vote_reply(&reply, VoteKind::Dislike).await.unwrap();
        assert_eq!(client.votes().get(&reply, &viewer).unwrap(), VoteKind::None);
        assert!(service.log().contains(&"vote:r1:none".to_string()));
    }

    #[tokio::test]
    async fn test_repeat_report_blocked_locally() {
        let (mut client, service, _temp) = create_client();
        sign_in(&client, "u2");
        service.seed_query(Query {
            id: QueryId::new("q1"),
            text: "target".to_string(),
            author_id: Some(UserId::new("u1")),
            author_name: None,
            created_at: None,
            report_count: 0,
            replies: Vec::new(),
        });

        let state = client.report_query(&QueryId::new("q1")).await.unwrap();
        assert_eq!(state.report_count, 1);

        let err = client.report_query(&QueryId::new("q1")).await.unwrap_err();
        assert!(matches!(err, KlqError::Validation(_)));

        // Only the first attempt reached the service.
        let reports = service
            .log()
            .iter()
            .filter(|l| l.starts_with("report:"))
            .count();
        assert_eq!(reports, 1);
    }

    #[tokio::test]
    async fn test_delete_query_absent_after_reload() {
        let (mut client, _service, _temp) = create_client();
        sign_in(&client, "u1");

        client.submit_query("to be deleted").await.unwrap();
        let id = client.tree().queries()[0].id.clone();
        client.delete_query(&id).await.unwrap();

        assert!(client.tree().is_empty());
    }

    #[tokio::test]
    async fn test_search_lowercased_before_dispatch() {
        let (mut client, service, _temp) = create_client();
        client.set_search(Some("Exam HALL".to_string()));
        client.reload().await.unwrap();

        assert_eq!(service.log(), vec!["list:exam hall:newest".to_string()]);
    }

    #[test]
    fn test_stale_reload_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(ClientStore::open(temp_dir.path().join("store")).unwrap());
        let mut client = QueriesClient::new(FakeQueryService::default(), store);

        let older = client.next_reload_seq();
        let newer = client.next_reload_seq();

        let newer_payload = vec![Query {
            id: QueryId::new("q-new"),
            text: "new".to_string(),
            author_id: None,
            author_name: None,
            created_at: None,
            report_count: 0,
            replies: Vec::new(),
        }];
        assert!(client.apply_reload(newer, newer_payload));

        // The slower, older response arrives afterwards and is dropped.
        let older_payload = vec![Query {
            id: QueryId::new("q-old"),
            text: "old".to_string(),
            author_id: None,
            author_name: None,
            created_at: None,
            report_count: 0,
            replies: Vec::new(),
        }];
        assert!(!client.apply_reload(older, older_payload));

        assert_eq!(client.tree().queries().len(), 1);
        assert_eq!(client.tree().queries()[0].id, QueryId::new("q-new"));
    }
}
