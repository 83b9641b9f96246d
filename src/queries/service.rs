//! The remote query service boundary.
//!
//! The service exclusively owns durable state. It is consumed over plain
//! request/response calls; the trait below is the exact surface the core
//! needs, and `HttpQueryService` implements it with reqwest against the
//! backend's REST endpoints (bearer token header, query-string
//! parameters). Tests substitute an in-memory implementation.

use crate::error::{KlqError, Result};
use crate::queries::model::{Query, ReportState, VoteTotals};
use crate::queries::types::{QueryId, ReplyId, UserId, VoteKind};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{info, instrument};

/// Authoritative remote store of queries, replies, votes and reports.
///
/// Every mutation is owner-checked server-side regardless of what the
/// client gated in its UI.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Lists queries with optional search text and sort key, nested
    /// replies included, in server-decided order.
    async fn list_queries(
        &self,
        search: Option<&str>,
        sort: Option<&str>,
        token: Option<&str>,
    ) -> Result<Vec<Query>>;

    /// Creates a new query.
    async fn create_query(&self, viewer: &UserId, token: &str, text: &str) -> Result<()>;

    /// Replaces the text of an owned query.
    async fn edit_query(
        &self,
        id: &QueryId,
        viewer: &UserId,
        token: &str,
        text: &str,
    ) -> Result<()>;

    /// Deletes an owned query.
    async fn delete_query(&self, id: &QueryId, viewer: &UserId, token: &str) -> Result<()>;

    /// Creates a top-level reply under a query.
    async fn create_reply(
        &self,
        query: &QueryId,
        viewer: &UserId,
        token: &str,
        text: &str,
    ) -> Result<()>;

    /// Creates a nested reply under another reply.
    async fn create_nested_reply(
        &self,
        parent: &ReplyId,
        viewer: &UserId,
        token: &str,
        text: &str,
    ) -> Result<()>;

    /// Replaces the text of an owned reply.
    async fn edit_reply(
        &self,
        id: &ReplyId,
        viewer: &UserId,
        token: &str,
        text: &str,
    ) -> Result<()>;

    /// Deletes an owned reply.
    async fn delete_reply(&self, id: &ReplyId, viewer: &UserId, token: &str) -> Result<()>;

    /// Casts an effective vote and returns the updated aggregate counters.
    async fn vote_reply(
        &self,
        id: &ReplyId,
        viewer: &UserId,
        token: &str,
        vote: VoteKind,
    ) -> Result<VoteTotals>;

    /// Reports a query and returns the updated report state.
    async fn report_query(&self, id: &QueryId, viewer: &UserId, token: &str)
        -> Result<ReportState>;
}

/// HTTP implementation of [`QueryService`].
#[derive(Debug, Clone)]
pub struct HttpQueryService {
    client: Client,
    base_url: String,
}

impl HttpQueryService {
    /// Creates a client against the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Checks the response status, mapping non-success to a service error.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KlqError::service(format!(
                "query service returned {}: {}",
                status,
                body.trim()
            )));
        }
        Ok(response)
    }

    /// Sends a mutation request, discarding the response body.
    async fn send(request: RequestBuilder, token: &str) -> Result<()> {
        let response = request.bearer_auth(token).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl QueryService for HttpQueryService {
    #[instrument(skip(self, token))]
    async fn list_queries(
        &self,
        search: Option<&str>,
        sort: Option<&str>,
        token: Option<&str>,
    ) -> Result<Vec<Query>> {
        let mut request = self.client.get(self.url("/api/queries")).query(&[
            ("search", search.unwrap_or("")),
            ("sort", sort.unwrap_or("newest")),
        ]);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = Self::check(request.send().await?).await?;
        let queries: Vec<Query> = response
            .json()
            .await
            .map_err(|e| KlqError::serialization(format!("Malformed query listing: {}", e)))?;

        info!(count = queries.len(), "fetched query listing");
        Ok(queries)
    }

    #[instrument(skip(self, token, text))]
    async fn create_query(&self, viewer: &UserId, token: &str, text: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url("/api/queries/post"))
            .query(&[("userId", viewer.as_str()), ("text", text)]);
        Self::send(request, token).await
    }

    #[instrument(skip(self, token, text))]
    async fn edit_query(
        &self,
        id: &QueryId,
        viewer: &UserId,
        token: &str,
        text: &str,
    ) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("/api/queries/{}", id)))
            .query(&[("userId", viewer.as_str()), ("text", text)]);
        Self::send(request, token).await
    }

    #[instrument(skip(self, token))]
    async fn delete_query(&self, id: &QueryId, viewer: &UserId, token: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/api/queries/{}", id)))
            .query(&[("userId", viewer.as_str())]);
        Self::send(request, token).await
    }

    #[instrument(skip(self, token, text))]
    async fn create_reply(
        &self,
        query: &QueryId,
        viewer: &UserId,
        token: &str,
        text: &str,
    ) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/api/queries/{}/reply", query)))
            .query(&[("userId", viewer.as_str()), ("text", text)]);
        Self::send(request, token).await
    }

    #[instrument(skip(self, token, text))]
    async fn create_nested_reply(
        &self,
        parent: &ReplyId,
        viewer: &UserId,
        token: &str,
        text: &str,
    ) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/api/replies/{}/reply", parent)))
            .query(&[("userId", viewer.as_str()), ("text", text)]);
        Self::send(request, token).await
    }

    #[instrument(skip(self, token, text))]
    async fn edit_reply(
        &self,
        id: &ReplyId,
        viewer: &UserId,
        token: &str,
        text: &str,
    ) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("/api/replies/{}", id)))
            .query(&[("userId", viewer.as_str()), ("text", text)]);
        Self::send(request, token).await
    }

    #[instrument(skip(self, token))]
    async fn delete_reply(&self, id: &ReplyId, viewer: &UserId, token: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/api/replies/{}", id)))
            .query(&[("userId", viewer.as_str())]);
        Self::send(request, token).await
    }

    #[instrument(skip(self, token))]
    async fn vote_reply(
        &self,
        id: &ReplyId,
        viewer: &UserId,
        token: &str,
        vote: VoteKind,
    ) -> Result<VoteTotals> {
        let request = self
            .client
            .post(self.url(&format!("/api/replies/{}/vote", id)))
            .query(&[("userId", viewer.as_str()), ("type", vote.as_str())])
            .bearer_auth(token);

        let response = Self::check(request.send().await?).await?;
        let totals: VoteTotals = response
            .json()
            .await
            .map_err(|e| KlqError::serialization(format!("Malformed vote response: {}", e)))?;
        Ok(totals)
    }

    #[instrument(skip(self, token))]
    async fn report_query(
        &self,
        id: &QueryId,
        viewer: &UserId,
        token: &str,
    ) -> Result<ReportState> {
        let request = self
            .client
            .post(self.url(&format!("/api/queries/{}/report", id)))
            .query(&[("userId", viewer.as_str())])
            .bearer_auth(token);

        let response = Self::check(request.send().await?).await?;
        // Some backends answer with a bare acknowledgment; treat an
        // unparsable body as an empty report state.
        let state = response.json().await.unwrap_or_default();
        Ok(state)
    }
}
