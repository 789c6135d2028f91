//! HTTP client for the directory API (reqwest-based).

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::models::{
    AssociationRequest, DirectoryGroup, DirectoryUser, GraphEdge, GroupWriteBody, MemberRequest,
    UserListEnvelope,
};

/// Build an exact-match filter expression for a list endpoint.
///
/// The remote filter may still return a superset (partial matching), so
/// callers must re-filter locally for exact equality.
#[must_use]
pub fn eq_filter(field: &str, value: &str) -> String {
    format!("{field}:$eq:{value}")
}

/// Directory API client.
///
/// Wraps a shared `reqwest::Client`, so clones are cheap and safe to hand to
/// concurrent workers; the client itself holds no mutable state.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    base_url: String,
    http_client: Client,
}

impl DirectoryClient {
    /// Create a new client from a validated configuration.
    pub fn new(config: &DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| DirectoryError::Config(format!("invalid api_key header value: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);
        if let Some(ref org_id) = config.org_id {
            let org = HeaderValue::from_str(org_id)
                .map_err(|e| DirectoryError::Config(format!("invalid org_id header value: {e}")))?;
            headers.insert("x-org-id", org);
        }

        let http_client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .user_agent("dirsync/0.3")
            .build()
            .map_err(|e| DirectoryError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(base_url: impl Into<String>, http_client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── User operations ───────────────────────────────────────────────

    /// List users with an optional filter and `limit`/`skip` pagination.
    pub async fn list_users(
        &self,
        filter: Option<&str>,
        limit: u32,
        skip: u32,
    ) -> DirectoryResult<UserListEnvelope> {
        let url = format!("{}/users", self.base_url);
        self.get_with_params(&url, filter, None, limit, skip).await
    }

    /// Get a user by remote ID.
    pub async fn get_user(&self, user_id: &str) -> DirectoryResult<DirectoryUser> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        self.get(&url).await
    }

    /// List one page of the group edges a user belongs to.
    pub async fn user_group_edges(
        &self,
        user_id: &str,
        limit: u32,
        skip: u32,
    ) -> DirectoryResult<Vec<GraphEdge>> {
        let url = format!("{}/users/{}/memberof", self.base_url, user_id);
        self.get_with_params(&url, None, None, limit, skip).await
    }

    // ── Group operations ──────────────────────────────────────────────

    /// List groups with an optional filter and `limit`/`skip` pagination.
    pub async fn list_groups(
        &self,
        filter: Option<&str>,
        limit: u32,
        skip: u32,
    ) -> DirectoryResult<Vec<DirectoryGroup>> {
        let url = format!("{}/usergroups", self.base_url);
        self.get_with_params(&url, filter, None, limit, skip).await
    }

    /// Get a group by remote ID.
    pub async fn get_group(&self, group_id: &str) -> DirectoryResult<DirectoryGroup> {
        let url = format!("{}/usergroups/{}", self.base_url, group_id);
        self.get(&url).await
    }

    /// Create a group.
    pub async fn create_group(&self, body: &GroupWriteBody) -> DirectoryResult<DirectoryGroup> {
        let url = format!("{}/usergroups", self.base_url);
        self.post(&url, body).await
    }

    /// Replace a group's attributes.
    pub async fn update_group(
        &self,
        group_id: &str,
        body: &GroupWriteBody,
    ) -> DirectoryResult<DirectoryGroup> {
        let url = format!("{}/usergroups/{}", self.base_url, group_id);
        self.put(&url, body).await
    }

    /// Delete a group.
    pub async fn delete_group(&self, group_id: &str) -> DirectoryResult<()> {
        let url = format!("{}/usergroups/{}", self.base_url, group_id);
        self.delete(&url).await
    }

    // ── Graph operations ──────────────────────────────────────────────

    /// List one page of a group's member edges.
    pub async fn group_member_edges(
        &self,
        group_id: &str,
        limit: u32,
        skip: u32,
    ) -> DirectoryResult<Vec<GraphEdge>> {
        let url = format!("{}/usergroups/{}/members", self.base_url, group_id);
        self.get_with_params(&url, None, None, limit, skip).await
    }

    /// Toggle one user↔group membership edge.
    pub async fn modify_group_members(
        &self,
        group_id: &str,
        body: &MemberRequest,
    ) -> DirectoryResult<()> {
        let url = format!("{}/usergroups/{}/members", self.base_url, group_id);
        self.post_no_content(&url, body).await
    }

    /// List one page of a group's association edges, scoped to one object
    /// kind.
    pub async fn group_association_edges(
        &self,
        group_id: &str,
        target: &str,
        limit: u32,
        skip: u32,
    ) -> DirectoryResult<Vec<GraphEdge>> {
        let url = format!("{}/usergroups/{}/associations", self.base_url, group_id);
        self.get_with_params(&url, None, Some(target), limit, skip)
            .await
    }

    /// Toggle one group↔object association edge.
    pub async fn modify_group_association(
        &self,
        group_id: &str,
        body: &AssociationRequest,
    ) -> DirectoryResult<()> {
        let url = format!("{}/usergroups/{}/associations", self.base_url, group_id);
        self.post_no_content(&url, body).await
    }

    // ── Internal HTTP methods ─────────────────────────────────────────

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        url: &str,
        filter: Option<&str>,
        targets: Option<&str>,
        limit: u32,
        skip: u32,
    ) -> DirectoryResult<T> {
        debug!(url, filter, limit, skip, "directory GET");
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if skip > 0 {
            query.push(("skip", skip.to_string()));
        }
        if let Some(f) = filter {
            query.push(("filter", f.to_string()));
        }
        if let Some(t) = targets {
            query.push(("targets", t.to_string()));
        }
        let response = self.http_client.get(url).query(&query).send().await?;
        self.handle_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> DirectoryResult<T> {
        debug!(url, "directory GET");
        let response = self.http_client.get(url).send().await?;
        self.handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> DirectoryResult<T> {
        debug!(url, "directory POST");
        let response = self.http_client.post(url).json(body).send().await?;
        self.handle_response(response).await
    }

    async fn post_no_content<B: Serialize>(&self, url: &str, body: &B) -> DirectoryResult<()> {
        debug!(url, "directory POST");
        let response = self.http_client.post(url).json(body).send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> DirectoryResult<T> {
        debug!(url, "directory PUT");
        let response = self.http_client.put(url).json(body).send().await?;
        self.handle_response(response).await
    }

    async fn delete(&self, url: &str) -> DirectoryResult<()> {
        debug!(url, "directory DELETE");
        let response = self.http_client.delete(url).send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response).await
        }
    }

    // ── Response handling ─────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> DirectoryResult<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            self.handle_error_response(response).await
        }
    }

    /// Map a non-success response onto the error taxonomy by status code;
    /// the body is carried for diagnostics only, never matched against.
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> DirectoryResult<T> {
        let status = response.status();

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::NOT_FOUND => Err(DirectoryError::NotFound(body)),
            StatusCode::CONFLICT => Err(DirectoryError::Conflict(body)),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(retry_after, "directory API rate limited");
                Err(DirectoryError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            _ => {
                let message = if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                };
                Err(DirectoryError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
