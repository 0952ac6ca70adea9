//! GitHub REST/GraphQL client.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::DateTime;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::{GitHubError, Result};
use super::query::ContributionsQuery;
use super::types::{
    Contributor, GraphQlResponse, RateLimitResponse, RepositorySummary, SearchData,
    UserSearchPage,
};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::rate_limit::ApiRateLimiter;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_USER_AGENT: &str = concat!("repograph/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL, without trailing slash.
    pub api_url: String,
    /// GraphQL endpoint.
    pub graphql_url: String,
    /// Login used for HTTP basic auth.
    pub login: String,
    /// Personal access token used as the basic-auth password.
    pub token: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(login: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            login: login.into(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Value of the `Authorization` header.
    fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.login, self.token);
        format!("Basic {}", BASE64.encode(credentials))
    }
}

/// Client for the handful of GitHub endpoints the crawler needs.
///
/// Cheap to clone; clones share the transport and the optional pacer.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
    /// Optional proactive pacing of outgoing requests.
    pacer: Option<ApiRateLimiter>,
}

impl GitHubClient {
    /// Create a client backed by a reqwest transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            config: Arc::new(config),
            pacer: None,
        }
    }

    #[must_use]
    pub fn with_pacer(mut self, pacer: ApiRateLimiter) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET /rate_limit`. Does not count against the quota.
    pub async fn rate_limit(&self) -> Result<RateLimitResponse> {
        let url = format!("{}/rate_limit", self.config.api_url);
        let response = self.send(HttpMethod::Get, &url, Vec::new()).await?;
        decode(&url, &response)
    }

    /// `GET /repositories?since=<id>`: public repositories with id > `since`,
    /// in ascending id order.
    pub async fn list_repositories(&self, since: u64) -> Result<Vec<RepositorySummary>> {
        let url = Url::parse_with_params(
            &format!("{}/repositories", self.config.api_url),
            &[("since", since.to_string())],
        )?;
        let response = self.send(HttpMethod::Get, url.as_str(), Vec::new()).await?;
        decode(url.as_str(), &response)
    }

    /// `GET /repos/{full_name}/contributors` (first page only).
    ///
    /// An empty repository answers 204 and yields no contributors.
    pub async fn list_contributors(
        &self,
        full_name: &str,
        per_page: u32,
    ) -> Result<Vec<Contributor>> {
        let url = Url::parse_with_params(
            &format!("{}/repos/{}/contributors", self.config.api_url, full_name),
            &[("per_page", per_page.clamp(1, 100).to_string())],
        )?;
        let response = self.send(HttpMethod::Get, url.as_str(), Vec::new()).await?;
        if response.status == 204 || response.body.is_empty() {
            return Ok(Vec::new());
        }
        decode(url.as_str(), &response)
    }

    /// Run one page of the user/contribution search.
    pub async fn search_users(&self, query: &ContributionsQuery) -> Result<UserSearchPage> {
        let url = self.config.graphql_url.clone();
        let body = serde_json::to_vec(&query.to_body()).map_err(|source| GitHubError::Decode {
            route: url.clone(),
            source,
        })?;
        let response = self.send(HttpMethod::Post, &url, body).await?;
        let parsed: GraphQlResponse<SearchData> = decode(&url, &response)?;

        let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
        let Some(data) = parsed.data else {
            let message = if messages.is_empty() {
                "response carried no data".to_string()
            } else {
                messages.join("; ")
            };
            return Err(GitHubError::GraphQl(message));
        };
        if !messages.is_empty() {
            tracing::warn!(errors = %messages.join("; "), "GraphQL response carried partial errors");
        }

        Ok(UserSearchPage {
            remaining: data.rate_limit.map(|r| r.remaining),
            end_cursor: data.search.page_info.end_cursor,
            edges: data.search.edges,
        })
    }

    async fn send(&self, method: HttpMethod, url: &str, body: Vec<u8>) -> Result<HttpResponse> {
        if let Some(ref pacer) = self.pacer {
            pacer.wait().await;
        }

        let mut headers = vec![
            ("Accept".to_string(), "application/vnd.github+json".to_string()),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            ("Authorization".to_string(), self.config.basic_auth()),
        ];
        if method == HttpMethod::Post {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        tracing::debug!(method = method.as_str(), url, "GitHub request");
        let response = self
            .transport
            .send(HttpRequest {
                method,
                url: url.to_string(),
                headers,
                body,
            })
            .await
            .map_err(GitHubError::from)?;

        classify(url, response)
    }
}

/// Map a non-success status to a typed error.
fn classify(route: &str, response: HttpResponse) -> Result<HttpResponse> {
    match response.status {
        200..=299 => Ok(response),
        401 => Err(GitHubError::AuthFailed),
        status @ (403 | 429)
            if status == 429 || response.header("x-ratelimit-remaining") == Some("0") =>
        {
            let reset_at = response
                .header("x-ratelimit-reset")
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|epoch| DateTime::from_timestamp(epoch, 0));
            Err(GitHubError::RateLimited { status, reset_at })
        }
        404 => Err(GitHubError::NotFound(route.to_string())),
        451 => Err(GitHubError::Unavailable(route.to_string())),
        status => Err(GitHubError::Status {
            status,
            route: route.to_string(),
        }),
    }
}

fn decode<T: DeserializeOwned>(route: &str, response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|source| GitHubError::Decode {
        route: route.to_string(),
        source,
    })
}
