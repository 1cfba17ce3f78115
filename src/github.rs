use crate::config::EngineConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub stargazers_count: u64,
    pub html_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
}

/// One week of `/stats/commit_activity`.
#[derive(Debug, Clone, Deserialize)]
pub struct WeeklyCommitActivity {
    /// Week start, seconds since the epoch (Sunday 00:00 UTC).
    pub week: i64,
    /// Commits per day, Sunday first.
    pub days: Vec<u64>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    /// Absent for reviews that are still pending.
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthenticatedUser {
    pub login: String,
    pub avatar_url: String,
}

/// The upstream REST surface the engine reads from.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// First page of repositories owned by the authenticated user, most
    /// recently pushed first. Forks are included.
    async fn owned_repositories(&self) -> Result<Vec<Repository>, ApiError>;

    async fn commit_activity(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<WeeklyCommitActivity>, ApiError>;

    async fn issue_comments(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<IssueComment>, ApiError>;

    /// Pull requests in any state.
    async fn pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, ApiError>;

    async fn pull_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>, ApiError>;

    async fn authenticated_user(&self) -> Result<AuthenticatedUser, ApiError>;
}

#[derive(Clone)]
pub struct GithubClient {
    token: Arc<String>,
    http: Arc<Client>,
    base_url: Arc<String>,
    per_page: u8,
    max_retries: u32,
    stats_retries: u32,
    stats_retry_delay: Duration,
}

impl GithubClient {
    /// Create a REST client bound to `token`.
    pub fn new(token: &str, config: &EngineConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            token: Arc::new(token.to_string()),
            http: Arc::new(http),
            base_url: Arc::new(config.api_base_url.trim_end_matches('/').to_string()),
            per_page: config.per_page,
            max_retries: config.max_retries,
            stats_retries: config.stats_retries,
            stats_retry_delay: config.stats_retry_delay(),
        })
    }

    /// GET with retry/backoff on 5xx. A 202, the status GitHub uses while it
    /// computes repository statistics, is polled on its own budget at a fixed
    /// delay. 204 yields `T::default()`.
    async fn get<T>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut failures = 0u32;
        let mut polls = 0u32;

        loop {
            let resp = self
                .http
                .get(&url)
                .bearer_auth(&*self.token)
                .query(query)
                .send()
                .await
                .map_err(|e| transport_error(endpoint, e))?;

            let status = resp.status();

            if status == StatusCode::NO_CONTENT {
                return Ok(T::default());
            }

            if status == StatusCode::ACCEPTED {
                polls += 1;
                if polls > self.stats_retries {
                    return Err(ApiError::Pending {
                        endpoint: endpoint.to_string(),
                    });
                }
                debug!("{endpoint} not ready yet (poll {polls})");
                sleep(self.stats_retry_delay).await;
                continue;
            }

            if status.is_success() {
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| transport_error(endpoint, e))?;
                return serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
                    endpoint: endpoint.to_string(),
                    source,
                });
            }

            if status.is_server_error() && failures < self.max_retries {
                failures += 1;
                debug!("{endpoint} returned HTTP {} (attempt {failures})", status.as_u16());
                sleep(backoff(failures)).await;
                continue;
            }

            return Err(ApiError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }
    }

    fn per_page(&self) -> (&'static str, String) {
        ("per_page", self.per_page.to_string())
    }
}

/// A timed-out send or body read is a timeout; anything else is transport.
fn transport_error(endpoint: &str, e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        ApiError::Transport(e)
    }
}

/// 250ms, 500ms, 1s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(250u64.saturating_mul(1u64 << attempt.saturating_sub(1).min(6)))
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn owned_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        self.get(
            "/user/repos",
            &[
                ("type", "owner".to_string()),
                ("sort", "pushed".to_string()),
                self.per_page(),
            ],
        )
        .await
    }

    async fn commit_activity(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<WeeklyCommitActivity>, ApiError> {
        self.get(&format!("/repos/{owner}/{repo}/stats/commit_activity"), &[])
            .await
    }

    async fn issue_comments(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<IssueComment>, ApiError> {
        self.get(
            &format!("/repos/{owner}/{repo}/issues/comments"),
            &[
                ("since", since.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
                self.per_page(),
            ],
        )
        .await
    }

    async fn pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, ApiError> {
        self.get(
            &format!("/repos/{owner}/{repo}/pulls"),
            &[("state", "all".to_string()), self.per_page()],
        )
        .await
    }

    async fn pull_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>, ApiError> {
        self.get(
            &format!("/repos/{owner}/{repo}/pulls/{number}/reviews"),
            &[self.per_page()],
        )
        .await
    }

    async fn authenticated_user(&self) -> Result<AuthenticatedUser, ApiError> {
        self.get("/user", &[]).await
    }
}
