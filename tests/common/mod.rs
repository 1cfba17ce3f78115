#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gitwrapped::ApiError;
use gitwrapped::github::{
    AuthenticatedUser, GithubApi, IssueComment, Owner, PullRequest, Repository, Review,
    WeeklyCommitActivity,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const OWNER: &str = "octocat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CommitActivity,
    Comments,
    PullRequests,
    Reviews,
}

/// In-memory GitHub. Anything not configured answers with an empty list.
#[derive(Default)]
pub struct FakeGithub {
    repos: Vec<Repository>,
    fail_listing: bool,
    user: Option<AuthenticatedUser>,
    weeks: HashMap<String, Vec<WeeklyCommitActivity>>,
    comments: HashMap<String, Vec<IssueComment>>,
    pulls: HashMap<String, Vec<PullRequest>>,
    reviews: HashMap<(String, u64), Vec<Review>>,
    failing: HashSet<(String, Endpoint)>,
    failing_reviews: HashSet<(String, u64)>,
    panicking: HashSet<String>,
    delays: HashMap<(String, Endpoint), Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeGithub {
    pub fn new() -> Self {
        Self {
            user: Some(AuthenticatedUser {
                login: OWNER.to_string(),
                avatar_url: "https://avatars.example/octocat".to_string(),
            }),
            ..Self::default()
        }
    }

    pub fn repo(mut self, repo: Repository) -> Self {
        self.repos.push(repo);
        self
    }

    pub fn weeks(mut self, repo: &str, weeks: Vec<WeeklyCommitActivity>) -> Self {
        self.weeks.insert(repo.to_string(), weeks);
        self
    }

    pub fn comments(mut self, repo: &str, comments: Vec<IssueComment>) -> Self {
        self.comments.insert(repo.to_string(), comments);
        self
    }

    pub fn pull(mut self, repo: &str, number: u64, reviews: Vec<Review>) -> Self {
        self.pulls
            .entry(repo.to_string())
            .or_default()
            .push(PullRequest { number });
        self.reviews.insert((repo.to_string(), number), reviews);
        self
    }

    pub fn fail(mut self, repo: &str, endpoint: Endpoint) -> Self {
        self.failing.insert((repo.to_string(), endpoint));
        self
    }

    pub fn fail_reviews_of(mut self, repo: &str, number: u64) -> Self {
        self.failing_reviews.insert((repo.to_string(), number));
        self
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn without_user(mut self) -> Self {
        self.user = None;
        self
    }

    pub fn panic_on(mut self, repo: &str) -> Self {
        self.panicking.insert(repo.to_string());
        self
    }

    pub fn delay(mut self, repo: &str, endpoint: Endpoint, delay: Duration) -> Self {
        self.delays.insert((repo.to_string(), endpoint), delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, repo: &str, endpoint: Endpoint) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&(repo.to_string(), endpoint)) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(*delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        if self.failing.contains(&(repo.to_string(), endpoint)) {
            return Err(server_error(repo));
        }
        Ok(())
    }
}

fn server_error(repo: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        endpoint: format!("/repos/{OWNER}/{repo}"),
    }
}

#[async_trait]
impl GithubApi for FakeGithub {
    async fn owned_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(ApiError::Status {
                status: 401,
                endpoint: "/user/repos".to_string(),
            });
        }
        Ok(self.repos.clone())
    }

    async fn commit_activity(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<Vec<WeeklyCommitActivity>, ApiError> {
        if self.panicking.contains(repo) {
            panic!("fake GitHub blew up on {repo}");
        }
        self.enter(repo, Endpoint::CommitActivity).await?;
        Ok(self.weeks.get(repo).cloned().unwrap_or_default())
    }

    async fn issue_comments(
        &self,
        _owner: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<IssueComment>, ApiError> {
        self.enter(repo, Endpoint::Comments).await?;
        Ok(self
            .comments
            .get(repo)
            .map(|all| {
                all.iter()
                    .filter(|c| c.created_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn pull_requests(&self, _owner: &str, repo: &str) -> Result<Vec<PullRequest>, ApiError> {
        self.enter(repo, Endpoint::PullRequests).await?;
        Ok(self.pulls.get(repo).cloned().unwrap_or_default())
    }

    async fn pull_reviews(
        &self,
        _owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>, ApiError> {
        self.enter(repo, Endpoint::Reviews).await?;
        if self.failing_reviews.contains(&(repo.to_string(), number)) {
            return Err(server_error(repo));
        }
        Ok(self
            .reviews
            .get(&(repo.to_string(), number))
            .cloned()
            .unwrap_or_default())
    }

    async fn authenticated_user(&self) -> Result<AuthenticatedUser, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.user.clone().ok_or(ApiError::Status {
            status: 502,
            endpoint: "/user".to_string(),
        })
    }
}

pub fn repo(name: &str, language: Option<&str>, stars: u64) -> Repository {
    Repository {
        name: name.to_string(),
        owner: Owner {
            login: OWNER.to_string(),
        },
        fork: false,
        stargazers_count: stars,
        html_url: format!("https://github.com/{OWNER}/{name}"),
        description: Some(format!("{name} description")),
        language: language.map(str::to_string),
    }
}

pub fn fork(name: &str) -> Repository {
    Repository {
        fork: true,
        ..repo(name, Some("C"), 50)
    }
}

/// A commit-activity week starting on the Sunday `y-m-d`.
pub fn week(y: i32, m: u32, d: u32, days: [u64; 7]) -> WeeklyCommitActivity {
    let start = NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();
    WeeklyCommitActivity {
        week: start.timestamp(),
        days: days.to_vec(),
        total: days.iter().sum(),
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn comment(created_at: DateTime<Utc>) -> IssueComment {
    IssueComment { created_at }
}

pub fn review(submitted_at: Option<DateTime<Utc>>) -> Review {
    Review { submitted_at }
}
