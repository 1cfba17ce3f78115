//! Per-repository activity collection.
//!
//! Each repository is read through three independent signals: the weekly
//! commit-activity series, issue comments, and pull-request reviews. A failed
//! signal counts as zero and is recorded as a [`CollectionWarning`]; the other
//! signals are kept.

use crate::calendar::{DailyBucket, ReportPeriod, week_day_date};
use crate::config::EngineConfig;
use crate::error::ApiError;
use crate::github::{GithubApi, Repository, WeeklyCommitActivity};
use crate::stats::RepositoryStat;
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    CommitActivity,
    Comments,
    Reviews,
    /// The collection task itself died.
    Task,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::CommitActivity => "commit activity",
            Signal::Comments => "comments",
            Signal::Reviews => "reviews",
            Signal::Task => "collection task",
        };
        f.write_str(name)
    }
}

/// A repository-local failure that was absorbed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionWarning {
    pub repository: String,
    pub signal: Signal,
    pub message: String,
}

impl CollectionWarning {
    pub fn new(repository: &str, signal: Signal, message: impl Into<String>) -> Self {
        let warning = Self {
            repository: repository.to_string(),
            signal,
            message: message.into(),
        };
        warn!(
            "Failed to collect {} for {}: {}",
            warning.signal, warning.repository, warning.message
        );
        warning
    }
}

/// Everything one repository contributes to the yearly summary.
#[derive(Debug, Clone)]
pub struct RepoActivity {
    pub stat: RepositoryStat,
    pub commits_by_day: DailyBucket,
    pub comments_by_day: DailyBucket,
    pub reviews_by_day: DailyBucket,
    pub active_days: BTreeSet<NaiveDate>,
    pub warnings: Vec<CollectionWarning>,
}

impl RepoActivity {
    /// Zero counts for `repo`, metadata intact.
    pub fn empty(repo: &Repository) -> Self {
        Self {
            stat: repository_stat(repo, 0, 0, 0),
            commits_by_day: DailyBucket::default(),
            comments_by_day: DailyBucket::default(),
            reviews_by_day: DailyBucket::default(),
            active_days: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }
}

/// Time limits for a repository's upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLimits {
    pub request: Duration,
    /// Longer, since GitHub may answer 202 several times before the
    /// statistics are ready.
    pub commit_activity: Duration,
}

impl CallLimits {
    pub fn uniform(limit: Duration) -> Self {
        Self {
            request: limit,
            commit_activity: limit,
        }
    }
}

impl From<&EngineConfig> for CallLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            request: config.request_timeout(),
            commit_activity: config.commit_activity_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct SignalTally {
    count: u64,
    by_day: DailyBucket,
    days: BTreeSet<NaiveDate>,
}

impl SignalTally {
    fn record(&mut self, date: NaiveDate, count: u64) {
        self.count = self.count.saturating_add(count);
        self.by_day.record_date(date, count);
        self.days.insert(date);
    }
}

/// Collect the three activity signals of `repo` for `period`. Never fails;
/// every upstream call is bounded by `limits`.
pub async fn collect_repository<A>(
    api: &A,
    repo: &Repository,
    period: &ReportPeriod,
    limits: CallLimits,
) -> RepoActivity
where
    A: GithubApi + ?Sized,
{
    let owner = repo.owner.login.as_str();
    let name = repo.name.as_str();
    let mut warnings = Vec::new();

    let commits = match bounded(
        limits.commit_activity,
        format!("{owner}/{name} commit activity"),
        api.commit_activity(owner, name),
    )
    .await
    {
        Ok(weeks) => tally_commits(&weeks, period),
        Err(e) => {
            warnings.push(CollectionWarning::new(name, Signal::CommitActivity, e.to_string()));
            SignalTally::default()
        }
    };

    let comments = match bounded(
        limits.request,
        format!("{owner}/{name} issue comments"),
        api.issue_comments(owner, name, period.comments_since()),
    )
    .await
    {
        Ok(comments) => {
            let mut tally = SignalTally::default();
            for comment in comments {
                let date = comment.created_at.date_naive();
                if period.contains(date) {
                    tally.record(date, 1);
                }
            }
            tally
        }
        Err(e) => {
            warnings.push(CollectionWarning::new(name, Signal::Comments, e.to_string()));
            SignalTally::default()
        }
    };

    let (reviews, review_error) = collect_reviews(api, repo, period, limits.request).await;
    if let Some(e) = review_error {
        warnings.push(CollectionWarning::new(name, Signal::Reviews, e.to_string()));
    }

    debug!(
        "{owner}/{name}: {} commits, {} comments, {} reviews",
        commits.count, comments.count, reviews.count
    );

    let mut active_days = commits.days;
    active_days.extend(comments.days);
    active_days.extend(reviews.days);

    RepoActivity {
        stat: repository_stat(repo, commits.count, comments.count, reviews.count),
        commits_by_day: commits.by_day,
        comments_by_day: comments.by_day,
        reviews_by_day: reviews.by_day,
        active_days,
        warnings,
    }
}

/// A week belongs to the year its Sunday start falls in; every nonzero day of
/// a kept week counts, including days that spill into the next January.
fn tally_commits(weeks: &[WeeklyCommitActivity], period: &ReportPeriod) -> SignalTally {
    let mut tally = SignalTally::default();
    for week in weeks {
        match week_day_date(week.week, 0) {
            Some(start) if period.contains(start) => {}
            Some(_) => continue,
            None => {
                debug!("Skipping unrepresentable week start {}", week.week);
                continue;
            }
        }
        for (index, &count) in week.days.iter().enumerate().take(7) {
            if count == 0 {
                continue;
            }
            if let Some(date) = week_day_date(week.week, index) {
                tally.record(date, count);
            }
        }
    }
    tally
}

/// Reviews counted before a failure are kept alongside the error.
async fn collect_reviews<A>(
    api: &A,
    repo: &Repository,
    period: &ReportPeriod,
    timeout: Duration,
) -> (SignalTally, Option<ApiError>)
where
    A: GithubApi + ?Sized,
{
    let owner = repo.owner.login.as_str();
    let name = repo.name.as_str();
    let mut tally = SignalTally::default();

    let pulls = match bounded(
        timeout,
        format!("{owner}/{name} pull requests"),
        api.pull_requests(owner, name),
    )
    .await
    {
        Ok(pulls) => pulls,
        Err(e) => return (tally, Some(e)),
    };

    for pull in pulls {
        let reviews = match bounded(
            timeout,
            format!("{owner}/{name}#{} reviews", pull.number),
            api.pull_reviews(owner, name, pull.number),
        )
        .await
        {
            Ok(reviews) => reviews,
            Err(e) => return (tally, Some(e)),
        };

        for submitted in reviews.iter().filter_map(|r| r.submitted_at) {
            let date = submitted.date_naive();
            if period.contains(date) {
                tally.record(date, 1);
            }
        }
    }

    (tally, None)
}

pub(crate) async fn bounded<T, F>(limit: Duration, endpoint: String, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(ApiError::Timeout { endpoint }))
}

fn repository_stat(repo: &Repository, commits: u64, comments: u64, reviews: u64) -> RepositoryStat {
    RepositoryStat {
        name: repo.name.clone(),
        commits,
        stars: repo.stargazers_count,
        url: repo.html_url.clone(),
        description: repo.description.clone(),
        language: repo.language.clone(),
        comments,
        reviews,
        contributions: commits.saturating_add(comments).saturating_add(reviews),
    }
}
