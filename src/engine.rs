//! Aggregation entry point.
//!
//! Lists the user's repositories, collects each one on a bounded pool of
//! tasks, merges the results in a single loop and attaches the user identity.

use crate::aggregator::Aggregator;
use crate::calendar::ReportPeriod;
use crate::collector::{
    CallLimits, CollectionWarning, RepoActivity, Signal, bounded, collect_repository,
};
use crate::config::EngineConfig;
use crate::error::{ApiError, Result, StatsError};
use crate::github::{AuthenticatedUser, GithubApi, GithubClient, Repository};
use crate::repos;
use crate::stats::{Stats, UserIdentity};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub struct StatsEngine {
    config: EngineConfig,
}

impl StatsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Aggregate the yearly statistics of the user owning `access_token`.
    ///
    /// A missing or blank token fails with [`StatsError::MissingCredential`]
    /// before any request is made.
    pub async fn aggregate(&self, access_token: Option<&str>, period: ReportPeriod) -> Result<Stats> {
        let token = access_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(StatsError::MissingCredential)?;

        let client = GithubClient::new(token, &self.config).map_err(StatsError::Client)?;
        self.aggregate_with(Arc::new(client), period, CancellationToken::new())
            .await
    }

    /// Aggregate through an already authenticated session.
    ///
    /// Only repository listing and identity failures are fatal; problems with
    /// individual repositories are logged and counted as zero. Firing `cancel`
    /// aborts all outstanding work and returns [`StatsError::Cancelled`].
    pub async fn aggregate_with<A>(
        &self,
        api: Arc<A>,
        period: ReportPeriod,
        cancel: CancellationToken,
    ) -> Result<Stats>
    where
        A: GithubApi + 'static,
    {
        let started = Instant::now();
        let timeout = self.config.request_timeout();
        info!("Aggregating activity for {}", period.year());

        let repos = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StatsError::Cancelled),
            listed = bounded(timeout, "/user/repos".to_string(), repos::owned_repositories(api.as_ref())) => {
                listed.map_err(StatsError::UpstreamEnumeration)?
            }
        };
        info!("Collecting {} repositories", repos.len());

        let aggregator = self.collect_all(&api, &repos, period, &cancel).await?;
        let warnings = aggregator.warnings().len();

        let identity = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StatsError::Cancelled),
            identity = bounded(timeout, "/user".to_string(), api.authenticated_user()) => identity,
        };
        let user = self.resolve_identity(identity)?;

        let stats = aggregator.finish(user);
        info!(
            "Aggregated {} repositories for {} in {:.2?} ({} warnings)",
            stats.total_repos,
            stats.user.login,
            started.elapsed(),
            warnings
        );
        Ok(stats)
    }

    fn resolve_identity(
        &self,
        identity: std::result::Result<AuthenticatedUser, ApiError>,
    ) -> Result<UserIdentity> {
        match identity {
            Ok(user) => Ok(UserIdentity {
                login: user.login,
                avatar_url: user.avatar_url,
            }),
            Err(e) if self.config.anonymous_identity_fallback => {
                warn!("Failed to fetch authenticated user, reporting anonymously: {e}");
                Ok(UserIdentity::anonymous())
            }
            Err(e) => Err(StatsError::IdentityFetch(e)),
        }
    }

    /// Fan out one collection task per repository, at most
    /// `max_concurrent_repos` at a time, and merge results as they arrive.
    async fn collect_all<A>(
        &self,
        api: &Arc<A>,
        repos: &[Repository],
        period: ReportPeriod,
        cancel: &CancellationToken,
    ) -> Result<Aggregator>
    where
        A: GithubApi + 'static,
    {
        let workers = self.config.max_concurrent_repos.max(1);
        let permits = Arc::new(Semaphore::new(workers));
        let limits = CallLimits::from(&self.config);
        let (tx, mut rx) = mpsc::channel::<(usize, RepoActivity)>(workers);
        let mut tasks = JoinSet::new();

        for (index, repo) in repos.iter().cloned().enumerate() {
            let api = Arc::clone(api);
            let permits = Arc::clone(&permits);
            let tx = tx.clone();
            let cancel = cancel.child_token();

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    activity = collect_repository(api.as_ref(), &repo, &period, limits) => {
                        let _ = tx.send((index, activity)).await;
                    }
                }
            });
        }
        drop(tx);

        let mut aggregator = Aggregator::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(StatsError::Cancelled);
                }
                received = rx.recv() => match received {
                    Some((index, activity)) => aggregator.merge(index, activity),
                    None => break,
                },
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Repository collection task failed: {e}");
            }
        }

        // A task that panicked never reported; its repository still counts.
        for (index, repo) in repos.iter().enumerate() {
            if !aggregator.contains(index) {
                let mut activity = RepoActivity::empty(repo);
                activity.warnings.push(CollectionWarning::new(
                    &repo.name,
                    Signal::Task,
                    "collection task ended without a result",
                ));
                aggregator.merge(index, activity);
            }
        }

        Ok(aggregator)
    }
}
