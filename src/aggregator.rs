use crate::calendar::{DailyBucket, weekday_name};
use crate::collector::{CollectionWarning, RepoActivity};
use crate::stats::{
    ContributionType, DayCount, LanguageShare, RepositoryStat, Stats, TypeCount, UserIdentity,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Accumulates per-repository results for a single run. Merge order does not
/// affect the finished [`Stats`].
#[derive(Debug, Default)]
pub struct Aggregator {
    /// Keyed by enumeration index so ties sort the same way on every run.
    repos: BTreeMap<usize, RepositoryStat>,
    total_commits: u64,
    total_comments: u64,
    total_reviews: u64,
    by_day: DailyBucket,
    active_days: BTreeSet<NaiveDate>,
    warnings: Vec<CollectionWarning>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the activity of the repository listed at position `index`. A
    /// second merge for the same index is ignored.
    pub fn merge(&mut self, index: usize, activity: RepoActivity) {
        if self.repos.contains_key(&index) {
            return;
        }

        let RepoActivity {
            stat,
            commits_by_day,
            comments_by_day,
            reviews_by_day,
            active_days,
            warnings,
        } = activity;

        self.total_commits = self.total_commits.saturating_add(stat.commits);
        self.total_comments = self.total_comments.saturating_add(stat.comments);
        self.total_reviews = self.total_reviews.saturating_add(stat.reviews);

        self.by_day.merge(&commits_by_day);
        self.by_day.merge(&comments_by_day);
        self.by_day.merge(&reviews_by_day);

        self.active_days.extend(active_days);
        self.warnings.extend(warnings);
        self.repos.insert(index, stat);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.repos.contains_key(&index)
    }

    pub fn warnings(&self) -> &[CollectionWarning] {
        &self.warnings
    }

    pub fn finish(self, user: UserIdentity) -> Stats {
        let languages = language_shares(self.repos.values());

        // BTreeMap iteration is enumeration order; the stable sort keeps it on ties.
        let mut repos: Vec<RepositoryStat> = self.repos.into_values().collect();
        repos.sort_by(|a, b| b.commits.cmp(&a.commits));

        let contributions_by_day = self
            .by_day
            .iter()
            .map(|(day, count)| DayCount {
                day: weekday_name(day).to_string(),
                count,
            })
            .collect();

        let contributions_by_type = vec![
            TypeCount {
                kind: ContributionType::Commits,
                count: self.total_commits,
            },
            TypeCount {
                kind: ContributionType::Comments,
                count: self.total_comments,
            },
            TypeCount {
                kind: ContributionType::Reviews,
                count: self.total_reviews,
            },
        ];

        Stats {
            total_commits: self.total_commits,
            total_comments: self.total_comments,
            total_reviews: self.total_reviews,
            total_repos: repos.len() as u64,
            active_days: self.active_days.len() as u64,
            contributions_by_day,
            contributions_by_type,
            languages,
            repos,
            user,
        }
    }
}

/// Share of commits per primary language. Repositories without a language and
/// languages without commits are left out.
fn language_shares<'a>(repos: impl Iterator<Item = &'a RepositoryStat>) -> Vec<LanguageShare> {
    let mut commits_by_language: BTreeMap<&str, u64> = BTreeMap::new();
    for repo in repos {
        if let Some(language) = repo.language.as_deref() {
            *commits_by_language.entry(language).or_default() += repo.commits;
        }
    }

    let total: u64 = commits_by_language.values().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut shares: Vec<LanguageShare> = commits_by_language
        .into_iter()
        .filter(|(_, commits)| *commits > 0)
        .map(|(name, commits)| LanguageShare {
            name: name.to_string(),
            percentage: commits as f64 / total as f64 * 100.0,
        })
        .collect();

    // Names are already ascending; the stable sort keeps that order on ties.
    shares.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    shares
}
