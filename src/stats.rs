use serde::{Deserialize, Serialize};

/// Yearly activity summary handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_commits: u64,
    pub total_comments: u64,
    pub total_reviews: u64,
    pub total_repos: u64,
    pub active_days: u64,
    /// Seven entries, Monday first.
    pub contributions_by_day: Vec<DayCount>,
    /// Commits, Comments, Reviews, in that order.
    pub contributions_by_type: Vec<TypeCount>,
    /// Sorted by percentage, highest first.
    pub languages: Vec<LanguageShare>,
    /// Sorted by commits, highest first.
    pub repos: Vec<RepositoryStat>,
    pub user: UserIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStat {
    pub name: String,
    pub commits: u64,
    pub stars: u64,
    pub url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub comments: u64,
    pub reviews: u64,
    pub contributions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub day: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributionType {
    Commits,
    Comments,
    Reviews,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: ContributionType,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub login: String,
    pub avatar_url: String,
}

impl UserIdentity {
    pub fn anonymous() -> Self {
        Self {
            login: "anonymous".to_string(),
            avatar_url: String::new(),
        }
    }
}
