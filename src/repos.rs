use crate::error::ApiError;
use crate::github::{GithubApi, Repository};
use log::debug;

/// Repositories owned by the authenticated user, forks removed, in the order
/// GitHub returned them (most recently pushed first).
pub async fn owned_repositories<A>(api: &A) -> Result<Vec<Repository>, ApiError>
where
    A: GithubApi + ?Sized,
{
    let listed = api.owned_repositories().await?;
    let total = listed.len();

    let repos: Vec<Repository> = listed.into_iter().filter(|r| !r.fork).collect();
    debug!(
        "Listed {total} owned repositories, {} after dropping forks",
        repos.len()
    );

    Ok(repos)
}
