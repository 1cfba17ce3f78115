use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single upstream GitHub call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error calling GitHub: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitHub API returned HTTP {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// GitHub kept answering 202 while it computes repository statistics.
    #[error("statistics for {endpoint} are still being computed")]
    Pending { endpoint: String },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
}

/// Fatal failures of an aggregation run.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("no access token provided")]
    MissingCredential,

    #[error("failed to list repositories: {0}")]
    UpstreamEnumeration(#[source] ApiError),

    #[error("failed to fetch authenticated user: {0}")]
    IdentityFetch(#[source] ApiError),

    #[error("failed to build GitHub client: {0}")]
    Client(#[source] ApiError),

    #[error("aggregation cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;
