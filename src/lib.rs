//! Yearly GitHub activity statistics.
//!
//! [`StatsEngine::aggregate`] takes an access token and a [`ReportPeriod`] and
//! returns a [`Stats`] summary: commits, comments, reviews, active days, a
//! weekday histogram, the language mix and the user's top repositories.

pub mod aggregator;
pub mod calendar;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod github;
pub mod logging;
pub mod repos;
pub mod stats;

pub use calendar::ReportPeriod;
pub use config::EngineConfig;
pub use engine::StatsEngine;
pub use error::{ApiError, ConfigError, Result, StatsError};
pub use github::{GithubApi, GithubClient};
pub use stats::Stats;
