use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use clap::Parser;
use gitwrapped::{EngineConfig, ReportPeriod, StatsEngine, logging};
use std::fs;
use std::path::PathBuf;

/// Summarize a GitHub user's activity for one year as JSON.
#[derive(Debug, Parser)]
#[command(name = "gitwrapped", version, about)]
struct Args {
    /// GitHub access token
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Year to report on (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Repositories collected at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(logging::level_for(args.verbose, args.quiet))
        .context("Failed to initialize logging")?;

    let mut config =
        EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(concurrency) = args.concurrency {
        config.max_concurrent_repos = concurrency;
        config.validate()?;
    }

    let period = match args.year {
        Some(year) if year != Utc::now().year() => {
            ReportPeriod::for_year(year).with_context(|| format!("Invalid year: {year}"))?
        }
        _ => ReportPeriod::current(),
    };

    let engine = StatsEngine::new(config);
    let stats = engine
        .aggregate(args.token.as_deref(), period)
        .await
        .context("Failed to aggregate GitHub statistics")?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&stats)?
    } else {
        serde_json::to_string(&stats)?
    };

    match args.output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote statistics to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
