//! Collect command implementation

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::client::{ClientConfig, ResilientClient};
use crate::collector::{CollectionConfig, HistoricalCollector, TimeFrame};
use crate::fetcher::RedditFetcher;
use crate::metrics::init_metrics;
use crate::output::CsvSink;

use super::CliError;

const DEFAULT_DAYS_BACK: u32 = 30;

/// Resilient historical Reddit collection
#[derive(Debug, Parser)]
#[command(name = "reddit-data-collector", version, about)]
pub struct Cli {
    /// Maximum retry attempts for transient API failures
    #[arg(long, global = true, default_value_t = 5)]
    pub max_retries: u32,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Collect historical posts and comments over a date range
    Collect(CollectArgs),
}

/// Arguments for the collect command
#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Collect the last N days (mutually exclusive with --start/--end)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub days_back: Option<u32>,

    /// Range start, RFC 3339 or YYYY-MM-DD
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Range end, RFC 3339 or YYYY-MM-DD
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// Subreddits to crawl (comma-separated; built-in list when omitted)
    #[arg(long, value_delimiter = ',')]
    pub subreddits: Vec<String>,

    /// Keywords to filter by (comma-separated; built-in list when omitted)
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Chunk length in days
    #[arg(long, default_value_t = 7)]
    pub chunk_days: u32,

    /// Posts to keep per subreddit per chunk
    #[arg(long, default_value_t = 100)]
    pub limit: usize,

    /// Comments to fetch per selected post
    #[arg(long, default_value_t = 10)]
    pub comments_per_post: usize,

    /// Output directory for posts.csv / comments.csv
    #[arg(long, default_value = "./data")]
    pub output: PathBuf,

    /// Pause between chunks, in seconds
    #[arg(long, default_value_t = 5)]
    pub chunk_delay_secs: u64,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// User agent sent to the Reddit API
    #[arg(long, default_value = "reddit-data-collector/0.1")]
    pub user_agent: String,
}

impl CollectArgs {
    fn time_frame(&self) -> Result<TimeFrame, CliError> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => TimeFrame::from_strings(start, end)
                .map_err(|e| CliError::InvalidArgument(e.to_string())),
            _ => Ok(TimeFrame::from_relative(
                self.days_back.unwrap_or(DEFAULT_DAYS_BACK),
            )),
        }
    }

    fn collection_config(&self) -> CollectionConfig {
        let mut config = CollectionConfig {
            posts_per_target: self.limit,
            comments_per_post: self.comments_per_post,
            chunk_days: self.chunk_days,
            inter_chunk_delay: Duration::from_secs(self.chunk_delay_secs),
            ..CollectionConfig::default()
        };
        if !self.subreddits.is_empty() {
            config.subreddits = self.subreddits.clone();
        }
        if !self.keywords.is_empty() {
            config.keywords = self.keywords.clone();
        }
        config
    }

    /// Run the collection end to end.
    pub async fn execute(&self, cli: &Cli, cancel: CancelToken) -> Result<(), CliError> {
        let frame = self.time_frame()?;

        if let Some(addr) = self.metrics_addr {
            init_metrics(addr)
                .await
                .map_err(|e| CliError::Metrics(e.to_string()))?;
        }

        let mut client_config = ClientConfig::historical();
        client_config.retry.max_retries = cli.max_retries;
        let client = ResilientClient::new(client_config).with_cancel(cancel.clone());
        let metrics = client.metrics();

        let fetcher = RedditFetcher::new(&self.user_agent)
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
        let sink = CsvSink::open(&self.output).map_err(|e| CliError::Output(e.to_string()))?;

        let collector = HistoricalCollector::new(
            client,
            Arc::new(fetcher),
            Arc::new(sink),
            self.collection_config(),
        )
        .with_cancel(cancel);

        info!(
            start = %frame.start,
            end = %frame.end,
            output = %self.output.display(),
            "Starting collection"
        );

        let result = collector
            .collect_historical_data(&frame)
            .await
            .map_err(|e| CliError::Collection(e.to_string()))?;

        let usage = metrics.snapshot();
        info!(
            posts = result.posts_collected,
            comments = result.comments_collected,
            chunks = result.chunks_processed,
            errors = result.errors.len(),
            requests = usage.requests_made,
            failed_requests = usage.requests_failed,
            rate_limit_hits = usage.rate_limit_hits,
            breaker_trips = usage.circuit_breaker_trips,
            "Collection finished"
        );

        for error in &result.errors {
            warn!(
                chunk = error.chunk,
                target = %error.target,
                kind = %error.kind,
                "{}", error.message
            );
        }

        if !result.success {
            return Err(CliError::Collection(format!(
                "{} errors, {} items collected",
                result.errors.len(),
                result.posts_collected + result.comments_collected
            )));
        }
        Ok(())
    }
}
