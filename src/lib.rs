//! # Reddit Data Collector Library
//!
//! A resilient collection engine for gathering historical Reddit posts and
//! comments under a strict, externally-imposed rate limit. Designed for
//! long-running crawls over arbitrary date ranges that must survive transient
//! upstream failures without losing already-collected data or exceeding the
//! provider's quota.
//!
//! ## Features
//!
//! - **Sliding-Window Rate Limiting**: 600 requests per 10 minutes by default,
//!   with a mandatory inter-request delay to avoid abusive bursts
//! - **Circuit Breaker**: sheds load during upstream outages instead of
//!   hammering a failing API
//! - **Exponential-Backoff Retry**: transient errors are retried, permanent
//!   errors surface immediately
//! - **Time-Chunked Crawling**: arbitrary date ranges are split into
//!   deterministic chunks processed strictly in chronological order
//! - **Progress Tracking**: per-chunk progress with ETA estimation
//! - **Graceful Cancellation**: Ctrl+C stops the crawl without rolling back
//!   anything already stored
//!
//! ## Quick Start
//!
//! ```no_run
//! use reddit_data_collector::client::{ClientConfig, ResilientClient};
//! use reddit_data_collector::collector::{CollectionConfig, HistoricalCollector, TimeFrame};
//! use reddit_data_collector::fetcher::RedditFetcher;
//! use reddit_data_collector::output::MemorySink;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ResilientClient::new(ClientConfig::default());
//! let fetcher = Arc::new(RedditFetcher::new("my-user-agent/0.1")?);
//! let sink = Arc::new(MemorySink::new());
//!
//! let collector =
//!     HistoricalCollector::new(client, fetcher, sink, CollectionConfig::default());
//! let frame = TimeFrame::from_relative(30);
//! let result = collector.collect_historical_data(&frame).await?;
//! println!("collected {} posts", result.posts_collected);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - Rate limiter, circuit breaker, and the resilient call wrapper
//! - [`collector`] - Time frames, chunking, and the historical crawl driver
//! - [`fetcher`] - Fetch capability trait and the Reddit JSON API implementation
//! - [`output`] - Duplicate-safe storage sinks (in-memory, CSV)
//! - [`metrics`] - API usage counters and Prometheus export
//! - [`cancel`] - Cooperative cancellation token

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cooperative cancellation token
pub mod cancel;

/// CLI command implementations
pub mod cli;

/// Resilient API client: rate limiting, circuit breaker, retry
pub mod client;

/// Historical collection: time frames, chunking, crawl driver
pub mod collector;

/// Fetch capability trait and Reddit implementation
pub mod fetcher;

/// API usage metrics
pub mod metrics;

/// Storage sinks
pub mod output;

/// A collected Reddit post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedditPost {
    /// Reddit base-36 post id (without the `t3_` prefix)
    pub id: String,
    /// Post title
    pub title: String,
    /// Self-text body (empty for link posts)
    pub content: String,
    /// Net upvote score at collection time
    pub upvotes: i64,
    /// Creation time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Subreddit name (without `r/`)
    pub subreddit: String,
    /// Author username, or `[deleted]`
    pub author: String,
    /// Combined link + comment karma of the author, 0 if unavailable
    pub author_karma: i64,
    /// Target URL (external link or permalink)
    pub url: String,
    /// Comment count at collection time
    pub num_comments: u64,
}

impl RedditPost {
    /// Validate post data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Post id cannot be empty".to_string());
        }
        if self.subreddit.is_empty() {
            return Err("Subreddit cannot be empty".to_string());
        }
        Ok(())
    }

    /// Title and body joined for keyword matching
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// A collected Reddit comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedditComment {
    /// Reddit base-36 comment id (without the `t1_` prefix)
    pub id: String,
    /// Fullname of the direct parent (`t3_...` for top-level, `t1_...` otherwise)
    pub parent_id: String,
    /// Comment body
    pub content: String,
    /// Net upvote score at collection time
    pub upvotes: i64,
    /// Creation time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Subreddit name (without `r/`)
    pub subreddit: String,
    /// Author username, or `[deleted]`
    pub author: String,
    /// Combined link + comment karma of the author, 0 if unavailable
    pub author_karma: i64,
    /// Base-36 id of the post the comment belongs to
    pub post_id: String,
}

impl RedditComment {
    /// Validate comment data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Comment id cannot be empty".to_string());
        }
        if self.post_id.is_empty() {
            return Err("Post id cannot be empty".to_string());
        }
        Ok(())
    }
}
