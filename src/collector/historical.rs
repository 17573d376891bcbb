//! Historical, time-chunked collection driver
//!
//! Walks a [`TimeFrame`] chunk by chunk in chronological order. For every
//! chunk and subreddit it fetches an oversampled batch of recent posts
//! through the resilient client, filters them down to the chunk span and the
//! configured keywords, deduplicates against everything already collected in
//! the run, and upserts survivors into the sink. A bounded number of stored
//! posts then have their comments collected through the same client.
//!
//! Filtering happens after the fetch, not in the request: the upstream search
//! endpoint's time filtering is unreliable, so candidates are oversampled and
//! trimmed locally.
//!
//! Failures inside the loop never abort the run. Each one becomes an
//! [`ErrorDescriptor`] and the crawl moves on; only cancellation stops it
//! early, and even then everything already stored stays stored.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::cancel::CancelToken;
use crate::client::{ApiError, ResilientClient};
use crate::collector::progress::{CollectionProgress, ProgressSnapshot};
use crate::collector::timeframe::{Chunk, TimeFrame};
use crate::collector::CollectorError;
use crate::fetcher::{ItemFetcher, SortOrder};
use crate::output::ItemSink;
use crate::{RedditComment, RedditPost};

/// Default subreddits to crawl
pub const DEFAULT_SUBREDDITS: &[&str] = &["technology", "politics", "investing", "MachineLearning"];

/// Default keyword filter
pub const DEFAULT_KEYWORDS: &[&str] = &["AI", "interest rates", "EVs", "recession", "inflation"];

/// Tuning knobs for one historical collection run
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Subreddits to crawl each chunk
    pub subreddits: Vec<String>,
    /// Keywords a post or comment must contain (case-insensitive); empty
    /// means collect everything
    pub keywords: Vec<String>,
    /// Target number of posts to keep per subreddit per chunk
    pub posts_per_target: usize,
    /// Comments to fetch per selected post
    pub comments_per_post: usize,
    /// How many stored posts per subreddit per chunk get their comments
    /// collected
    pub comment_posts_limit: usize,
    /// Chunk length in days
    pub chunk_days: u32,
    /// Pause between chunks (skipped after the last one)
    pub inter_chunk_delay: Duration,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            subreddits: DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            posts_per_target: 100,
            comments_per_post: 10,
            comment_posts_limit: 10,
            chunk_days: 7,
            inter_chunk_delay: Duration::from_secs(5),
        }
    }
}

/// One recorded failure from the chunk loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    /// 0-based index of the chunk being processed
    pub chunk: usize,
    /// What was being fetched (subreddit, or `subreddit/post_id` for comments)
    pub target: String,
    /// Error classification (`transient`, `permanent`, `circuit_open`, ...)
    pub kind: String,
    /// Human-readable detail
    pub message: String,
}

/// Outcome of one historical collection run
#[derive(Debug)]
pub struct CollectionResult {
    /// Whether the run is considered useful: no errors, or at least one item
    /// collected despite them. Cancellation always yields `false`.
    pub success: bool,
    /// Posts actually stored (after filtering and deduplication)
    pub posts_collected: u64,
    /// Comments actually stored
    pub comments_collected: u64,
    /// Chunks the loop finished, failed chunks included
    pub chunks_processed: usize,
    /// All recorded failures, in occurrence order
    pub errors: Vec<ErrorDescriptor>,
}

/// Historical, time-chunked crawler
pub struct HistoricalCollector {
    client: ResilientClient,
    fetcher: Arc<dyn ItemFetcher>,
    sink: Arc<dyn ItemSink>,
    config: CollectionConfig,
    progress: Mutex<CollectionProgress>,
    cancel: CancelToken,
}

impl HistoricalCollector {
    /// Create a collector over the given client, fetcher, and sink.
    pub fn new(
        client: ResilientClient,
        fetcher: Arc<dyn ItemFetcher>,
        sink: Arc<dyn ItemSink>,
        config: CollectionConfig,
    ) -> Self {
        Self {
            client,
            fetcher,
            sink,
            config,
            progress: Mutex::new(CollectionProgress::new(0)),
            cancel: CancelToken::new(),
        }
    }

    /// Attach a cancellation token. The same token should also be attached to
    /// the client so backoff sleeps abort with it.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current progress with completion percentage and ETA.
    pub fn progress_summary(&self) -> ProgressSnapshot {
        self.progress_lock().snapshot()
    }

    /// Crawl the frame chunk by chunk.
    ///
    /// Returns `Err` only for configuration-time problems; all failures
    /// during the crawl itself are recorded in the result's `errors`.
    pub async fn collect_historical_data(
        &self,
        frame: &TimeFrame,
    ) -> Result<CollectionResult, CollectorError> {
        let chunks = frame.split_into_chunks(self.config.chunk_days);
        *self.progress_lock() = CollectionProgress::new(chunks.len());

        let span = info_span!(
            "historical_collection",
            start = %frame.start,
            end = %frame.end,
            chunks = chunks.len()
        );
        self.run_chunks(&chunks).instrument(span).await
    }

    async fn run_chunks(&self, chunks: &[Chunk]) -> Result<CollectionResult, CollectorError> {
        info!(
            chunks = chunks.len(),
            subreddits = self.config.subreddits.len(),
            "Starting historical collection"
        );

        let mut errors: Vec<ErrorDescriptor> = Vec::new();
        let mut seen_posts: HashSet<String> = HashSet::new();
        let mut seen_comments: HashSet<String> = HashSet::new();
        let mut posts_collected: u64 = 0;
        let mut comments_collected: u64 = 0;
        let mut chunks_processed = 0;
        let mut cancelled = false;

        for chunk in chunks {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            debug!(
                chunk = chunk.index,
                start = %chunk.frame.start,
                end = %chunk.frame.end,
                "Processing chunk"
            );

            for subreddit in &self.config.subreddits {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }

                match self
                    .collect_chunk_target(chunk, subreddit, &mut seen_posts, &mut seen_comments, &mut errors)
                    .await
                {
                    Ok((posts, comments)) => {
                        posts_collected += posts;
                        comments_collected += comments;
                        let mut progress = self.progress_lock();
                        progress.posts_collected += posts;
                        progress.comments_collected += comments;
                    }
                    Err(ApiError::Cancelled) => {
                        cancelled = true;
                        break;
                    }
                    Err(e) => {
                        warn!(chunk = chunk.index, subreddit = %subreddit, error = %e, "Target failed");
                        errors.push(ErrorDescriptor {
                            chunk: chunk.index,
                            target: subreddit.clone(),
                            kind: e.kind().to_string(),
                            message: e.to_string(),
                        });
                        self.progress_lock().errors_encountered += 1;
                    }
                }
            }

            if cancelled {
                break;
            }

            // Failed chunks count as processed: progress measures work
            // attempted, not work that went well.
            chunks_processed += 1;
            self.progress_lock().chunks_completed += 1;

            let snap = self.progress_summary();
            info!(
                chunk = chunk.index,
                completed = snap.chunks_completed,
                total = snap.chunks_total,
                posts = snap.posts_collected,
                comments = snap.comments_collected,
                eta_secs = snap.eta.as_secs(),
                "Chunk complete"
            );

            let is_last = chunk.index + 1 == chunks.len();
            if !is_last && !self.cancel.sleep(self.config.inter_chunk_delay).await {
                cancelled = true;
                break;
            }
        }

        if cancelled {
            info!("Collection cancelled, preserving stored items");
            errors.push(ErrorDescriptor {
                chunk: chunks_processed,
                target: "collection".to_string(),
                kind: "cancelled".to_string(),
                message: "collection cancelled by request".to_string(),
            });
        }

        let items = posts_collected + comments_collected;
        let success = !cancelled && (errors.is_empty() || items > 0);

        info!(
            success,
            posts = posts_collected,
            comments = comments_collected,
            chunks = chunks_processed,
            errors = errors.len(),
            "Historical collection finished"
        );

        Ok(CollectionResult {
            success,
            posts_collected,
            comments_collected,
            chunks_processed,
            errors,
        })
    }

    /// Collect one subreddit within one chunk. Returns (posts, comments)
    /// stored. Comment-level failures are recorded in `errors` rather than
    /// failing the target; only `ApiError::Cancelled` propagates.
    async fn collect_chunk_target(
        &self,
        chunk: &Chunk,
        subreddit: &str,
        seen_posts: &mut HashSet<String>,
        seen_comments: &mut HashSet<String>,
        errors: &mut Vec<ErrorDescriptor>,
    ) -> Result<(u64, u64), ApiError> {
        // Oversample: time filtering happens locally, so fetch extra
        // candidates to survive the trim.
        let fetch_limit = self.config.posts_per_target * 2;
        let candidates = self
            .client
            .execute(|| {
                self.fetcher
                    .fetch_posts(subreddit, SortOrder::New, chunk.frame, fetch_limit)
            })
            .await?;

        let mut batch: Vec<RedditPost> = Vec::new();
        for post in candidates {
            if batch.len() >= self.config.posts_per_target {
                break;
            }
            if !chunk.frame.contains(post.timestamp) {
                continue;
            }
            if !self.matches_keywords(&post.searchable_text()) {
                continue;
            }
            if !seen_posts.insert(post.id.clone()) {
                continue;
            }
            batch.push(post);
        }

        let stored_posts = match self.sink.upsert_posts(&batch).await {
            Ok(n) => n as u64,
            Err(e) => {
                return Err(ApiError::Permanent(format!("sink rejected posts: {e}")));
            }
        };
        debug!(
            chunk = chunk.index,
            subreddit,
            kept = batch.len(),
            stored = stored_posts,
            "Stored post batch"
        );

        let mut stored_comments: u64 = 0;
        for post in batch.iter().take(self.config.comment_posts_limit) {
            if self.cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }

            let fetched = self
                .client
                .execute(|| self.fetcher.fetch_comments(&post.id, self.config.comments_per_post))
                .await;

            let comments = match fetched {
                Ok(comments) => comments,
                Err(ApiError::Cancelled) => return Err(ApiError::Cancelled),
                Err(e) => {
                    errors.push(ErrorDescriptor {
                        chunk: chunk.index,
                        target: format!("{subreddit}/{}", post.id),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    });
                    self.progress_lock().errors_encountered += 1;
                    continue;
                }
            };

            let batch: Vec<RedditComment> = comments
                .into_iter()
                .filter(|c| self.matches_keywords(&c.content))
                .filter(|c| seen_comments.insert(c.id.clone()))
                .collect();

            match self.sink.upsert_comments(&batch).await {
                Ok(n) => stored_comments += n as u64,
                Err(e) => {
                    errors.push(ErrorDescriptor {
                        chunk: chunk.index,
                        target: format!("{subreddit}/{}", post.id),
                        kind: "permanent".to_string(),
                        message: format!("sink rejected comments: {e}"),
                    });
                    self.progress_lock().errors_encountered += 1;
                }
            }
        }

        Ok((stored_posts, stored_comments))
    }

    fn matches_keywords(&self, text: &str) -> bool {
        if self.config.keywords.is_empty() {
            return true;
        }
        let haystack = text.to_lowercase();
        self.config
            .keywords
            .iter()
            .any(|kw| haystack.contains(&kw.to_lowercase()))
    }

    fn progress_lock(&self) -> MutexGuard<'_, CollectionProgress> {
        self.progress.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
