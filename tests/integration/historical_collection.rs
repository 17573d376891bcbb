//! End-to-end tests for historical collection over mock upstreams

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use reddit_data_collector::cancel::CancelToken;
use reddit_data_collector::client::{ApiError, ClientConfig, ResilientClient, RetryPolicy};
use reddit_data_collector::collector::{CollectionConfig, HistoricalCollector, TimeFrame};
use reddit_data_collector::fetcher::{ItemFetcher, SortOrder};
use reddit_data_collector::output::{CsvSink, MemorySink};
use reddit_data_collector::{RedditComment, RedditPost};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// One matching post per chunk span, two comments per post. Post fetches for
/// spans starting on a day listed in `fail_on_days` fail transiently.
struct ChunkedFetcher {
    fail_on_days: Vec<u32>,
    cancel_on_call: Option<(u32, CancelToken)>,
    calls: std::sync::atomic::AtomicU32,
}

impl ChunkedFetcher {
    fn new(fail_on_days: Vec<u32>) -> Self {
        Self {
            fail_on_days,
            cancel_on_call: None,
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ItemFetcher for ChunkedFetcher {
    async fn fetch_posts(
        &self,
        subreddit: &str,
        _sort: SortOrder,
        span: TimeFrame,
        _limit: usize,
    ) -> Result<Vec<RedditPost>, ApiError> {
        let call = self
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some((at, token)) = &self.cancel_on_call {
            if call + 1 >= *at {
                token.cancel();
            }
        }

        use chrono::Datelike;
        if self.fail_on_days.contains(&span.start.day()) {
            return Err(ApiError::Transient("upstream 503".into()));
        }

        Ok(vec![RedditPost {
            id: format!("post-{}", span.start.day()),
            title: "inflation watch".to_string(),
            content: String::new(),
            upvotes: 10,
            timestamp: span.start + ChronoDuration::hours(1),
            subreddit: subreddit.to_string(),
            author: "author".to_string(),
            author_karma: 0,
            url: String::new(),
            num_comments: 2,
        }])
    }

    async fn fetch_comments(
        &self,
        post_id: &str,
        _limit: usize,
    ) -> Result<Vec<RedditComment>, ApiError> {
        Ok((0..2)
            .map(|i| RedditComment {
                id: format!("{post_id}-c{i}"),
                parent_id: format!("t3_{post_id}"),
                content: "inflation is sticky".to_string(),
                upvotes: 1,
                timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, 0).unwrap(),
                subreddit: "investing".to_string(),
                author: "commenter".to_string(),
                author_karma: 0,
                post_id: post_id.to_string(),
            })
            .collect())
    }
}

fn ten_day_frame() -> TimeFrame {
    TimeFrame::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 6, 11, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

fn config() -> CollectionConfig {
    CollectionConfig {
        subreddits: vec!["investing".to_string()],
        keywords: vec!["inflation".to_string()],
        chunk_days: 3,
        inter_chunk_delay: Duration::from_secs(5),
        ..CollectionConfig::default()
    }
}

fn client(max_retries: u32) -> ResilientClient {
    ResilientClient::new(ClientConfig {
        base_delay: Duration::ZERO,
        retry: RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        },
        ..ClientConfig::default()
    })
}

#[tokio::test(start_paused = true)]
async fn test_failed_chunk_is_recorded_and_the_crawl_continues() {
    // Second chunk spans June 4-7; its post fetch always fails
    let fetcher = Arc::new(ChunkedFetcher::new(vec![4]));
    let sink = Arc::new(MemorySink::new());
    let collector = HistoricalCollector::new(client(1), fetcher, sink.clone(), config());

    let result = collector
        .collect_historical_data(&ten_day_frame())
        .await
        .unwrap();

    assert_eq!(result.chunks_processed, 4);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].chunk, 1);
    assert_eq!(result.errors[0].target, "investing");
    assert_eq!(result.errors[0].kind, "transient");

    // Three healthy chunks delivered their items, so the run still counts
    assert!(result.success);
    assert_eq!(result.posts_collected, 3);
    assert_eq!(result.comments_collected, 6);
    assert_eq!(sink.post_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_clean_run_collects_every_chunk() {
    let fetcher = Arc::new(ChunkedFetcher::new(Vec::new()));
    let sink = Arc::new(MemorySink::new());
    let collector = HistoricalCollector::new(client(1), fetcher, sink.clone(), config());

    let result = collector
        .collect_historical_data(&ten_day_frame())
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.errors.is_empty());
    assert_eq!(result.chunks_processed, 4);
    assert_eq!(result.posts_collected, 4);
    assert_eq!(result.comments_collected, 8);

    let snap = collector.progress_summary();
    assert_eq!(snap.chunks_completed, 4);
    assert!((snap.completion_pct - 100.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_rerun_against_the_same_csv_directory_stores_nothing_new() {
    let dir = TempDir::new().unwrap();

    let first = HistoricalCollector::new(
        client(1),
        Arc::new(ChunkedFetcher::new(Vec::new())),
        Arc::new(CsvSink::open(dir.path()).unwrap()),
        config(),
    );
    let result = first.collect_historical_data(&ten_day_frame()).await.unwrap();
    assert_eq!(result.posts_collected, 4);

    // Fresh collector, fresh sink instance, same directory
    let second = HistoricalCollector::new(
        client(1),
        Arc::new(ChunkedFetcher::new(Vec::new())),
        Arc::new(CsvSink::open(dir.path()).unwrap()),
        config(),
    );
    let result = second.collect_historical_data(&ten_day_frame()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.posts_collected, 0);
    assert_eq!(result.comments_collected, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_the_crawl_and_keeps_stored_items() {
    let cancel = CancelToken::new();
    let mut fetcher = ChunkedFetcher::new(Vec::new());
    // Cancel as soon as the second chunk's fetch begins
    fetcher.cancel_on_call = Some((2, cancel.clone()));

    let sink = Arc::new(MemorySink::new());
    let collector =
        HistoricalCollector::new(client(1), Arc::new(fetcher), sink.clone(), config())
            .with_cancel(cancel);

    let result = collector
        .collect_historical_data(&ten_day_frame())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.errors.last().unwrap().kind, "cancelled");
    // Only the first chunk ran to completion
    assert_eq!(result.chunks_processed, 1);
    assert_eq!(result.posts_collected, 1);
    // Everything stored before the cancellation is preserved: the first
    // chunk's post and comments, plus the second chunk's post, which was
    // upserted before the cancel check stopped its comment collection
    assert_eq!(sink.post_count(), 2);
    assert_eq!(sink.comment_count(), 2);
}
