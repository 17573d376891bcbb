//! Fetch capability trait and the Reddit JSON API implementation

pub mod reddit_http;

pub use reddit_http::RedditFetcher;

use async_trait::async_trait;

use crate::client::ApiError;
use crate::collector::TimeFrame;
use crate::{RedditComment, RedditPost};

/// Listing sort order understood by the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest first
    New,
    /// Highest score first
    Top,
    /// Front-page ranking
    Hot,
}

impl SortOrder {
    /// Path segment used by the listing endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::New => "new",
            SortOrder::Top => "top",
            SortOrder::Hot => "hot",
        }
    }
}

/// Capability to fetch raw candidate items from the upstream API.
///
/// Implementations perform one upstream request per call and classify
/// failures into [`ApiError::Transient`] / [`ApiError::Permanent`]; resilience
/// (rate limiting, breaker, retry) is layered on top by the caller. The span
/// passed to `fetch_posts` is advisory: returned posts are unfiltered
/// candidates and the caller trims them to the span it actually wants.
#[async_trait]
pub trait ItemFetcher: Send + Sync {
    /// Fetch up to `limit` posts from a subreddit listing.
    async fn fetch_posts(
        &self,
        subreddit: &str,
        sort: SortOrder,
        span: TimeFrame,
        limit: usize,
    ) -> Result<Vec<RedditPost>, ApiError>;

    /// Fetch up to `limit` comments for a post.
    async fn fetch_comments(
        &self,
        post_id: &str,
        limit: usize,
    ) -> Result<Vec<RedditComment>, ApiError>;
}
