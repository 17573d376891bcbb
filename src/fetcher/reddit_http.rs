//! Reddit public JSON API fetcher
//!
//! One upstream request per call against `https://www.reddit.com`:
//! `/r/<subreddit>/<sort>.json` for post listings and
//! `/comments/<post_id>.json` for comment trees. No OAuth; the public JSON
//! endpoints only require a descriptive user agent.
//!
//! Failure classification (resilience is layered above, this module only
//! labels):
//! - timeout / connect errors, HTTP 429 and 5xx: [`ApiError::Transient`]
//! - other 4xx and malformed response bodies: [`ApiError::Permanent`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::client::ApiError;
use crate::collector::TimeFrame;
use crate::fetcher::{ItemFetcher, SortOrder};
use crate::{RedditComment, RedditPost};

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetcher against Reddit's public JSON endpoints
pub struct RedditFetcher {
    client: Client,
    base_url: String,
}

impl RedditFetcher {
    /// Create a fetcher with the given user agent.
    pub fn new(user_agent: &str) -> Result<Self, ApiError> {
        Self::with_base_url(user_agent, DEFAULT_BASE_URL)
    }

    /// Create a fetcher against an alternate base URL (test servers).
    pub fn with_base_url(user_agent: &str, base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Permanent(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T>(&self, url: &str, params: &[(&str, String)]) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(ApiError::Transient(format!("upstream returned {status}")));
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Permanent(format!(
                "upstream returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Permanent(format!("malformed response body: {e}")))
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        ApiError::Transient(e.to_string())
    } else {
        ApiError::Permanent(e.to_string())
    }
}

#[async_trait]
impl ItemFetcher for RedditFetcher {
    async fn fetch_posts(
        &self,
        subreddit: &str,
        sort: SortOrder,
        _span: TimeFrame,
        limit: usize,
    ) -> Result<Vec<RedditPost>, ApiError> {
        let url = format!("{}/r/{}/{}.json", self.base_url, subreddit, sort.as_str());
        // Reddit caps listing pages at 100 items
        let page_limit = limit.min(100);
        let params = [("limit", page_limit.to_string()), ("raw_json", "1".to_string())];

        let listing: Listing<PostData> = self.get_json(&url, &params).await?;
        let posts: Vec<RedditPost> = listing
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == "t3")
            .map(|child| child.data.into_post())
            .collect();

        debug!(subreddit, count = posts.len(), "Fetched post listing");
        Ok(posts)
    }

    async fn fetch_comments(
        &self,
        post_id: &str,
        limit: usize,
    ) -> Result<Vec<RedditComment>, ApiError> {
        let url = format!("{}/comments/{}.json", self.base_url, post_id);
        let params = [
            ("limit", limit.to_string()),
            ("depth", "1".to_string()),
            ("raw_json", "1".to_string()),
        ];

        // The endpoint returns [post listing, comment listing]
        let listings: Vec<Listing<CommentData>> = self.get_json(&url, &params).await?;
        let comments: Vec<RedditComment> = listings
            .into_iter()
            .nth(1)
            .map(|listing| listing.data.children)
            .unwrap_or_default()
            .into_iter()
            // "more" stubs share the listing with real comments
            .filter(|child| child.kind == "t1")
            .map(|child| child.data.into_comment(post_id))
            .take(limit)
            .collect();

        debug!(post_id, count = comments.len(), "Fetched comments");
        Ok(comments)
    }
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    // An explicit default fn keeps the derive from demanding T: Default
    #[serde(default = "Vec::new")]
    children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    num_comments: u64,
}

impl PostData {
    fn into_post(self) -> RedditPost {
        RedditPost {
            id: self.id,
            title: self.title,
            content: self.selftext,
            upvotes: self.score,
            timestamp: epoch_to_utc(self.created_utc),
            subreddit: self.subreddit,
            author: self.author,
            // Karma is not part of listing payloads; a separate per-author
            // lookup is not worth one request per post.
            author_karma: 0,
            url: self.url,
            num_comments: self.num_comments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    parent_id: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    author: String,
}

impl CommentData {
    fn into_comment(self, post_id: &str) -> RedditComment {
        RedditComment {
            id: self.id,
            parent_id: self.parent_id,
            content: self.body,
            upvotes: self.score,
            timestamp: epoch_to_utc(self.created_utc),
            subreddit: self.subreddit,
            author: self.author,
            author_karma: 0,
            post_id: post_id.to_string(),
        }
    }
}

fn epoch_to_utc(epoch: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch as i64, 0).unwrap_or_else(Utc::now)
}
