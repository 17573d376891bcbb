//! Duplicate-safe storage sinks

pub mod csv;

pub use self::csv::CsvSink;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::{RedditComment, RedditPost};

/// Storage sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(String),
    /// Record could not be encoded
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Idempotent storage for collected items.
///
/// `upsert_*` returns the number of items actually stored; re-submitting an
/// id that is already present stores nothing and is not an error. This is
/// what lets the collector re-process a chunk after a partial failure without
/// duplicating data.
#[async_trait]
pub trait ItemSink: Send + Sync {
    /// Store posts not seen before, returning how many were stored.
    async fn upsert_posts(&self, posts: &[RedditPost]) -> Result<usize, SinkError>;

    /// Store comments not seen before, returning how many were stored.
    async fn upsert_comments(&self, comments: &[RedditComment]) -> Result<usize, SinkError>;
}

/// In-memory sink for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySink {
    posts: Mutex<HashMap<String, RedditPost>>,
    comments: Mutex<HashMap<String, RedditComment>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct posts stored.
    pub fn post_count(&self) -> usize {
        self.lock_posts().len()
    }

    /// Number of distinct comments stored.
    pub fn comment_count(&self) -> usize {
        self.lock_comments().len()
    }

    /// Copy of all stored posts, in no particular order.
    pub fn posts(&self) -> Vec<RedditPost> {
        self.lock_posts().values().cloned().collect()
    }

    /// Copy of all stored comments, in no particular order.
    pub fn comments(&self) -> Vec<RedditComment> {
        self.lock_comments().values().cloned().collect()
    }

    fn lock_posts(&self) -> std::sync::MutexGuard<'_, HashMap<String, RedditPost>> {
        self.posts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_comments(&self) -> std::sync::MutexGuard<'_, HashMap<String, RedditComment>> {
        self.comments.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ItemSink for MemorySink {
    async fn upsert_posts(&self, posts: &[RedditPost]) -> Result<usize, SinkError> {
        let mut stored = self.lock_posts();
        let before = stored.len();
        for post in posts {
            stored.entry(post.id.clone()).or_insert_with(|| post.clone());
        }
        Ok(stored.len() - before)
    }

    async fn upsert_comments(&self, comments: &[RedditComment]) -> Result<usize, SinkError> {
        let mut stored = self.lock_comments();
        let before = stored.len();
        for comment in comments {
            stored
                .entry(comment.id.clone())
                .or_insert_with(|| comment.clone());
        }
        Ok(stored.len() - before)
    }
}
