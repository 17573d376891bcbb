//! Collection progress tracking and ETA estimation

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Mutable progress state for one collection run.
///
/// Owned and mutated only by the collector; readers get a
/// [`ProgressSnapshot`].
#[derive(Debug)]
pub struct CollectionProgress {
    /// Number of chunks the run will process
    pub chunks_total: usize,
    /// Chunks finished so far, including chunks that failed
    pub chunks_completed: usize,
    /// Posts stored so far
    pub posts_collected: u64,
    /// Comments stored so far
    pub comments_collected: u64,
    /// Failures recorded so far
    pub errors_encountered: u64,
    /// When the run started
    pub started_at: Instant,
}

/// Read-only view of a [`CollectionProgress`] with derived fields
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressSnapshot {
    /// Number of chunks the run will process
    pub chunks_total: usize,
    /// Chunks finished so far
    pub chunks_completed: usize,
    /// Posts stored so far
    pub posts_collected: u64,
    /// Comments stored so far
    pub comments_collected: u64,
    /// Failures recorded so far
    pub errors_encountered: u64,
    /// Completion percentage in `[0, 100]`
    pub completion_pct: f64,
    /// Time since the run started
    #[serde(skip)]
    pub elapsed: Duration,
    /// Estimated time remaining, extrapolated from chunk throughput
    #[serde(skip)]
    pub eta: Duration,
}

impl CollectionProgress {
    /// Fresh progress for a run over `chunks_total` chunks.
    pub fn new(chunks_total: usize) -> Self {
        Self {
            chunks_total,
            chunks_completed: 0,
            posts_collected: 0,
            comments_collected: 0,
            errors_encountered: 0,
            started_at: Instant::now(),
        }
    }

    /// Current snapshot with completion percentage and ETA.
    ///
    /// ETA is `elapsed * remaining / max(completed, 1)`: before the first
    /// chunk completes it optimistically assumes one elapsed-so-far per
    /// remaining chunk.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let elapsed = self.started_at.elapsed();
        let remaining = self.chunks_total.saturating_sub(self.chunks_completed);
        let divisor = self.chunks_completed.max(1) as u32;
        let eta = elapsed * remaining as u32 / divisor;

        let completion_pct = if self.chunks_total == 0 {
            100.0
        } else {
            self.chunks_completed as f64 / self.chunks_total as f64 * 100.0
        };

        ProgressSnapshot {
            chunks_total: self.chunks_total,
            chunks_completed: self.chunks_completed,
            posts_collected: self.posts_collected,
            comments_collected: self.comments_collected,
            errors_encountered: self.errors_encountered,
            completion_pct,
            elapsed,
            eta,
        }
    }
}
