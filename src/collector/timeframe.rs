//! Time frames and deterministic chunking
//!
//! A [`TimeFrame`] is a half-open UTC interval `[start, end)` with the
//! invariant `start < end`, enforced at construction. Long frames are split
//! into contiguous, non-overlapping [`Chunk`]s processed strictly in
//! chronological order; splitting is pure and deterministic so an interrupted
//! crawl re-derives the identical chunk list on restart.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::collector::CollectorError;

/// Half-open UTC interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFrame {
    /// Inclusive start of the interval
    pub start: DateTime<Utc>,
    /// Exclusive end of the interval
    pub end: DateTime<Utc>,
}

/// One slice of a chunked [`TimeFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// The slice's own time frame
    pub frame: TimeFrame,
    /// 0-based position in chronological order
    pub index: usize,
}

impl TimeFrame {
    /// Create a frame, rejecting `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CollectorError> {
        if start >= end {
            return Err(CollectorError::InvalidRange(format!(
                "start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Frame covering the last `days_back` days, anchored at now.
    pub fn from_relative(days_back: u32) -> Self {
        let end = Utc::now();
        let start = end - ChronoDuration::days(i64::from(days_back.max(1)));
        Self { start, end }
    }

    /// Parse a frame from string bounds.
    ///
    /// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (interpreted as
    /// UTC midnight).
    pub fn from_strings(start: &str, end: &str) -> Result<Self, CollectorError> {
        Self::new(parse_bound(start)?, parse_bound(end)?)
    }

    /// Length of the interval.
    pub fn duration(&self) -> ChronoDuration {
        self.end - self.start
    }

    /// Split into contiguous chunks of at most `chunk_days` days each.
    ///
    /// Chunks are returned in chronological order; their union is exactly
    /// `[start, end)` with no gaps and no overlap. The final chunk is shorter
    /// when the frame length is not a multiple of `chunk_days`. A
    /// `chunk_days` of zero is treated as one.
    pub fn split_into_chunks(&self, chunk_days: u32) -> Vec<Chunk> {
        let step = ChronoDuration::days(i64::from(chunk_days.max(1)));
        let mut chunks = Vec::new();
        let mut cursor = self.start;

        while cursor < self.end {
            let chunk_end = (cursor + step).min(self.end);
            chunks.push(Chunk {
                frame: TimeFrame {
                    start: cursor,
                    end: chunk_end,
                },
                index: chunks.len(),
            });
            cursor = chunk_end;
        }

        chunks
    }

    /// Whether `ts` falls within `[start, end)`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

fn parse_bound(value: &str) -> Result<DateTime<Utc>, CollectorError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        // NaiveDate always has a midnight
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(CollectorError::InvalidRange(format!(
        "cannot parse '{value}' as RFC 3339 or YYYY-MM-DD"
    )))
}
