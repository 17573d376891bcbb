//! Historical collection: time frames, chunking, and the crawl driver

pub mod historical;
pub mod progress;
pub mod timeframe;

pub use historical::{CollectionConfig, CollectionResult, ErrorDescriptor, HistoricalCollector};
pub use progress::{CollectionProgress, ProgressSnapshot};
pub use timeframe::{Chunk, TimeFrame};

/// Configuration-time collection errors.
///
/// These abort a run before any chunk work starts; failures inside the chunk
/// loop are recorded as [`ErrorDescriptor`]s instead and never surface here.
/// Sink preparation failures are not represented: sinks are opened by the
/// caller, which reports [`crate::output::SinkError`] through its own error
/// type.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Time frame rejected (start not before end, or unparseable bounds)
    #[error("invalid time range: {0}")]
    InvalidRange(String),
}
