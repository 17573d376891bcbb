//! CLI error types

/// Errors surfaced to the CLI user
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Argument combination or value rejected
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Collection could not start or ended unsuccessfully
    #[error("collection failed: {0}")]
    Collection(String),

    /// Output sink could not be prepared
    #[error("output error: {0}")]
    Output(String),

    /// Metrics exporter could not be installed
    #[error("metrics error: {0}")]
    Metrics(String),
}
