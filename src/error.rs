use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for page statistics operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while configuring or running the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid pipeline or statistics configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An input file is missing or cannot be opened
    #[error("Cannot read input '{}': {}", .path.display(), .source)]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The work queue was closed while a producer was still pushing
    #[error("Work queue was closed")]
    QueueClosed,

    /// A page carries a year outside of the configured histogram range
    #[error("Year {year} is outside of the tracked range {first}..={last}")]
    YearOutOfRange { year: i32, first: i32, last: i32 },

    /// A worker thread could not be spawned or panicked
    #[error("Thread error: {0}")]
    Thread(String),

    /// Any other I/O failure (report writing, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// Whether this error is only a consequence of another failure.
    ///
    /// A producer sees `QueueClosed` when an aggregator died and closed the
    /// queue behind it; the aggregator's error is the one worth reporting.
    pub fn is_secondary(&self) -> bool {
        matches!(self, PipelineError::QueueClosed)
    }
}
