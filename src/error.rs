//! Error types for flight-fares
//!
//! Query-level failures (an unknown city) are reported per query and never
//! stop a worker pool. Everything else is a configuration, input or
//! invariant failure surfaced to the caller.

use std::path::PathBuf;

use crate::graph::CityId;

/// Main error type for flight-fares operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// City name absent from the graph index
    #[error("unknown city '{0}'")]
    UnknownCity(String),

    /// Second publication into an already published matrix cell
    #[error("matrix cell ({row}, {col}) was already published")]
    AlreadyPublished { row: CityId, col: CityId },

    /// Invalid engine configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pool worker panicked before finishing its share
    #[error("worker '{0}' panicked")]
    WorkerPanicked(String),

    /// The OS refused to start a worker thread
    #[error("failed to spawn worker '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Timing histogram could not be created or updated
    #[error("histogram error: {0}")]
    Histogram(String),

    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input stream failure while reading records from an unnamed reader
    #[error("input read error: {0}")]
    Read(#[source] std::io::Error),

    /// Output stream failure while emitting records
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    /// JSON encoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience result type for flight-fares operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_city_message() {
        let err = Error::UnknownCity("Atlantis".to_string());
        assert_eq!(err.to_string(), "unknown city 'Atlantis'");
    }

    #[test]
    fn test_io_error_keeps_path_and_source() {
        let err = Error::io(
            "/tmp/missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing.txt"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
