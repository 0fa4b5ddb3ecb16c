//! Error types shared by every stage of the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for bibcluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Represents errors that can occur while reading records, building the
/// corpus or clustering it.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// A single input record could not be read. Parsers recover from this by
    /// skipping or defaulting the record, it is reported rather than raised.
    #[error("Invalid record #{index}: {message}")]
    InvalidRecord { index: usize, message: String },

    #[error("Insufficient data ({documents} documents): {reason}")]
    InsufficientData { documents: usize, reason: String },

    #[error("Invalid linkage input at ({row}, {col}) = {value}: {reason}")]
    InvalidLinkageInput {
        reason: String,
        row: usize,
        col: usize,
        value: f64,
    },

    #[error("IO error on {}: {source}", path.display())]
    ResourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    InvalidFormat(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClusterError {
    /// Wraps an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClusterError::ResourceIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn insufficient(documents: usize, reason: impl Into<String>) -> Self {
        ClusterError::InsufficientData {
            documents,
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "csv")]
impl From<::csv::Error> for ClusterError {
    fn from(err: ::csv::Error) -> Self {
        ClusterError::InvalidFormat(err.to_string())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        ClusterError::InvalidFormat(err.to_string())
    }
}
