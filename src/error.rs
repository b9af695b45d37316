//! Error types for the sub-clustering pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum Error {
    /// The output destination is already present
    #[error("output path already exists! ({})", .0.display())]
    OutputExists(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line of an input file could not be understood
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("failed to load table {}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: polars::prelude::PolarsError,
    },

    #[error("failed to serialize run summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why the clustering routine could not label a group.
///
/// These never abort a run; the driver turns them into failure rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("network has no nodes")]
    EmptyNetwork,

    #[error("network has no links")]
    NoLinks,

    #[error("link endpoint {0} is not a node of the network")]
    UnknownNode(i64),

    #[error("clustering routine panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}
