use std::{path::PathBuf, time::Duration};

use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: hyper::Error,
    },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },

    #[error("unexpected status code {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("malformed listing from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid entry in listing from {url}: {reason}")]
    InvalidEntry { url: String, reason: String },

    #[error("failed to download {name}: {source}")]
    Download {
        name: String,
        #[source]
        source: Box<MirrorError>,
    },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("maximum depth {max} exceeded at {url}")]
    DepthExceeded { url: String, max: usize },

    #[error("the http client was closed before {url} could be requested")]
    Closed { url: String },

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, MirrorError>;

impl MirrorError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Coarse error class, logged by `main` when a run fails.
    pub fn category(&self) -> &'static str {
        match self {
            MirrorError::Network { .. } | MirrorError::Timeout { .. } => "network",
            MirrorError::InvalidUrl { .. }
            | MirrorError::Status { .. }
            | MirrorError::Parse { .. }
            | MirrorError::InvalidEntry { .. } => "protocol",
            MirrorError::Download { .. } => "download",
            MirrorError::Filesystem { .. } => "filesystem",
            MirrorError::DepthExceeded { .. } => "limit",
            MirrorError::Closed { .. } | MirrorError::Task(_) => "task",
        }
    }

    /// Follows `Download` wrappers down to the error that actually happened.
    pub fn root_cause(&self) -> &MirrorError {
        match self {
            MirrorError::Download { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
