//! Run store errors

use std::path::PathBuf;

/// Run store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("run store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded
    #[error("cannot encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// A stored line did not decode
    #[error("corrupt line {line} in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// No records or summary for the session
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if retrying the same append may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock
            ),
            Self::Encode(_) | Self::Corrupt { .. } | Self::SessionNotFound(_) => false,
        }
    }
}
