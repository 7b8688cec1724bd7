//! Error types for the engine
//!
//! Provides:
//! - Configuration errors (file, environment, validation)
//! - The batch-level error wrapping catalogue, store and Portal failures

use mab_core::CatalogueError;
use mab_portal::PortalError;
use mab_store::StoreError;
use std::path::PathBuf;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `EngineConfig`
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Required setting absent
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// Setting present but unusable
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that stop the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    /// Run store unusable; progress can no longer be persisted
    #[error("run store error: {0}")]
    Store(#[from] StoreError),

    /// Batch-fatal Portal failure (start-up or sign-in)
    #[error("portal error: {0}")]
    Portal(#[from] PortalError),
}

impl EngineError {
    /// Whether the error ended a batch that had already started
    #[inline]
    #[must_use]
    pub fn is_batch_fatal(&self) -> bool {
        match self {
            Self::Portal(e) => e.is_batch_fatal(),
            Self::Store(_) => true,
            Self::Config(_) | Self::Catalogue(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let err = EngineError::from(PortalError::Login("bounced".into()));
        assert!(err.is_batch_fatal());

        let err = EngineError::from(ConfigError::Missing("PORTAL_PASSWORD"));
        assert!(!err.is_batch_fatal());
        assert_eq!(err.to_string(), "configuration error: missing required setting PORTAL_PASSWORD");
    }
}
