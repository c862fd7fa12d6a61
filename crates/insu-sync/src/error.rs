//! Error types for the synchronization engine
//!
//! Nothing here escapes a driver operation: row-scoped failures become row
//! patches and everything else lands in the [`ErrorLog`](crate::ErrorLog).
//! These types cover setup (configuration, client construction) and the one
//! fatal expansion failure.

use insu_upstream::FetchError;
use std::path::PathBuf;

/// Top-level error for building a sync context
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Upstream client could not be built
    #[error("upstream error: {0}")]
    Upstream(#[from] FetchError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Row expansion errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExpansionError {
    /// Primary product detail could not be fetched
    #[error("primary product {code} unavailable: {source}")]
    PrimaryUnavailable {
        code: String,
        #[source]
        source: FetchError,
    },
}

impl ExpansionError {
    /// Underlying fetch failure
    #[inline]
    #[must_use]
    pub fn fetch_error(&self) -> &FetchError {
        match self {
            Self::PrimaryUnavailable { source, .. } => source,
        }
    }
}
