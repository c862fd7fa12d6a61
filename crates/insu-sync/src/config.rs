//! Engine and application configuration
//!
//! ```toml
//! [upstream]
//! base_url = "http://localhost:8080"
//! timeout_ms = 10000
//!
//! [sync]
//! default_age = 15
//! default_base_amount = 100
//! max_in_flight = 8
//! fetch_premium_range = false
//! ```

use crate::error::ConfigError;
use crate::params::{SharedParameters, DEFAULT_AGE, DEFAULT_BASE_AMOUNT};
use insu_upstream::UpstreamConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Synchronization engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Initial applicant age
    pub default_age: u32,
    /// Initial base coverage amount
    pub default_base_amount: u64,
    /// Upper bound on concurrently running row refreshes (`None` = unbounded)
    pub max_in_flight: Option<usize>,
    /// Also fetch the min/max premium range on every row refresh
    pub fetch_premium_range: bool,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max in-flight refreshes
    #[inline]
    #[must_use]
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// With premium range lookups enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_premium_range(mut self, enabled: bool) -> Self {
        self.fetch_premium_range = enabled;
        self
    }

    /// With initial shared parameters
    #[inline]
    #[must_use]
    pub fn with_defaults(mut self, age: u32, base_amount: u64) -> Self {
        self.default_age = age;
        self.default_base_amount = base_amount;
        self
    }

    /// Shared parameters a fresh context starts with
    #[inline]
    #[must_use]
    pub fn initial_parameters(&self) -> SharedParameters {
        SharedParameters::new(self.default_age, self.default_base_amount)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` when `max_in_flight` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_in_flight",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_age: DEFAULT_AGE,
            default_base_amount: DEFAULT_BASE_AMOUNT,
            max_in_flight: None,
            fetch_premium_range: false,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend connection
    pub upstream: UpstreamConfig,
    /// Engine behaviour
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed TOML, `ConfigError::Invalid` on bad values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges of every section
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as [`Self::from_toml_str`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
