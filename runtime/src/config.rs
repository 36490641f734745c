//! Session configuration.
//!
//! Loads configuration from environment variables with sensible defaults. The
//! seed table is opaque here: it maps a resource kind to a record count and is
//! read by whichever [`Seeder`](crate::state::Seeder) owns that kind.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stages would all fire immediately
    #[error("stage_interval_ms must be > 0")]
    ZeroStageInterval,

    /// A page could never hold anything
    #[error("page_size must be > 0")]
    ZeroPageSize,

    /// The default page would be rejected by the limit
    #[error("page_size {page_size} exceeds max_page_size {max_page_size}")]
    PageSizeAboveMax {
        /// Configured default
        page_size: u32,
        /// Configured limit
        max_page_size: u32,
    },
}

/// Configuration applied at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Records to seed, per resource kind (`"domain" => 3`)
    pub seed: BTreeMap<String, usize>,
    /// Route names that are not registered (`"domains.delete"`)
    pub disabled_handlers: BTreeSet<String>,
    /// Base delay of default lifecycle stages, in milliseconds (default: 1000)
    pub stage_interval_ms: u64,
    /// Page size when a list request names none (default: 25)
    pub page_size: u32,
    /// Largest accepted `page_size` (default: 500)
    pub max_page_size: u32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            seed: BTreeMap::new(),
            disabled_handlers: BTreeSet::new(),
            stage_interval_ms: 1000,
            page_size: 25,
            max_page_size: 500,
        }
    }
}

impl MockConfig {
    /// Load configuration from environment variables
    ///
    /// - `MOCK_SEED`: `kind=count` pairs, comma-separated (`domain=3,domain_record=2`)
    /// - `MOCK_DISABLED_HANDLERS`: route names, comma-separated
    /// - `MOCK_STAGE_INTERVAL_MS`, `MOCK_PAGE_SIZE`, `MOCK_MAX_PAGE_SIZE`
    ///
    /// Unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            seed: env::var("MOCK_SEED")
                .map(|raw| parse_seed(&raw))
                .unwrap_or_default(),
            disabled_handlers: env::var("MOCK_DISABLED_HANDLERS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            stage_interval_ms: env::var("MOCK_STAGE_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stage_interval_ms),
            page_size: env::var("MOCK_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.page_size),
            max_page_size: env::var("MOCK_MAX_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_page_size),
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.stage_interval_ms == 0 {
            return Err(ConfigError::ZeroStageInterval);
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.page_size > self.max_page_size {
            return Err(ConfigError::PageSizeAboveMax {
                page_size: self.page_size,
                max_page_size: self.max_page_size,
            });
        }
        Ok(())
    }

    /// Builder: seed `count` records of `kind`
    #[must_use]
    pub fn with_seed(mut self, kind: impl Into<String>, count: usize) -> Self {
        self.seed.insert(kind.into(), count);
        self
    }

    /// Builder: leave the named route unregistered
    #[must_use]
    pub fn with_disabled_handler(mut self, name: impl Into<String>) -> Self {
        self.disabled_handlers.insert(name.into());
        self
    }

    /// Builder: base stage delay
    #[must_use]
    pub const fn with_stage_interval_ms(mut self, interval_ms: u64) -> Self {
        self.stage_interval_ms = interval_ms;
        self
    }

    /// Number of records to seed for `kind` (0 when not configured)
    #[must_use]
    pub fn seed_count(&self, kind: &str) -> usize {
        self.seed.get(kind).copied().unwrap_or(0)
    }

    /// Whether the named route is disabled
    #[must_use]
    pub fn is_disabled(&self, route: &str) -> bool {
        self.disabled_handlers.contains(route)
    }

    /// Base stage delay
    #[must_use]
    pub const fn stage_interval(&self) -> Duration {
        Duration::from_millis(self.stage_interval_ms)
    }
}

fn parse_seed(raw: &str) -> BTreeMap<String, usize> {
    raw.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .filter_map(|pair| {
            let parsed = pair
                .split_once('=')
                .and_then(|(kind, count)| Some((kind.trim().to_string(), count.trim().parse().ok()?)));
            if parsed.is_none() {
                tracing::warn!(entry = pair, "Ignoring malformed MOCK_SEED entry");
            }
            parsed
        })
        .collect()
}
