//! Pagination safety limits.
//!
//! The defaults are conservative operational choices, not load-tested
//! values. Deployments with very large account inventories should raise
//! `max_pages` / `max_items` explicitly.

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Limits applied by the pagination engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size requested from upstream.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Largest page size upstream accepts.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Hard ceiling on the number of pages fetched in one walk.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Default ceiling on the number of items collected in one walk.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Upper bound on any single rate-limit pause, in seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_seconds: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_pages: default_max_pages(),
            max_items: default_max_items(),
            max_backoff_seconds: default_max_backoff(),
        }
    }
}

impl PaginationConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Config(
                "pagination.page_size must be at least 1".to_string(),
            ));
        }
        if self.page_size > self.max_page_size {
            return Err(ConfigError::Config(format!(
                "pagination.page_size {} exceeds max_page_size {}",
                self.page_size, self.max_page_size
            )));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Config(
                "pagination.max_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_max_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    200
}

fn default_max_items() -> usize {
    10_000
}

fn default_max_backoff() -> u64 {
    30
}
