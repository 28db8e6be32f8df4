//! Upstream REST API configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the upstream email-marketing API.
///
/// Header names are upstream-defined, so they are configurable rather than
/// hard-coded in the request client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL including the versioned path, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Response header carrying the remaining request quota.
    #[serde(default = "default_remaining_header")]
    pub rate_limit_remaining_header: String,

    /// Response header carrying the quota reset time (unix seconds).
    #[serde(default = "default_reset_header")]
    pub rate_limit_reset_header: String,

    /// Response header carrying the retry-after hint (seconds or HTTP-date) on 429.
    #[serde(default = "default_retry_after_header")]
    pub retry_after_header: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            rate_limit_remaining_header: default_remaining_header(),
            rate_limit_reset_header: default_reset_header(),
            retry_after_header: default_retry_after_header(),
        }
    }
}

impl UpstreamConfig {
    /// Join the base URL with an endpoint path.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_base_url() -> String {
    "https://api.instantly.ai/api/v2".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_remaining_header() -> String {
    "x-ratelimit-remaining".to_string()
}

fn default_reset_header() -> String {
    "x-ratelimit-reset".to_string()
}

fn default_retry_after_header() -> String {
    "retry-after".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_normalizes_slashes() {
        let config = UpstreamConfig {
            base_url: "http://localhost:9000/api/v2/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.url_for("/accounts"), "http://localhost:9000/api/v2/accounts");
        assert_eq!(config.url_for("campaigns"), "http://localhost:9000/api/v2/campaigns");
    }
}
