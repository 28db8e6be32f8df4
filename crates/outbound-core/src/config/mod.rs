//! Configuration types for outbound.
//!
//! Configuration is loaded from an optional `outbound.yaml` file. Every
//! section has defaults, so an empty file (or no file at all) yields a
//! runnable configuration.
//!
//! The upstream API key is deliberately absent here: it is supplied per
//! process on the command line or per request as a bearer token.

pub mod campaign;
pub mod mcp;
pub mod pagination;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use campaign::{CampaignConfig, PayloadShape};
pub use mcp::{McpConfig, Transport};
pub use pagination::PaginationConfig;
pub use upstream::UpstreamConfig;

/// Complete outbound configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutboundConfig {
    /// Upstream REST API settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// MCP server settings.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Safety limits for cursor pagination.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Campaign creation defaults.
    #[serde(default)]
    pub campaign: CampaignConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OutboundConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to `null`, which serde_yaml rejects
        // for a struct.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pagination.validate()?;
        self.campaign.validate()?;
        if self.upstream.base_url.trim().is_empty() {
            return Err(ConfigError::Config(
                "upstream.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = OutboundConfig::from_yaml("").unwrap();
        assert_eq!(config.pagination.max_pages, 200);
        assert_eq!(config.mcp.transport, Transport::Stdio);
        assert_eq!(config.campaign.payload_shapes, vec![PayloadShape::Schedules]);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
mcp:
  transport: http
  port: 8088
pagination:
  page_size: 25
  max_pages: 5
campaign:
  default_timezone: Europe/London
  payload_shapes: [schedules, flat_schedule]
"#;
        let config = OutboundConfig::from_yaml(yaml).unwrap();
        assert!(config.mcp.is_http());
        assert_eq!(config.mcp.port, 8088);
        assert_eq!(config.pagination.page_size, 25);
        assert_eq!(config.pagination.max_pages, 5);
        assert_eq!(config.pagination.max_page_size, 100);
        assert_eq!(config.campaign.default_timezone, "Europe/London");
        assert_eq!(config.campaign.payload_shapes.len(), 2);
        assert_eq!(config.upstream.timeout_seconds, 30);
    }

    #[test]
    fn test_page_size_above_maximum_rejected() {
        let yaml = "pagination:\n  page_size: 500\n  max_page_size: 100\n";
        let err = OutboundConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Config(msg) if msg.contains("page_size")));
    }

    #[test]
    fn test_empty_payload_shapes_rejected() {
        let yaml = "campaign:\n  payload_shapes: []\n";
        assert!(OutboundConfig::from_yaml(yaml).is_err());
    }
}
