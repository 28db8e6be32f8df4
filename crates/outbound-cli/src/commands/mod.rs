//! CLI command implementations for the outbound MCP server.

pub mod check;
pub mod serve;
pub mod tools;

use anyhow::{Context, Result};
use outbound_core::OutboundConfig;
use std::path::Path;
use tracing::warn;

/// Load the configuration file, falling back to defaults when it is absent.
pub fn load_config(path: &Path) -> Result<OutboundConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "configuration file not found, using defaults");
        return Ok(OutboundConfig::default());
    }
    OutboundConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {:?}", path))
}
