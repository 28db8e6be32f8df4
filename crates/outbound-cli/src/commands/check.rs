//! `outbound check` command implementation.
//!
//! Loads the configuration file and reports settings that would make tool
//! calls fail or behave surprisingly.

use anyhow::Result;
use outbound_core::{OutboundConfig, Transport};
use outbound_mcp::{validate_time_format, validate_timezone};
use std::path::Path;

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Dotted configuration key, e.g. `campaign.default_timezone`.
    pub location: String,
    pub message: String,
}

impl CheckFinding {
    fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location: location.into(),
            message: message.into(),
        }
    }

    fn warning(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Checks that `OutboundConfig::validate` leaves to the tools themselves.
pub fn check_config(config: &OutboundConfig) -> Vec<CheckFinding> {
    let mut findings = Vec::new();

    let base_url = &config.upstream.base_url;
    if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
        findings.push(CheckFinding::error(
            "upstream.base_url",
            format!("'{}' is not an http(s) URL", base_url),
        ));
    } else if base_url.starts_with("http://") {
        findings.push(CheckFinding::warning(
            "upstream.base_url",
            "plain http sends the API key unencrypted",
        ));
    }

    if config.upstream.timeout_seconds == 0 {
        findings.push(CheckFinding::error(
            "upstream.timeout_seconds",
            "must be at least 1",
        ));
    }

    let campaign = &config.campaign;
    if !validate_timezone(&campaign.default_timezone) {
        findings.push(CheckFinding::error(
            "campaign.default_timezone",
            format!("'{}' is not a supported timezone", campaign.default_timezone),
        ));
    }

    let start_ok = validate_time_format(&campaign.default_window_start);
    let end_ok = validate_time_format(&campaign.default_window_end);
    if !start_ok {
        findings.push(CheckFinding::error(
            "campaign.default_window_start",
            format!("'{}' is not HH:MM", campaign.default_window_start),
        ));
    }
    if !end_ok {
        findings.push(CheckFinding::error(
            "campaign.default_window_end",
            format!("'{}' is not HH:MM", campaign.default_window_end),
        ));
    }
    // Strict HH:MM compares correctly as text.
    if start_ok && end_ok && campaign.default_window_start >= campaign.default_window_end {
        findings.push(CheckFinding::error(
            "campaign.default_window_end",
            "send window must end after it starts",
        ));
    }

    let pagination = &config.pagination;
    let reachable = u64::from(pagination.max_pages) * u64::from(pagination.page_size);
    if reachable < pagination.max_items as u64 {
        findings.push(CheckFinding::warning(
            "pagination.max_items",
            format!(
                "max_pages x page_size is {}, so the safety ceiling stops walks before max_items {}",
                reachable, pagination.max_items
            ),
        ));
    }

    if config.mcp.transport == Transport::Http && config.mcp.host == "0.0.0.0" {
        findings.push(CheckFinding::warning(
            "mcp.host",
            "HTTP transport listens on every interface",
        ));
    }

    findings
}

/// Run the check command.
pub fn run(config_path: &Path) -> Result<()> {
    println!("🔍 Checking outbound configuration...");

    let config = super::load_config(config_path)?;
    let findings = check_config(&config);

    println!("   Upstream: {}", config.upstream.base_url);
    println!(
        "   Transport: {}",
        match config.mcp.transport {
            Transport::Stdio => "stdio".to_string(),
            Transport::Http => format!("http ({})", config.mcp.bind_address()),
        }
    );
    println!(
        "   Pagination: page_size {}, max_pages {}, max_items {}",
        config.pagination.page_size, config.pagination.max_pages, config.pagination.max_items
    );
    println!(
        "   Payload shapes: {}",
        config
            .campaign
            .payload_shapes
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!();
    for finding in &findings {
        println!(
            "   [{}] {}: {}",
            finding.severity, finding.location, finding.message
        );
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("Configuration has {} error(s) that must be fixed", errors);
    }

    println!("✅ All checks passed!");
    Ok(())
}
