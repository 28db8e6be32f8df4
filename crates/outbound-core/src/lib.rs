//! # outbound-core
//!
//! Configuration types and domain models shared by every outbound crate.
//!
//! - [`config`]: the `outbound.yaml` sections (upstream, MCP transport,
//!   pagination ceilings, campaign defaults).
//! - [`models`]: sending accounts and the caller-supplied campaign draft.

pub mod config;
pub mod models;

pub use config::{
    CampaignConfig, ConfigError, McpConfig, OutboundConfig, PaginationConfig, PayloadShape,
    Transport, UpstreamConfig,
};
pub use models::{CampaignDraft, FollowUpStep, SendWindow, SendingAccount, Weekday};
