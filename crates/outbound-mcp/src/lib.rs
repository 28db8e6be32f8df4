//! # outbound-mcp
//!
//! MCP (Model Context Protocol) server exposing an email-marketing REST API
//! as typed tools.
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (list tools / call tool), stdio or HTTP
//!       ▼
//! ┌──────────────────────┐
//! │  outbound MCP Server │
//! │  1. Check arguments  │  ← tool input schema
//! │  2. Dispatch tool    │  ← ToolKind
//! │  3. Validate fields  │  ← validator
//! │  4. Call upstream    │  ← outbound-upstream
//! │  5. Return JSON      │
//! └──────────┬───────────┘
//!            │ Authorization: Bearer <api key>
//!            ▼
//!     Upstream REST API
//! ```
//!
//! ## Tools
//!
//! | Tool | Upstream call |
//! |------|---------------|
//! | `list_accounts` | `GET /accounts`, every page |
//! | `get_account` | `GET /accounts/{email}` |
//! | `list_campaigns` | `GET /campaigns`, every page |
//! | `get_campaign` | `GET /campaigns/{id}` |
//! | `create_campaign` | account check, local validation, then `POST /campaigns` |
//! | `activate_campaign` | `POST /campaigns/{id}/activate` |
//! | `pause_campaign` | `POST /campaigns/{id}/pause` |
//!
//! ## Example Usage
//!
//! ```ignore
//! use outbound_core::OutboundConfig;
//! use outbound_mcp::McpServer;
//! use outbound_upstream::ApiKey;
//!
//! let config = OutboundConfig::from_file("outbound.yaml")?;
//! let server = McpServer::shared(config, Some(ApiKey::new(key)?))?;
//! server.run().await?;
//! ```

pub mod campaign;
pub mod error;
pub mod executor;
pub mod http_transport;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod validator;

// Re-export main types
pub use campaign::{
    CampaignCreateRequest, CampaignPreview, CampaignWorkflow, CreatedCampaign, PrerequisiteReport,
    normalize_body,
};
pub use error::{McpError, ToolError};
pub use executor::{ExecutionContext, ExecutionResult, ToolExecutor};
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, RequestContext,
    ToolAnnotations, ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use tools::{ToolKind, ToolRegistry};
pub use validator::{
    FailureReason, ValidationFailure, is_placeholder_email, validate_campaign_draft,
    validate_email_format, validate_time_format, validate_timezone,
};
