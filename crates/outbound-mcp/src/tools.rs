//! Tool catalog.
//!
//! Every tool is a [`ToolKind`] variant. Its schema comes from an exhaustive
//! match in [`ToolKind::definition`] and its handler from an exhaustive
//! match in the executor, so a tool cannot exist without both.

use crate::error::McpError;
use crate::protocol::{ToolAnnotations, ToolDefinition};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Identifier segment accepted for campaign ids.
pub(crate) const CAMPAIGN_ID_PATTERN: &str = "^[A-Za-z0-9_-]+$";

/// The closed set of tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListAccounts,
    GetAccount,
    ListCampaigns,
    GetCampaign,
    CreateCampaign,
    ActivateCampaign,
    PauseCampaign,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::ListAccounts,
        ToolKind::GetAccount,
        ToolKind::ListCampaigns,
        ToolKind::GetCampaign,
        ToolKind::CreateCampaign,
        ToolKind::ActivateCampaign,
        ToolKind::PauseCampaign,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::ListAccounts => "list_accounts",
            ToolKind::GetAccount => "get_account",
            ToolKind::ListCampaigns => "list_campaigns",
            ToolKind::GetCampaign => "get_campaign",
            ToolKind::CreateCampaign => "create_campaign",
            ToolKind::ActivateCampaign => "activate_campaign",
            ToolKind::PauseCampaign => "pause_campaign",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// MCP definition, including the JSON input schema.
    pub fn definition(&self) -> ToolDefinition {
        let (description, input_schema, annotations) = match self {
            ToolKind::ListAccounts => (
                "List every sending account in the workspace, following pagination to the end.",
                list_schema(),
                read_only(),
            ),
            ToolKind::GetAccount => (
                "Fetch one sending account by email address.",
                json!({
                    "type": "object",
                    "properties": {
                        "email": {"type": "string", "description": "Sending account address"}
                    },
                    "required": ["email"]
                }),
                read_only(),
            ),
            ToolKind::ListCampaigns => (
                "List campaigns, following pagination to the end.",
                list_schema(),
                read_only(),
            ),
            ToolKind::GetCampaign => (
                "Fetch one campaign by id.",
                campaign_id_schema(),
                read_only(),
            ),
            ToolKind::CreateCampaign => (
                "Create an email campaign in three stages: check sending accounts, validate and \
                 preview the payload, then create it upstream. Use stage=prerequisite_check or \
                 stage=preview to stop early; the default runs all three.",
                create_campaign_schema(),
                ToolAnnotations {
                    read_only: Some(false),
                    destructive: Some(false),
                    idempotent: Some(false),
                },
            ),
            ToolKind::ActivateCampaign => (
                "Start sending a campaign.",
                campaign_id_schema(),
                ToolAnnotations {
                    read_only: Some(false),
                    destructive: Some(false),
                    idempotent: Some(true),
                },
            ),
            ToolKind::PauseCampaign => (
                "Pause a running campaign.",
                campaign_id_schema(),
                ToolAnnotations {
                    read_only: Some(false),
                    destructive: Some(false),
                    idempotent: Some(true),
                },
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: Some(description.to_string()),
            input_schema,
            annotations: Some(annotations),
        }
    }
}

fn read_only() -> ToolAnnotations {
    ToolAnnotations {
        read_only: Some(true),
        destructive: Some(false),
        idempotent: Some(true),
    }
}

fn list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "limit": {
                "type": "integer",
                "minimum": 1,
                "description": "Stop after this many items"
            },
            "search": {"type": "string", "description": "Upstream search filter"},
            "require_complete": {
                "type": "boolean",
                "description": "Fail instead of returning a partial list"
            }
        }
    })
}

fn campaign_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "campaign_id": {"type": "string", "pattern": CAMPAIGN_ID_PATTERN}
        },
        "required": ["campaign_id"]
    })
}

fn create_campaign_schema() -> Value {
    let time = json!({"type": "string", "description": "24-hour HH:MM"});
    json!({
        "type": "object",
        "properties": {
            "stage": {
                "type": "string",
                "enum": ["prerequisite_check", "preview", "create"],
                "default": "create"
            },
            "name": {"type": "string"},
            "subject": {"type": "string"},
            "body": {"type": "string", "description": "Plain text; line breaks become paragraphs"},
            "email_list": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "description": "Sending account addresses"
            },
            "timezone": {"type": "string", "description": "IANA timezone, e.g. America/New_York"},
            "days": {
                "type": "array",
                "items": {
                    "type": "string",
                    "enum": ["sunday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday"]
                },
                "description": "Sending days; defaults to Monday to Friday"
            },
            "send_window": {
                "type": "object",
                "properties": {"start": time, "end": time},
                "required": ["start", "end"]
            },
            "daily_limit": {"type": "integer", "minimum": 1},
            "email_gap_minutes": {"type": "integer", "minimum": 1},
            "stop_on_reply": {"type": "boolean"},
            "open_tracking": {"type": "boolean"},
            "link_tracking": {"type": "boolean"},
            "follow_ups": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "subject": {"type": "string"},
                        "body": {"type": "string"},
                        "delay_days": {"type": "integer", "minimum": 0}
                    },
                    "required": ["body"]
                }
            }
        },
        "required": ["name", "subject", "body", "email_list"]
    })
}

/// Registry of available MCP tools.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, (ToolKind, ToolDefinition)>,
}

impl ToolRegistry {
    /// The process-wide catalog, built once.
    pub fn catalog() -> &'static ToolRegistry {
        static CATALOG: OnceLock<ToolRegistry> = OnceLock::new();
        CATALOG.get_or_init(|| {
            let mut registry = ToolRegistry {
                tools: HashMap::new(),
            };
            for kind in ToolKind::ALL {
                registry.register(kind);
            }
            registry
        })
    }

    fn register(&mut self, kind: ToolKind) {
        let definition = kind.definition();
        self.tools.insert(definition.name.clone(), (kind, definition));
    }

    /// Check that every tool kind is registered under a unique name with an
    /// object input schema.
    pub fn verify(&self) -> Result<(), McpError> {
        let mut names = HashSet::new();
        for kind in ToolKind::ALL {
            if !names.insert(kind.name()) {
                return Err(McpError::Catalog(format!("duplicate tool name {}", kind.name())));
            }
            let Some((registered, definition)) = self.tools.get(kind.name()) else {
                return Err(McpError::Catalog(format!("{} has no definition", kind.name())));
            };
            if *registered != kind {
                return Err(McpError::Catalog(format!("{} maps to {registered:?}", kind.name())));
            }
            if definition.input_schema["type"] != "object" {
                return Err(McpError::Catalog(format!(
                    "{} input schema is not an object",
                    kind.name()
                )));
            }
        }
        if self.tools.len() != ToolKind::ALL.len() {
            return Err(McpError::Catalog(format!(
                "{} tools registered, {} expected",
                self.tools.len(),
                ToolKind::ALL.len()
            )));
        }
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<(ToolKind, &ToolDefinition)> {
        self.tools.get(name).map(|(kind, def)| (*kind, def))
    }

    /// List all tools in catalog order.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        ToolKind::ALL
            .iter()
            .filter_map(|kind| self.tools.get(kind.name()).map(|(_, def)| def))
            .collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tool names.
    pub fn names(&self) -> Vec<&str> {
        self.list().iter().map(|def| def.name.as_str()).collect()
    }
}
