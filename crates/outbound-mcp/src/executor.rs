//! Tool execution engine.
//!
//! This module maps a tool call to upstream requests:
//! - Checking arguments against the tool's input schema
//! - Building a per-invocation upstream client from the caller's API key
//! - Dispatching to the tool handler
//! - Formatting results and errors

use crate::campaign::CampaignWorkflow;
use crate::error::{McpError, ToolError};
use crate::protocol::{CallToolResponse, ToolContent, ToolDefinition};
use crate::tools::{ToolKind, ToolRegistry};
use crate::validator::{ValidationFailure, validate_email_format};
use outbound_core::{CampaignDraft, OutboundConfig, UpstreamConfig};
use outbound_upstream::{
    ApiKey, ListEndpoint, PaginationParams, PaginationResult, Paginator, StoppedReason,
    UpstreamClient,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Whether the execution was successful.
    pub success: bool,
    /// The result content.
    pub content: Vec<ToolContent>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Create a successful result with JSON content.
    pub fn success_json(value: Value) -> Self {
        Self {
            success: true,
            content: vec![ToolContent::Json { json: value }],
            error: None,
        }
    }

    /// Create an error result carrying the message and the structured payload.
    pub fn failure(err: &ToolError) -> Self {
        let message = err.to_string();
        Self {
            success: false,
            content: vec![
                ToolContent::Text {
                    text: format!("{message}. {}", err.guidance()),
                },
                ToolContent::Json {
                    json: err.to_payload(),
                },
            ],
            error: Some(message),
        }
    }

    pub fn into_response(self) -> CallToolResponse {
        CallToolResponse {
            content: self.content,
            is_error: !self.success,
        }
    }
}

/// Context for one tool invocation.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Upstream API key for this call.
    pub api_key: Option<ApiKey>,
    /// Cancels every upstream request of this call.
    pub cancel: CancellationToken,
    /// Correlates log lines of this call.
    pub invocation_id: Uuid,
}

impl ExecutionContext {
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self {
            api_key,
            cancel: CancellationToken::new(),
            invocation_id: Uuid::new_v4(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Which part of the campaign workflow a `create_campaign` call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CampaignStage {
    PrerequisiteCheck,
    Preview,
    Create,
}

impl CampaignStage {
    fn from_arguments(arguments: &Value) -> Result<Self, ToolError> {
        match arguments.get("stage").and_then(Value::as_str) {
            None | Some("create") => Ok(CampaignStage::Create),
            Some("preview") => Ok(CampaignStage::Preview),
            Some("prerequisite_check") => Ok(CampaignStage::PrerequisiteCheck),
            Some(other) => Err(ToolError::InvalidArguments(format!(
                "unknown stage '{other}'; use prerequisite_check, preview or create"
            ))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            CampaignStage::PrerequisiteCheck => "prerequisite_check",
            CampaignStage::Preview => "preview",
            CampaignStage::Create => "create",
        }
    }
}

/// Runs tools against the upstream API.
///
/// Holds only immutable state, so one executor serves every invocation.
pub struct ToolExecutor {
    config: Arc<OutboundConfig>,
    upstream: Arc<UpstreamConfig>,
    http: reqwest::Client,
}

impl ToolExecutor {
    /// Create an executor and its shared HTTP transport.
    pub fn new(config: Arc<OutboundConfig>) -> Result<Self, McpError> {
        let http = UpstreamClient::build_http(&config.upstream)
            .map_err(|e| McpError::StartupFailed(e.to_string()))?;
        Ok(Self {
            upstream: Arc::new(config.upstream.clone()),
            config,
            http,
        })
    }

    /// Execute a tool call.
    pub async fn execute(
        &self,
        kind: ToolKind,
        arguments: Value,
        context: &ExecutionContext,
    ) -> ExecutionResult {
        let span = info_span!(
            "tool_call",
            tool = kind.name(),
            invocation_id = %context.invocation_id
        );
        async {
            let started = Instant::now();
            match self.dispatch(kind, arguments, context).await {
                Ok(value) => {
                    info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "tool call succeeded"
                    );
                    ExecutionResult::success_json(value)
                }
                Err(err) => {
                    warn!(
                        kind = err.kind(),
                        retryable = err.is_retryable(),
                        error = %err,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "tool call failed"
                    );
                    ExecutionResult::failure(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        kind: ToolKind,
        arguments: Value,
        context: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => arguments,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "arguments must be an object, got {}",
                    json_type(&other)
                )));
            }
        };
        if let Some((_, definition)) = ToolRegistry::catalog().get(kind.name()) {
            validate_arguments(definition, &arguments)?;
        }

        let client = self.client(context)?;
        match kind {
            ToolKind::ListAccounts => self.list(&client, "/accounts", &arguments).await,
            ToolKind::GetAccount => {
                let email = required_str(&arguments, "email")?;
                if !validate_email_format(email) || email.contains(['/', '?', '#', '%']) {
                    return Err(ToolError::Validation(vec![ValidationFailure::invalid_email(
                        "email", email,
                    )]));
                }
                Ok(client.get(&format!("/accounts/{email}")).await?.body)
            }
            ToolKind::ListCampaigns => self.list(&client, "/campaigns", &arguments).await,
            ToolKind::GetCampaign => {
                let id = required_str(&arguments, "campaign_id")?;
                Ok(client.get(&format!("/campaigns/{id}")).await?.body)
            }
            ToolKind::CreateCampaign => self.create_campaign(client, arguments).await,
            ToolKind::ActivateCampaign => self.campaign_action(&client, &arguments, "activate").await,
            ToolKind::PauseCampaign => self.campaign_action(&client, &arguments, "pause").await,
        }
    }

    fn client(&self, context: &ExecutionContext) -> Result<UpstreamClient, ToolError> {
        let api_key = context.api_key.clone().ok_or(ToolError::MissingApiKey)?;
        Ok(
            UpstreamClient::with_http(self.http.clone(), self.upstream.clone(), api_key)
                .with_cancellation(context.cancel.clone()),
        )
    }

    async fn list(
        &self,
        client: &UpstreamClient,
        path: &str,
        arguments: &Value,
    ) -> Result<Value, ToolError> {
        let mut params = PaginationParams::from_config(&self.config.pagination);
        if let Some(limit) = arguments.get("limit").and_then(Value::as_u64) {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            params = params.with_max_items(limit.min(params.max_items));
        }
        let require_complete = arguments
            .get("require_complete")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut endpoint = ListEndpoint::new(client.clone(), path);
        if let Some(search) = arguments
            .get("search")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            endpoint = endpoint.with_query("search", search);
        }

        let result: PaginationResult<Value> = Paginator::new(params)
            .with_cancellation(client.cancellation().clone())
            .fetch_all(&endpoint)
            .await;

        let mut warning = None;
        if let Some(err) = result.error {
            if result.items.is_empty() || require_complete {
                return Err(err.into());
            }
            warning = Some(format!(
                "partial list: stopped after {} items because of an upstream error: {err}",
                result.total_fetched
            ));
        } else if result.stopped_reason == StoppedReason::SafetyLimitReached {
            if require_complete {
                return Err(ToolError::SafetyLimitExceeded {
                    pages: result.pages_fetched,
                    fetched: result.total_fetched,
                });
            }
            warning = Some(format!(
                "partial list: stopped at the safety limit of {} pages",
                result.pages_fetched
            ));
        }

        Ok(json!({
            "items": result.items,
            "total_fetched": result.total_fetched,
            "pages_fetched": result.pages_fetched,
            "is_complete": result.is_complete,
            "stopped_reason": result.stopped_reason,
            "warning": warning,
        }))
    }

    async fn campaign_action(
        &self,
        client: &UpstreamClient,
        arguments: &Value,
        action: &str,
    ) -> Result<Value, ToolError> {
        let id = required_str(arguments, "campaign_id")?;
        let response = client
            .post(&format!("/campaigns/{id}/{action}"), json!({}))
            .await?;
        Ok(response.body)
    }

    async fn create_campaign(
        &self,
        client: UpstreamClient,
        arguments: Value,
    ) -> Result<Value, ToolError> {
        let stage = CampaignStage::from_arguments(&arguments)?;
        let draft: CampaignDraft = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid campaign fields: {e}")))?;
        let workflow = CampaignWorkflow::new(
            client,
            PaginationParams::from_config(&self.config.pagination),
            self.config.campaign.clone(),
        );

        let artifact = match stage {
            CampaignStage::PrerequisiteCheck => {
                serde_json::to_value(workflow.prerequisite_check().await?)?
            }
            CampaignStage::Preview => serde_json::to_value(workflow.run_preview(&draft).await?)?,
            CampaignStage::Create => serde_json::to_value(workflow.run(&draft).await?)?,
        };

        let mut output = Map::new();
        output.insert("stage".to_string(), json!(stage.as_str()));
        if let Value::Object(fields) = artifact {
            output.extend(fields);
        }
        Ok(Value::Object(output))
    }
}

/// A required, non-blank string argument.
fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::Validation(vec![ValidationFailure::missing_field(key)]))
}

/// Check top-level arguments against a tool's input schema.
///
/// Covers type, enum, minimum and pattern. Required fields are left to the
/// handlers so that a missing field is reported with the other validation
/// failures of the same call.
fn validate_arguments(tool: &ToolDefinition, arguments: &Value) -> Result<(), ToolError> {
    let Some(props) = tool.input_schema["properties"].as_object() else {
        return Ok(());
    };

    for (field, prop_schema) in props {
        let Some(value) = arguments.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        if let Some(expected_type) = prop_schema["type"].as_str()
            && !check_type(value, expected_type)
        {
            return Err(ToolError::InvalidArguments(format!(
                "'{}' must be of type {}, got {}",
                field,
                expected_type,
                json_type(value)
            )));
        }

        if let Some(allowed) = prop_schema["enum"].as_array()
            && !allowed.contains(value)
        {
            return Err(ToolError::InvalidArguments(format!(
                "invalid value for '{}': {}. Allowed: {}",
                field,
                value,
                Value::Array(allowed.clone())
            )));
        }

        if let (Some(min), Some(v)) = (prop_schema["minimum"].as_f64(), value.as_f64())
            && v < min
        {
            return Err(ToolError::InvalidArguments(format!(
                "'{}' must be at least {}",
                field, min
            )));
        }

        if let (Some(pattern), Some(s)) = (prop_schema["pattern"].as_str(), value.as_str())
            && let Ok(re) = regex::Regex::new(pattern)
            && !re.is_match(s)
        {
            return Err(ToolError::InvalidArguments(format!(
                "'{}' does not match pattern {}",
                field, pattern
            )));
        }
    }

    Ok(())
}

/// Check if a value matches an expected JSON schema type.
fn check_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Arc::new(OutboundConfig::default())).unwrap()
    }

    fn definition(kind: ToolKind) -> &'static ToolDefinition {
        ToolRegistry::catalog().get(kind.name()).unwrap().1
    }

    fn error_payload(result: &ExecutionResult) -> &Value {
        match &result.content[1] {
            ToolContent::Json { json } => json,
            other => panic!("expected json content, got {other:?}"),
        }
    }

    #[test]
    fn test_type_and_enum_checks() {
        let create = definition(ToolKind::CreateCampaign);
        assert!(validate_arguments(create, &json!({"name": "x", "stage": "preview"})).is_ok());
        assert!(validate_arguments(create, &json!({"timezone": null})).is_ok());
        assert!(matches!(
            validate_arguments(create, &json!({"name": 5})),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            validate_arguments(create, &json!({"stage": "launch"})),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            validate_arguments(create, &json!({"email_list": "a@b.io"})),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_minimum_and_pattern_checks() {
        let list = definition(ToolKind::ListAccounts);
        assert!(validate_arguments(list, &json!({"limit": 10})).is_ok());
        assert!(validate_arguments(list, &json!({"limit": 0})).is_err());

        let get = definition(ToolKind::GetCampaign);
        assert!(validate_arguments(get, &json!({"campaign_id": "0190ab-c3"})).is_ok());
        assert!(validate_arguments(get, &json!({"campaign_id": "../accounts"})).is_err());
    }

    #[test]
    fn test_required_str() {
        let args = json!({"email": "  ", "id": " c1 "});
        assert_eq!(required_str(&args, "id").unwrap(), "c1");
        match required_str(&args, "email") {
            Err(ToolError::Validation(failures)) => assert_eq!(failures[0].field, "email"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!(
            CampaignStage::from_arguments(&json!({})).unwrap(),
            CampaignStage::Create
        );
        assert_eq!(
            CampaignStage::from_arguments(&json!({"stage": "preview"})).unwrap(),
            CampaignStage::Preview
        );
        assert!(CampaignStage::from_arguments(&json!({"stage": "later"})).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_reported_as_tool_error() {
        let result = executor()
            .execute(ToolKind::ListAccounts, json!({}), &ExecutionContext::new(None))
            .await;
        assert!(!result.success);
        assert_eq!(error_payload(&result)["error"], "missing_api_key");

        let response = result.into_response();
        assert!(response.is_error);
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let context = ExecutionContext::new(Some(ApiKey::new("k").unwrap()));
        let result = executor()
            .execute(ToolKind::GetCampaign, json!([1, 2]), &context)
            .await;
        assert_eq!(error_payload(&result)["error"], "invalid_arguments");
    }

    #[tokio::test]
    async fn test_get_account_validates_email_before_calling_upstream() {
        let context = ExecutionContext::new(Some(ApiKey::new("k").unwrap()));
        let result = executor()
            .execute(ToolKind::GetAccount, json!({"email": "nope"}), &context)
            .await;
        let payload = error_payload(&result);
        assert_eq!(payload["error"], "validation_error");
        assert_eq!(payload["failures"][0]["reason"], "InvalidEmailFormat");
    }
}
