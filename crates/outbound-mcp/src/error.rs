//! Error types for the MCP crate.

use crate::validator::ValidationFailure;
use outbound_upstream::RequestError;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the MCP server itself.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// The tool catalog is inconsistent.
    #[error("tool catalog is invalid: {0}")]
    Catalog(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failure of a single tool invocation, as reported to the caller.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("upstream rejected the API key: {message}")]
    Authentication { message: String },

    #[error("API key is not permitted to perform this action: {message}")]
    Authorization { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    /// Local validation failed. Every failure is reported at once.
    #[error("input failed validation ({} problem(s))", .0.len())]
    Validation(Vec<ValidationFailure>),

    /// Upstream returned 400 for a request that passed local validation.
    #[error("upstream rejected the request ({status}): {upstream_message}")]
    UpstreamValidation {
        status: u16,
        body: Value,
        upstream_message: String,
    },

    #[error("upstream rate limit exceeded: {message}")]
    RateLimit {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("upstream server error ({status}): {message}")]
    UpstreamServer { status: u16, message: String },

    #[error("could not reach upstream: {message}")]
    Network { message: String },

    /// Upstream answered with an unexpected status or body.
    #[error("unexpected upstream response: {0}")]
    UnexpectedResponse(String),

    /// The page ceiling stopped a listing that had to be complete.
    #[error("stopped after {pages} pages ({fetched} items) before the list was exhausted")]
    SafetyLimitExceeded { pages: u32, fetched: usize },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("no API key was supplied")]
    MissingApiKey,

    #[error("invocation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Authentication { .. } => "authentication_error",
            ToolError::Authorization { .. } => "authorization_error",
            ToolError::NotFound { .. } => "not_found_error",
            ToolError::Validation(_) => "validation_error",
            ToolError::UpstreamValidation { .. } => "upstream_validation_error",
            ToolError::RateLimit { .. } => "rate_limit_error",
            ToolError::UpstreamServer { .. } => "upstream_server_error",
            ToolError::Network { .. } => "network_error",
            ToolError::UnexpectedResponse(_) => "unexpected_response_error",
            ToolError::SafetyLimitExceeded { .. } => "safety_limit_exceeded",
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::MissingApiKey => "missing_api_key",
            ToolError::Cancelled => "cancelled",
            ToolError::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller may retry the same call later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolError::RateLimit { .. } | ToolError::UpstreamServer { .. } | ToolError::Network { .. }
        )
    }

    /// What the caller should do next.
    pub fn guidance(&self) -> String {
        match self {
            ToolError::Authentication { .. } => {
                "Check that the API key is correct and has not been revoked.".to_string()
            }
            ToolError::Authorization { .. } => {
                "Use an API key with the scopes this action needs.".to_string()
            }
            ToolError::NotFound { .. } => {
                "Check the identifier. Use list_accounts or list_campaigns to find valid values."
                    .to_string()
            }
            ToolError::Validation(_) => {
                "Fix every listed field and call again. Nothing was sent upstream.".to_string()
            }
            ToolError::UpstreamValidation { .. } => {
                "Upstream rejected a request that passed local checks. Review the upstream \
                 message and body, adjust the input and retry."
                    .to_string()
            }
            ToolError::RateLimit { retry_after, .. } => match retry_after {
                Some(wait) => format!("Wait {} seconds and retry.", wait.as_secs().max(1)),
                None => "Wait a moment and retry.".to_string(),
            },
            ToolError::UpstreamServer { .. } | ToolError::Network { .. } => {
                "This is usually transient. Retry shortly.".to_string()
            }
            ToolError::UnexpectedResponse(_) => {
                "Upstream answered in a way this server does not handle. Report this if it persists."
                    .to_string()
            }
            ToolError::SafetyLimitExceeded { .. } => {
                "Lower the requested limit or raise pagination.max_pages in the configuration."
                    .to_string()
            }
            ToolError::InvalidArguments(_) => {
                "Check the arguments against the tool's input schema.".to_string()
            }
            ToolError::MissingApiKey => "Start the server with --api-key, or send an \
                 `Authorization: Bearer <api key>` header with each HTTP request."
                .to_string(),
            ToolError::Cancelled => "The call was cancelled before it finished.".to_string(),
            ToolError::Internal(_) => "This is a server bug. Report it with the server log.".to_string(),
        }
    }

    /// JSON error payload returned inside the tool result.
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "error": self.kind(),
            "message": self.to_string(),
            "guidance": self.guidance(),
            "retryable": self.is_retryable(),
        });
        let extra = match self {
            ToolError::Validation(failures) => json!({ "failures": failures }),
            ToolError::UpstreamValidation {
                status,
                body,
                upstream_message,
            } => json!({
                "status": status,
                "upstream_message": upstream_message,
                "upstream_body": body,
            }),
            ToolError::RateLimit {
                retry_after: Some(wait),
                ..
            } => json!({ "retry_after_seconds": wait.as_secs() }),
            ToolError::UpstreamServer { status, .. } => json!({ "status": status }),
            ToolError::SafetyLimitExceeded { pages, fetched } => {
                json!({ "pages_fetched": pages, "total_fetched": fetched })
            }
            _ => Value::Null,
        };
        if let (Some(target), Value::Object(extra)) = (payload.as_object_mut(), extra) {
            target.extend(extra);
        }
        payload
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Internal(format!("failed to serialize tool output: {err}"))
    }
}

impl From<RequestError> for ToolError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Authentication { message } => ToolError::Authentication { message },
            RequestError::Authorization { message } => ToolError::Authorization { message },
            RequestError::NotFound { path, message } => ToolError::NotFound {
                message: format!("{path}: {message}"),
            },
            RequestError::Validation {
                status,
                body,
                message,
            } => ToolError::UpstreamValidation {
                status,
                body,
                upstream_message: message,
            },
            RequestError::RateLimited {
                retry_after,
                message,
            } => ToolError::RateLimit {
                retry_after,
                message,
            },
            RequestError::Server { status, message } => {
                ToolError::UpstreamServer { status, message }
            }
            RequestError::UnexpectedStatus { status, message } => {
                ToolError::UnexpectedResponse(format!("status {status}: {message}"))
            }
            RequestError::Network { message, .. } => ToolError::Network { message },
            RequestError::Decode(message) => ToolError::UnexpectedResponse(message),
            RequestError::Cancelled => ToolError::Cancelled,
            RequestError::InvalidApiKey(message) => ToolError::Authentication { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidationFailure;

    #[test]
    fn test_upstream_400_keeps_message_and_body() {
        let err: ToolError = RequestError::Validation {
            status: 400,
            body: json!({"error": "sequences is required"}),
            message: "sequences is required".to_string(),
        }
        .into();

        let payload = err.to_payload();
        assert_eq!(payload["error"], "upstream_validation_error");
        assert_eq!(payload["upstream_message"], "sequences is required");
        assert_eq!(payload["upstream_body"]["error"], "sequences is required");
        assert_eq!(payload["retryable"], false);
        assert!(payload["message"].as_str().unwrap().contains("sequences is required"));
    }

    #[test]
    fn test_retryable_kinds() {
        let server: ToolError = RequestError::Server {
            status: 503,
            message: "down".to_string(),
        }
        .into();
        assert!(server.is_retryable());
        let network: ToolError = RequestError::Network {
            message: "refused".to_string(),
            source: None,
        }
        .into();
        assert!(network.is_retryable());
        assert!(!ToolError::MissingApiKey.is_retryable());
        assert!(!ToolError::Validation(vec![]).is_retryable());
    }

    #[test]
    fn test_unexpected_status_is_not_reported_as_validation() {
        let err: ToolError = RequestError::UnexpectedStatus {
            status: 409,
            message: "campaign name already taken".to_string(),
        }
        .into();
        let payload = err.to_payload();
        assert_eq!(payload["error"], "unexpected_response_error");
        assert!(
            payload["message"]
                .as_str()
                .unwrap()
                .contains("status 409: campaign name already taken")
        );
        assert!(!err.guidance().contains("passed local checks"));
    }

    #[test]
    fn test_validation_payload_lists_failures() {
        let err = ToolError::Validation(vec![ValidationFailure::missing_field("name")]);
        let payload = err.to_payload();
        assert_eq!(payload["failures"][0]["field"], "name");
        assert_eq!(payload["failures"][0]["reason"], "MissingRequiredField");
    }

    #[test]
    fn test_rate_limit_guidance_mentions_wait() {
        let err = ToolError::RateLimit {
            retry_after: Some(Duration::from_secs(12)),
            message: "slow down".to_string(),
        };
        assert_eq!(err.guidance(), "Wait 12 seconds and retry.");
        assert_eq!(err.to_payload()["retry_after_seconds"], 12);
    }
}
