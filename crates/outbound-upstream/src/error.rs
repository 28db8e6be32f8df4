//! Error types for upstream requests.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Classified failure of a single upstream request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// 401: the API key was rejected.
    #[error("upstream rejected the API key (401): {message}")]
    Authentication { message: String },

    /// 403: the key is valid but lacks permission.
    #[error("API key is not permitted to perform this action (403): {message}")]
    Authorization { message: String },

    /// 404: the addressed resource does not exist.
    #[error("upstream resource not found (404): {path}")]
    NotFound { path: String, message: String },

    /// 400 / 422: upstream rejected the request body or parameters.
    #[error("upstream rejected the request ({status}): {message}")]
    Validation {
        status: u16,
        /// Upstream response body, verbatim.
        body: Value,
        message: String,
    },

    /// 429: quota exhausted.
    #[error("upstream rate limit exceeded (429): {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    /// 5xx.
    #[error("upstream server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status.
    #[error("unexpected upstream status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// No HTTP response was received.
    #[error("could not reach upstream: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A success response whose body could not be decoded.
    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    /// The invocation was cancelled before the request completed.
    #[error("upstream request cancelled")]
    Cancelled,

    /// The API key cannot be sent as an HTTP header.
    #[error("invalid API key: {0}")]
    InvalidApiKey(String),
}

impl RequestError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RequestError::RateLimited { .. }
                | RequestError::Server { .. }
                | RequestError::Network { .. }
        )
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Authentication { .. } => Some(401),
            RequestError::Authorization { .. } => Some(403),
            RequestError::NotFound { .. } => Some(404),
            RequestError::Validation { status, .. }
            | RequestError::Server { status, .. }
            | RequestError::UnexpectedStatus { status, .. } => Some(*status),
            RequestError::RateLimited { .. } => Some(429),
            RequestError::Network { .. }
            | RequestError::Decode(_)
            | RequestError::Cancelled
            | RequestError::InvalidApiKey(_) => None,
        }
    }

    /// Classify a non-success response.
    pub(crate) fn from_status(
        status: u16,
        path: &str,
        body: Value,
        retry_after: Option<Duration>,
    ) -> Self {
        let message = upstream_message(&body);
        match status {
            401 => RequestError::Authentication { message },
            403 => RequestError::Authorization { message },
            404 => RequestError::NotFound {
                path: path.to_string(),
                message,
            },
            400 | 422 => RequestError::Validation {
                status,
                body,
                message,
            },
            429 => RequestError::RateLimited {
                retry_after,
                message,
            },
            500..=599 => RequestError::Server { status, message },
            _ => RequestError::UnexpectedStatus { status, message },
        }
    }
}

/// Extract the most specific human-readable message from an error body.
///
/// Upstream uses `error` or `message` at the top level; anything else is
/// echoed as compact JSON.
pub fn upstream_message(body: &Value) -> String {
    for key in ["error", "message"] {
        match body.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Object(inner)) => {
                if let Some(Value::String(s)) = inner.get("message") {
                    return s.clone();
                }
            }
            _ => {}
        }
    }
    match body {
        Value::String(s) => s.clone(),
        Value::Null => "no response body".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upstream_message_extraction() {
        assert_eq!(
            upstream_message(&json!({"error": "sequences is required"})),
            "sequences is required"
        );
        assert_eq!(
            upstream_message(&json!({"message": "Bad timezone", "statusCode": 400})),
            "Bad timezone"
        );
        assert_eq!(
            upstream_message(&json!({"error": {"message": "nested"}})),
            "nested"
        );
        assert_eq!(upstream_message(&Value::Null), "no response body");
        assert_eq!(upstream_message(&json!({"x": 1})), r#"{"x":1}"#);
    }

    #[test]
    fn test_classification() {
        let err = RequestError::from_status(400, "/campaigns", json!({"error": "nope"}), None);
        assert!(matches!(err, RequestError::Validation { status: 400, .. }));
        assert!(!err.is_retryable());

        let err = RequestError::from_status(503, "/accounts", Value::Null, None);
        assert!(matches!(err, RequestError::Server { status: 503, .. }));
        assert!(err.is_retryable());

        let err = RequestError::from_status(
            429,
            "/accounts",
            Value::Null,
            Some(Duration::from_secs(2)),
        );
        assert!(matches!(
            err,
            RequestError::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(2)
        ));

        let err = RequestError::from_status(409, "/campaigns", Value::Null, None);
        assert_eq!(err.status(), Some(409));
        let err = RequestError::Network {
            message: "refused".to_string(),
            source: None,
        };
        assert!(err.status().is_none());
    }
}
