//! Bearer-authenticated HTTP client for the upstream REST API.
//!
//! One [`UpstreamClient`] is built per tool invocation around a shared
//! `reqwest::Client` (connection pooling is the transport's concern). The
//! API key lives on the per-invocation value and rate-limit state travels
//! on each [`ParsedResponse`], so concurrent invocations share no mutable
//! state.

use crate::error::RequestError;
use chrono::{DateTime, TimeZone, Utc};
use outbound_core::UpstreamConfig;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Upstream API key, forwarded verbatim as the bearer credential.
///
/// `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key, rejecting values that cannot travel in a header.
    pub fn new(raw: impl Into<String>) -> Result<Self, RequestError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RequestError::InvalidApiKey("API key is empty".to_string()));
        }
        HeaderValue::from_str(&format!("Bearer {trimmed}"))
            .map_err(|_| RequestError::InvalidApiKey("API key contains invalid characters".to_string()))?;
        Ok(Self(trimmed.to_string()))
    }

    fn bearer(&self) -> Result<HeaderValue, RequestError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
            .map_err(|_| RequestError::InvalidApiKey("API key contains invalid characters".to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Rate-limit state reported by one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    /// Requests left in the current window.
    pub remaining: Option<u64>,
    /// When the window resets.
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    /// How long to wait before the next request, if the quota is spent.
    pub fn wait_hint(&self, now: DateTime<Utc>) -> Option<Duration> {
        match (self.remaining, self.reset_at) {
            (Some(0), Some(reset_at)) if reset_at > now => (reset_at - now).to_std().ok(),
            _ => None,
        }
    }

    fn from_headers(headers: &HeaderMap, config: &UpstreamConfig) -> Self {
        let remaining = header_str(headers, &config.rate_limit_remaining_header)
            .and_then(|v| v.trim().parse::<u64>().ok());
        let reset_at = header_str(headers, &config.rate_limit_reset_header)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        Self {
            remaining,
            reset_at,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// A successful upstream response.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` for empty bodies.
    pub body: Value,
    pub rate_limit: RateLimitInfo,
}

/// One request to send upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Per-invocation upstream client.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    config: Arc<UpstreamConfig>,
    api_key: ApiKey,
    cancel: CancellationToken,
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}

impl UpstreamClient {
    /// Build the shared transport for a configuration.
    pub fn build_http(config: &UpstreamConfig) -> Result<reqwest::Client, RequestError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("outbound/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RequestError::Network {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(e),
            })
    }

    /// Create a client with its own transport.
    pub fn new(config: UpstreamConfig, api_key: ApiKey) -> Result<Self, RequestError> {
        let http = Self::build_http(&config)?;
        Ok(Self::with_http(http, Arc::new(config), api_key))
    }

    /// Create a client on top of an existing transport.
    pub fn with_http(http: reqwest::Client, config: Arc<UpstreamConfig>, api_key: ApiKey) -> Self {
        Self {
            http,
            config,
            api_key,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach the invocation's cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn get(&self, path: &str) -> Result<ParsedResponse, RequestError> {
        self.send(UpstreamRequest::get(path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<ParsedResponse, RequestError> {
        self.send(UpstreamRequest::post(path).json(body)).await
    }

    /// Send a request and classify the outcome.
    pub async fn send(&self, request: UpstreamRequest) -> Result<ParsedResponse, RequestError> {
        let url = self.config.url_for(&request.path);
        debug!(method = %request.method, path = %request.path, "upstream request");

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, self.api_key.bearer()?);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(RequestError::Cancelled),
            result = builder.send() => result.map_err(|e| {
                warn!(method = %request.method, path = %request.path, error = %e, "upstream unreachable");
                RequestError::Network {
                    message: e.to_string(),
                    source: Some(e),
                }
            })?,
        };

        let status = response.status().as_u16();
        let rate_limit = RateLimitInfo::from_headers(response.headers(), &self.config);
        let retry_after = header_str(response.headers(), &self.config.retry_after_header)
            .and_then(|v| parse_retry_after(v, Utc::now()));

        let text = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(RequestError::Cancelled),
            result = response.text() => result.map_err(|e| RequestError::Network {
                message: format!("failed to read response body: {e}"),
                source: Some(e),
            })?,
        };
        let body = parse_body(&text);

        debug!(
            method = %request.method,
            path = %request.path,
            status,
            remaining = ?rate_limit.remaining,
            "upstream response"
        );

        if (200..300).contains(&status) {
            return Ok(ParsedResponse {
                status,
                body,
                rate_limit,
            });
        }

        let error = RequestError::from_status(status, &request.path, body, retry_after);
        warn!(method = %request.method, path = %request.path, status, error = %error, "upstream request failed");
        Err(error)
    }
}

/// `Retry-After` is either delay-seconds or an HTTP-date.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Decode a response body, keeping non-JSON text as a string value.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> UpstreamClient {
        let config = UpstreamConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            ..Default::default()
        };
        UpstreamClient::new(config, ApiKey::new("test-key").unwrap()).unwrap()
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("super-secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(ApiKey::new("   ").is_err());
        assert!(ApiKey::new("bad\nkey").is_err());
    }

    #[test]
    fn test_wait_hint_only_when_quota_spent() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let spent = RateLimitInfo {
            remaining: Some(0),
            reset_at: Some(Utc.timestamp_opt(1_005, 0).unwrap()),
        };
        assert_eq!(spent.wait_hint(now), Some(Duration::from_secs(5)));

        let available = RateLimitInfo {
            remaining: Some(3),
            ..spent
        };
        assert_eq!(available.wait_hint(now), None);

        let already_reset = RateLimitInfo {
            remaining: Some(0),
            reset_at: Some(Utc.timestamp_opt(900, 0).unwrap()),
        };
        assert_eq!(already_reset.wait_hint(now), None);
    }

    #[test]
    fn test_retry_after_forms() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parse_retry_after(" 12 ", now), Some(Duration::from_secs(12)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[tokio::test]
    async fn test_attaches_bearer_and_parses_rate_limit_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts"))
            .and(header("authorization", "Bearer test-key"))
            .and(query_param("limit", "10"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-ratelimit-remaining", "42")
                    .insert_header("x-ratelimit-reset", "1700000000")
                    .set_body_json(json!({"items": []})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client
            .send(UpstreamRequest::get("/accounts").query("limit", 10))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.rate_limit.remaining, Some(42));
        assert_eq!(
            response.rate_limit.reset_at,
            Utc.timestamp_opt(1_700_000_000, 0).single()
        );
    }

    #[tokio::test]
    async fn test_classifies_error_statuses() {
        let server = MockServer::start().await;
        let cases = [
            ("/unauthorized", 401),
            ("/forbidden", 403),
            ("/missing", 404),
            ("/invalid", 400),
            ("/limited", 429),
            ("/broken", 502),
        ];
        for (route, status) in cases {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(
                    ResponseTemplate::new(status)
                        .insert_header("retry-after", "7")
                        .set_body_json(json!({"error": format!("status {status}")})),
                )
                .mount(&server)
                .await;
        }

        let client = test_client(&server.uri());

        assert!(matches!(
            client.get("/unauthorized").await,
            Err(RequestError::Authentication { .. })
        ));
        assert!(matches!(
            client.get("/forbidden").await,
            Err(RequestError::Authorization { .. })
        ));
        assert!(matches!(
            client.get("/missing").await,
            Err(RequestError::NotFound { .. })
        ));
        match client.get("/invalid").await {
            Err(RequestError::Validation { status, body, message }) => {
                assert_eq!(status, 400);
                assert_eq!(body, json!({"error": "status 400"}));
                assert_eq!(message, "status 400");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(matches!(
            client.get("/limited").await,
            Err(RequestError::RateLimited { retry_after: Some(d), .. }) if d == Duration::from_secs(7)
        ));
        assert!(matches!(
            client.get("/broken").await,
            Err(RequestError::Server { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/campaigns"))
            .and(wiremock::matchers::body_json(json!({"name": "Launch"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cmp_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client.post("/campaigns", json!({"name": "Launch"})).await.unwrap();
        assert_eq!(response.body["id"], "cmp_1");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let client = test_client("http://127.0.0.1:9");
        let err = client.get("/accounts").await.unwrap_err();
        assert!(matches!(err, RequestError::Network { .. }));
        assert!(err.is_retryable());
        assert!(err.status().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let server = MockServer::start().await;
        let token = CancellationToken::new();
        token.cancel();
        let client = test_client(&server.uri()).with_cancellation(token);
        assert!(matches!(
            client.get("/accounts").await,
            Err(RequestError::Cancelled)
        ));
    }
}
