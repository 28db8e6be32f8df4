//! MCP server implementation.
//!
//! This module provides the main MCP server that handles tool discovery
//! and execution over stdio or HTTP.

use crate::error::McpError;
use crate::executor::{ExecutionContext, ToolExecutor};
use crate::http_transport::HttpServer;
use crate::protocol::*;
use crate::tools::ToolRegistry;
use outbound_core::{OutboundConfig, Transport};
use outbound_upstream::ApiKey;
use serde_json::{Value, json};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

static SHARED: OnceLock<Arc<McpServer>> = OnceLock::new();

/// The MCP server.
pub struct McpServer {
    config: Arc<OutboundConfig>,
    tools: &'static ToolRegistry,
    executor: ToolExecutor,
    /// Key for every stdio request. HTTP requests bring their own.
    default_api_key: Option<ApiKey>,
    shutdown: CancellationToken,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    pub fn new(config: OutboundConfig) -> Result<Self, McpError> {
        let tools = ToolRegistry::catalog();
        tools.verify()?;
        let config = Arc::new(config);
        Ok(Self {
            executor: ToolExecutor::new(config.clone())?,
            config,
            tools,
            default_api_key: None,
            shutdown: CancellationToken::new(),
        })
    }

    /// Set the API key used by the stdio transport.
    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.default_api_key = Some(api_key);
        self
    }

    /// The process-wide server, created on first use.
    ///
    /// Later calls return the first instance and ignore their arguments.
    pub fn shared(
        config: OutboundConfig,
        api_key: Option<ApiKey>,
    ) -> Result<Arc<McpServer>, McpError> {
        if let Some(server) = SHARED.get() {
            return Ok(server.clone());
        }
        let mut server = McpServer::new(config)?;
        if let Some(key) = api_key {
            server = server.with_api_key(key);
        }
        Ok(SHARED.get_or_init(|| Arc::new(server)).clone())
    }

    /// Cancelling this token stops the transports and every in-flight call.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Start the MCP server on the configured transport.
    pub async fn run(self: Arc<Self>) -> Result<(), McpError> {
        match self.config.mcp.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => self.run_http().await,
        }
    }

    /// Run the server with stdio transport.
    async fn run_stdio(self: Arc<Self>) -> Result<(), McpError> {
        tracing::info!(tools = self.tools.len(), "Starting MCP server with stdio transport");
        if self.default_api_key.is_none() {
            tracing::warn!("no API key configured; tool calls will fail until one is supplied");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            let line = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let context = self.stdio_context();
            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) if request.is_notification() => {
                    self.handle_notification(&request);
                    continue;
                }
                Ok(request) => self.handle_request(request, &context).await,
                Err(e) => JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e)),
            };

            let mut response_json = serde_json::to_string(&response)?;
            response_json.push('\n');
            stdout.write_all(response_json.as_bytes()).await?;
            stdout.flush().await?;
        }

        tracing::info!("MCP stdio transport stopped");
        Ok(())
    }

    /// Context for a request read from stdin.
    fn stdio_context(&self) -> RequestContext {
        RequestContext {
            api_key: self.default_api_key.clone(),
        }
    }

    /// Run the server with HTTP transport.
    async fn run_http(self: Arc<Self>) -> Result<(), McpError> {
        let address = self.config.mcp.bind_address();
        let shutdown = self.shutdown.clone();
        HttpServer::new(address, self).run(shutdown).await
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        context: &RequestContext,
    ) -> JsonRpcResponse {
        let id = request.id.clone();
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            );
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params, context).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    /// Notifications get no response.
    pub fn handle_notification(&self, request: &JsonRpcRequest) {
        tracing::debug!(method = %request.method, "notification received");
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "outbound-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let response = ListToolsResponse {
            tools: self.tools.list().into_iter().cloned().collect(),
        };
        match serde_json::to_value(response) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn handle_call_tool(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        context: &RequestContext,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e));
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let Some((kind, _)) = self.tools.get(&params.name) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Tool not found: {}", params.name),
            );
        };

        let execution = ExecutionContext::new(context.api_key.clone())
            .with_cancellation(self.shutdown.child_token());

        let result = self.executor.execute(kind, params.arguments, &execution).await;
        match serde_json::to_value(result.into_response()) {
            Ok(response) => JsonRpcResponse::success(id, response),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, json!(null))
    }
}
