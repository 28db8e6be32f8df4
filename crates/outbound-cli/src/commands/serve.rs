//! `outbound serve` command implementation.

use anyhow::{Context, Result};
use outbound_core::Transport;
use outbound_mcp::McpServer;
use outbound_upstream::ApiKey;
use std::path::PathBuf;
use tracing::info;

/// Flags accepted by `outbound serve`. `None` keeps the configured value.
#[derive(Debug)]
pub struct ServeOptions {
    pub config_path: PathBuf,
    pub api_key: Option<String>,
    pub transport: Option<Transport>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

pub async fn run(options: ServeOptions) -> Result<()> {
    let mut config = super::load_config(&options.config_path)?;

    if let Some(transport) = options.transport {
        config.mcp.transport = transport;
    }
    if let Some(host) = options.host {
        config.mcp.host = host;
    }
    if let Some(port) = options.port {
        config.mcp.port = port;
    }

    let api_key = options
        .api_key
        .map(ApiKey::new)
        .transpose()
        .context("Invalid --api-key")?;

    match config.mcp.transport {
        Transport::Stdio if api_key.is_none() => {
            anyhow::bail!("--api-key is required for the stdio transport");
        }
        Transport::Http if api_key.is_some() => {
            anyhow::bail!(
                "--api-key cannot be used with the http transport; \
                 each HTTP request must send its own `Authorization: Bearer` key"
            );
        }
        _ => {}
    }

    info!(
        transport = ?config.mcp.transport,
        upstream = %config.upstream.base_url,
        "starting outbound MCP server"
    );

    let server = McpServer::shared(config, api_key).context("Failed to start MCP server")?;

    let shutdown = server.shutdown_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    server.run().await.context("MCP server stopped with an error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(transport: Transport, api_key: Option<&str>) -> ServeOptions {
        ServeOptions {
            config_path: PathBuf::from("does-not-exist/outbound.yaml"),
            api_key: api_key.map(str::to_string),
            transport: Some(transport),
            host: None,
            port: None,
        }
    }

    #[tokio::test]
    async fn test_http_rejects_process_api_key() {
        let err = run(options(Transport::Http, Some("operator-secret")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--api-key cannot be used"));
    }

    #[tokio::test]
    async fn test_stdio_requires_api_key() {
        let err = run(options(Transport::Stdio, None)).await.unwrap_err();
        assert!(err.to_string().contains("required for the stdio transport"));
    }
}
