//! stdio and streamable HTTP transports.

use std::sync::Arc;

use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;

use super::server::ChessMcpServer;
use crate::tools::ToolDispatcher;

/// Serve one MCP client over stdin/stdout until it disconnects.
pub async fn serve_stdio(dispatcher: Arc<ToolDispatcher>) -> anyhow::Result<()> {
    tracing::info!("Serving MCP over stdio");
    let service = ChessMcpServer::new(dispatcher).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Serve MCP over streamable HTTP at `/mcp` until ctrl-c.
///
/// Every HTTP session gets its own server instance; all of them share the
/// dispatcher, so analysis still goes through the single engine queue.
pub async fn serve_http(dispatcher: Arc<ToolDispatcher>, host: &str, port: u16) -> anyhow::Result<()> {
    let ct = tokio_util::sync::CancellationToken::new();

    let service = StreamableHttpService::new(
        move || Ok(ChessMcpServer::new(dispatcher.clone())),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: ct.child_token(),
            ..Default::default()
        },
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let addr = format!("{host}:{port}");
    let tcp_listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("MCP server listening on http://{}/mcp", addr);

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received ctrl-c, shutting down");
            ct.cancel();
        })
        .await?;

    Ok(())
}
