use extension_search::{Config, ExtensionServer, IndexState, spawn_background_refresher};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the MCP protocol
    extension_search::tracing::init();

    let config = Config::load()?;
    let source = config.source()?;
    tracing::info!("Starting extension-search MCP server (registry: {})", source.describe());

    let state = Arc::new(
        IndexState::new(source, config.extract_options())
            .with_result_limit(config.result_limit())
            .with_cache_size(config.query_cache_size),
    );

    // Initial build runs in the background so the server answers immediately
    let initial = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = initial.initialize().await {
            tracing::error!("Initial index build failed: {}", e);
        }
    });

    let cancel = CancellationToken::new();
    let refresher = config
        .refresh_interval()
        .map(|period| spawn_background_refresher(Arc::clone(&state), period, cancel.clone()));

    let server = ExtensionServer::new(state, &config.explorer_url);
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;

    service.waiting().await?;

    cancel.cancel();
    if let Some(handle) = refresher
        && let Err(e) = handle.await
    {
        tracing::warn!("Background refresher task failed: {}", e);
    }

    Ok(())
}
