//! swcache MCP server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig, Registration, WorkerSettings};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        cache = %config.generation().store_name(),
        origin = %config.origin,
        "Starting swcache-mcp server on stdio transport"
    );

    let cache = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from_app(&config)?)?;
    let settings = WorkerSettings::from_config(&config)?;
    let registration = Arc::new(Registration::new(Arc::new(cache), Arc::new(network)));
    if registration.resume_active(settings.clone()).await?.is_none() {
        tracing::info!("no installed cache generation; call worker_install to precache");
    }

    let handler = handler::SwcacheServer::new(registration, settings);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
