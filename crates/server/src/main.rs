//! stalecache server entry point.
//!
//! Loads configuration, installs and activates the cache policy engine,
//! then serves it over MCP on stdio transport. Logging goes to stderr to
//! avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use stalecache_client::{FetchClient, FetchConfig, PolicyEngine};
use stalecache_core::{AppConfig, CacheDb};
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

    let config = AppConfig::load()?;
    let policy = config.policy()?;
    tracing::info!(version = %policy.version, origin = %policy.origin, "starting stalecache");

    let storage = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_app_config(&config))?;
    let engine = Arc::new(PolicyEngine::new(policy, storage, Arc::new(network)));

    let startup = engine.start().await?;
    if !startup.provision.is_complete() {
        tracing::warn!(failed = startup.provision.failed.len(), "some manifest assets were not provisioned");
    }

    tracing::info!("serving cache engine on stdio transport");

    let handler = handler::CacheServer::new(engine);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
