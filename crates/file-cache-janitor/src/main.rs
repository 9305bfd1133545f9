//! File cache janitor
//!
//! Keeps a file-cache directory bounded when no cache process is running:
//! sweeps expired files on the configured interval until interrupted.

mod error;

use crate::error::Result;
use file_cache::{CacheConfig, Sweeper};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("file_cache=info".parse()?)
        .add_directive("file_cache_janitor=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting file cache janitor...");

    // Load configuration from environment
    let config = CacheConfig::from_env()?;
    info!("Cache dir: {:?}", config.cache_dir);
    info!("TTL: {} ms", config.ttl.as_millis());
    info!("Cleanup interval: {} ms", config.cleanup_interval.as_millis());

    fs::create_dir_all(&config.cache_dir).await?;
    let sweeper = Sweeper::start(&config)?;

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, stopping");

    sweeper.shutdown().await;
    let stats = sweeper.stats().await;
    info!(
        sweeps = stats.sweeps,
        swept_files = stats.swept_files,
        "File cache janitor stopped"
    );

    Ok(())
}
