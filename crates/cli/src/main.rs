//! swcache: one-shot commands against the offline cache worker.
//!
//! Reports go to stdout as JSON; logs go to stderr (`RUST_LOG` controls them).

mod args;
mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use swcache_client::{FetchClient, FetchConfig, Registration, WorkerSettings};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};

fn print<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_with(Some(path)),
        None => AppConfig::load(),
    }
    .context("loading configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let cache = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from_app(&config)?)?;
    let settings = WorkerSettings::from_config(&config)?;
    let registration = Registration::new(Arc::new(cache), Arc::new(network));

    match cli.command {
        Commands::Install { version } => {
            print(&commands::install(&registration, commands::with_version(settings, version)).await?)?
        }
        Commands::Activate { version } => {
            print(&commands::activate(&registration, commands::with_version(settings, version)).await?)?
        }
        Commands::Fetch { url, method, accept } => {
            print(&commands::fetch(&registration, settings, &url, &method, accept.as_deref()).await?)?
        }
        Commands::Stores { urls } => print(&commands::stores(&registration, urls).await?)?,
        Commands::Clear { store } => print(&commands::clear(&registration, store).await?)?,
    }

    Ok(())
}
