//! Command-line surface for `swcache`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "swcache", version, about = "Drive the offline cache worker from the shell", long_about = None)]
pub struct Cli {
    /// TOML config file (overrides SWCACHE_CONFIG_FILE)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Cache database path (overrides the configured db_path)
    #[arg(long, env = "SWCACHE_DB_PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Precache the manifest into a new cache generation
    Install {
        /// Cache version to install instead of the configured one
        #[arg(long = "cache-version")]
        version: Option<String>,
    },
    /// Activate an installed generation, deleting stale ones
    Activate {
        #[arg(long = "cache-version")]
        version: Option<String>,
    },
    /// Fetch a URL through the worker
    Fetch {
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Accept header; include text/html to request a document
        #[arg(long)]
        accept: Option<String>,
    },
    /// List cache stores
    Stores {
        /// Print every entry URL
        #[arg(long)]
        urls: bool,
    },
    /// Delete one store, or every store
    Clear {
        #[arg(long)]
        store: Option<String>,
    },
}
