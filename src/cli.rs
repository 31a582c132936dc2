//! Command-line interface

use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, StatsError};
use crate::export::Statistics;
use crate::server;
use crate::stats::{StatsCollector, StatsTable};

#[derive(Parser, Debug)]
#[command(name = "youtube-stats")]
#[command(version)]
#[command(about = "Per-category video statistics for a YouTube channel", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "statistics.toml")]
    pub config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the channel once and write the statistics file
    Export {
        /// Output path (overrides export.out_file)
        #[arg(short, long)]
        out_file: Option<PathBuf>,
    },

    /// Serve statistics over HTTP until interrupted
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Scan the channel once and print the statistics
    Stats {
        /// Category name or code; all categories when omitted
        category: Option<String>,
    },

    /// Create an example configuration file
    InitConfig {
        /// Output path for config file
        #[arg(short, long, default_value = "statistics.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run one aggregation and write the statistics artifact
///
/// Returns the path written and the exported statistics.
pub async fn run_export(
    config: &Config,
    out_file: Option<PathBuf>,
) -> Result<(PathBuf, Statistics)> {
    let path = out_file.unwrap_or_else(|| config.export.out_file.clone());

    let collector = StatsCollector::from_config(config, false)?;
    let statistics = Statistics::new(collector.collect().await?);
    statistics.write(&path).await?;

    Ok((path, statistics))
}

/// Run one aggregation and render it for the terminal
pub async fn run_stats(config: &Config, category: Option<&str>) -> Result<String> {
    let collector = StatsCollector::from_config(config, false)?;

    match category {
        Some(category) => Ok(collector.lookup(category).await?.to_string()),
        None => Ok(format_table(&collector.collect().await?)),
    }
}

/// Serve statistics until `shutdown` resolves
pub async fn run_serve<F>(config: &Config, bind: Option<String>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let mut server_config = config.server.clone();
    if let Some(bind) = bind {
        server_config.bind = bind;
    }
    let addr = server_config.bind_addr()?;

    let collector = Arc::new(StatsCollector::from_config(config, true)?);
    info!("Statistics cached for {} seconds", config.cache.ttl_secs);

    let listener = TcpListener::bind(addr).await?;
    server::serve(listener, collector, shutdown).await
}

/// Write an example configuration, refusing to replace an existing file unless forced
pub async fn run_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(StatsError::ConfigError(format!(
            "{:?} already exists, use --force to overwrite",
            output
        )));
    }

    Config::create_example(output).await
}

/// One `name: count` line per category
pub fn format_table(table: &StatsTable) -> String {
    if table.is_empty() {
        return "No categorized videos".to_string();
    }

    table
        .iter()
        .map(|(category, count)| format!("{}: {}", category, count))
        .collect::<Vec<_>>()
        .join("\n")
}
