//! YouTube Channel Statistics
//!
//! Scans the uploads playlist of a YouTube channel, classifies every video by
//! regex rules over its description and reports how many videos fall into
//! each category.
//!
//! # Overview
//!
//! - **Fetching**: `playlistItems.list` pages followed through continuation
//!   tokens, strictly one request at a time
//! - **Classification**: ordered rules where the bulk category `m` (meaning
//!   both `mp` and `mr`) short-circuits once anything has matched
//! - **Aggregation**: per-category counts, sparse or dense
//! - **Presentation**: a JSON HTTP service with a TTL cache, and a one-shot
//!   exporter writing `{"videoCount": {...}}` for the front end
//!
//! # Example Usage
//!
//! ```no_run
//! use youtube_stats::{config::Config, stats::StatsCollector};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("statistics.toml".as_ref()).await?;
//!
//!     let collector = StatsCollector::from_config(&config, false)?;
//!     let stats = collector.collect().await?;
//!
//!     for (category, count) in stats.iter() {
//!         println!("{}: {}", category, count);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`cache`] - TTL cache with single-flight aggregation runs
//! - [`classifier`] - Rule set and description classifier
//! - [`cli`] - Command-line interface and command runners
//! - [`client`] - YouTube Data API client and wire types
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`export`] - Statistics file for the front end
//! - [`models`] - Categories, category sets and videos
//! - [`scanner`] - Playlist pagination
//! - [`server`] - HTTP service
//! - [`stats`] - Aggregation and the collection pipeline

pub mod cache;
pub mod classifier;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod scanner;
pub mod server;
pub mod stats;

// Re-export commonly used types for convenience
pub use error::{Result, StatsError};

// Core data models
pub use models::{Category, CategorySet, Page, Video};

// Classifier types
pub use classifier::{Classifier, Rule, RuleSet};

// Client traits
pub use client::{PlaylistItemListResponse, ProductionYouTubeClient, YouTubeClient};

// Config types
pub use config::{CacheConfig, Config, FetchConfig, ReportConfig, ServerConfig, YouTubeConfig};

// Pipeline
pub use cache::StatsCache;
pub use export::Statistics;
pub use scanner::PlaylistScanner;
pub use stats::{aggregate, StatsCollector, StatsTable};

// CLI types (for binary usage)
pub use cli::{Cli, Commands};
