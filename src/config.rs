use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::classifier::RuleSet;
use crate::error::{Result, StatsError};

/// Prefix of channel ids that have a matching uploads playlist
pub const CHANNEL_PREFIX: &str = "UC";
/// Prefix of a channel's uploads playlist id
pub const PLAYLIST_PREFIX: &str = "UU";

/// Prefix for environment variable overrides
const ENV_PREFIX: &str = "YOUTUBE_";

/// Dotenv file consulted by [`Config::load`], relative to the working directory
pub const DOTENV_FILE: &str = ".env";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub api_key: ApiKey,
    #[serde(default = "default_playlists_endpoint")]
    pub playlists_endpoint: String,
    #[serde(default)]
    pub category_patterns: CategoryPatterns,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            api_key: ApiKey::default(),
            playlists_endpoint: default_playlists_endpoint(),
            category_patterns: CategoryPatterns::default(),
        }
    }
}

impl YouTubeConfig {
    /// Uploads playlist id derived from the channel id.
    ///
    /// A channel id starting with `UC` maps to the playlist `UU...`; any other
    /// id is used as a playlist id unchanged.
    pub fn playlist_id(&self) -> String {
        match self.channel_id.strip_prefix(CHANNEL_PREFIX) {
            Some(id_part) => format!("{}{}", PLAYLIST_PREFIX, id_part),
            None => self.channel_id.clone(),
        }
    }
}

/// YouTube Data API key. Never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(\"\")")
        } else {
            f.write_str("ApiKey(\"**********\")")
        }
    }
}

/// Ordered `category name -> regex` table.
///
/// Kept as a list of pairs so the TOML declaration order survives loading;
/// rule order decides when the bulk category is evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatterns(Vec<(String, String)>);

impl CategoryPatterns {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, p)| (c.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CategoryPatterns {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, pattern) in &self.0 {
            map.serialize_entry(category, pattern)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryPatterns {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PatternsVisitor;

        impl<'de> Visitor<'de> for PatternsVisitor {
            type Value = CategoryPatterns;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of category names to regex patterns")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((category, pattern)) = access.next_entry::<String, String>()? {
                    entries.push((category, pattern));
                }
                Ok(CategoryPatterns(entries))
            }
        }

        deserializer.deserialize_map(PatternsVisitor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind.parse().map_err(|e| {
            StatsError::ConfigError(format!("Invalid server.bind '{}': {}", self.bind, e))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportConfig {
    /// Report never-matched categories with a zero count
    #[serde(default)]
    pub dense: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_out_file")]
    pub out_file: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_file: default_out_file(),
        }
    }
}

fn default_playlists_endpoint() -> String {
    "https://www.googleapis.com/youtube/v3/playlistItems".to_string()
}

fn default_max_pages() -> usize {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_out_file() -> PathBuf {
    PathBuf::from("front/src/lib/statistics.json")
}

/// Read the `YOUTUBE_*` entries of a dotenv file without touching the
/// process environment
fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => {
            return Err(StatsError::ConfigError(format!(
                "Failed to read {:?}: {}",
                path, e
            )))
        }
    };

    let mut vars = HashMap::new();
    for entry in entries {
        let (key, value) = entry.map_err(|e| {
            StatsError::ConfigError(format!("Failed to parse {:?}: {}", path, e))
        })?;
        if key.starts_with(ENV_PREFIX) {
            vars.insert(key, value);
        }
    }

    tracing::debug!("Read {} settings from {:?}", vars.len(), path);
    Ok(vars)
}

impl Config {
    /// Load configuration from a TOML file, then apply `YOUTUBE_*` overrides
    /// from `.env` and the environment and validate the result.
    pub async fn load(path: &Path) -> Result<Self> {
        Self::load_with_dotenv(path, Path::new(DOTENV_FILE)).await
    }

    /// Like [`Config::load`], reading dotenv settings from `dotenv`.
    ///
    /// Precedence, lowest first: defaults, the TOML file, the dotenv file,
    /// process environment variables. A missing dotenv file is ignored.
    pub async fn load_with_dotenv(path: &Path, dotenv: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                StatsError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                StatsError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::warn!(
                "Config file not found at {:?}, using defaults and environment",
                path
            );
            Self::default()
        };

        let dotenv_vars = read_dotenv(dotenv)?;
        config.apply_env_overrides(&dotenv_vars);
        config.validate()?;
        Ok(config)
    }

    /// Override connection settings from `YOUTUBE_CHANNEL_ID`,
    /// `YOUTUBE_API_KEY` and `YOUTUBE_PLAYLISTS_ENDPOINT`.
    ///
    /// `dotenv_vars` is consulted when the process environment lacks a value.
    pub fn apply_env_overrides(&mut self, dotenv_vars: &HashMap<String, String>) {
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            std::env::var(&key)
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| dotenv_vars.get(&key).filter(|v| !v.is_empty()).cloned())
        };

        if let Some(channel_id) = var("CHANNEL_ID") {
            self.youtube.channel_id = channel_id;
        }
        if let Some(api_key) = var("API_KEY") {
            self.youtube.api_key = ApiKey::new(api_key);
        }
        if let Some(endpoint) = var("PLAYLISTS_ENDPOINT") {
            self.youtube.playlists_endpoint = endpoint;
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StatsError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| StatsError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| StatsError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.youtube.channel_id.trim().is_empty() {
            return Err(StatsError::ConfigError(
                "youtube.channel_id is required".to_string(),
            ));
        }

        if self.youtube.api_key.is_empty() {
            return Err(StatsError::ConfigError(
                "youtube.api_key is required".to_string(),
            ));
        }

        reqwest::Url::parse(&self.youtube.playlists_endpoint).map_err(|e| {
            StatsError::ConfigError(format!(
                "Invalid youtube.playlists_endpoint '{}': {}",
                self.youtube.playlists_endpoint, e
            ))
        })?;

        // Compiles every pattern and checks category names
        RuleSet::from_patterns(&self.youtube.category_patterns)?;

        if self.fetch.max_pages == 0 {
            return Err(StatsError::ConfigError(
                "fetch.max_pages must be at least 1".to_string(),
            ));
        }

        if self.fetch.request_timeout_secs == 0 {
            return Err(StatsError::ConfigError(
                "fetch.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl_secs == 0 {
            return Err(StatsError::ConfigError(
                "cache.ttl_secs must be greater than 0".to_string(),
            ));
        }

        self.server.bind_addr()?;

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Configuration written by `init-config`
    pub fn example() -> Self {
        let mut config = Self::default();
        config.youtube.channel_id = "UCxxxxxxxxxxxxxxxxxxxxxx".to_string();
        config.youtube.api_key = ApiKey::new("your-api-key");
        config.youtube.category_patterns = CategoryPatterns::new(vec![
            ("m".to_string(), r"(?i)#m\b".to_string()),
            ("e8".to_string(), r"(?i)#e8\b".to_string()),
            ("mp".to_string(), r"(?i)#mp\b".to_string()),
            ("mr".to_string(), r"(?i)#mr\b".to_string()),
        ]);
        config
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::example().save(path).await
    }
}
