//! YouTube Data API client for the `playlistItems.list` endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{ApiKey, Config};
use crate::error::{Result, StatsError};

/// Items requested per page (the API maximum)
pub const PAGE_SIZE: u32 = 50;

/// Only the snippet carries the description
const PART: &str = "snippet";

const LIST_RESPONSE_KIND: &str = "youtube#playlistItemListResponse";
const ITEM_KIND: &str = "youtube#playlistItem";

/// Response of `playlistItems.list`.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    pub kind: String,
    pub etag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub kind: String,
    pub etag: String,
    pub id: String,
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItemSnippet {
    pub description: String,
}

impl PlaylistItemListResponse {
    /// Parse and validate a response body
    pub fn from_json(body: &str) -> Result<Self> {
        let response: Self = serde_json::from_str(body)
            .map_err(|e| StatsError::InvalidResponse(format!("Malformed playlist page: {}", e)))?;
        response.validate()?;
        Ok(response)
    }

    /// Check the resource kind tags of the page and every item
    pub fn validate(&self) -> Result<()> {
        if self.kind != LIST_RESPONSE_KIND {
            return Err(StatsError::InvalidResponse(format!(
                "Unexpected response kind '{}', expected '{}'",
                self.kind, LIST_RESPONSE_KIND
            )));
        }

        if let Some(item) = self.items.iter().find(|item| item.kind != ITEM_KIND) {
            return Err(StatsError::InvalidResponse(format!(
                "Unexpected item kind '{}' for item {}, expected '{}'",
                item.kind, item.id, ITEM_KIND
            )));
        }

        Ok(())
    }
}

/// Query string of one `playlistItems.list` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsRequest<'a> {
    key: &'a str,
    part: &'a str,
    playlist_id: &'a str,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

/// Trait defining the upstream listing operation for easier testing
#[async_trait]
pub trait YouTubeClient: Send + Sync {
    /// Fetch one page of playlist items, starting after `page_token` if given
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> Result<PlaylistItemListResponse>;
}

/// Production client calling the YouTube Data API over HTTPS.
///
/// Timeouts are enforced per request by the underlying `reqwest` client and
/// surface as [`StatsError::NetworkError`]. No retries happen here.
pub struct ProductionYouTubeClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
}

impl ProductionYouTubeClient {
    /// Create a new production client
    ///
    /// # Arguments
    /// * `endpoint` - URL of the `playlistItems` resource
    /// * `api_key` - YouTube Data API key
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: impl Into<String>, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("youtube-stats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StatsError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.youtube.playlists_endpoint.clone(),
            config.youtube.api_key.clone(),
            Duration::from_secs(config.fetch.request_timeout_secs),
        )
    }
}

#[async_trait]
impl YouTubeClient for ProductionYouTubeClient {
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> Result<PlaylistItemListResponse> {
        let request = PlaylistItemsRequest {
            key: self.api_key.expose(),
            part: PART,
            playlist_id,
            max_results: PAGE_SIZE,
            page_token: page_token.as_deref(),
        };

        debug!(
            "Requesting playlist {} page (token: {:?})",
            playlist_id, page_token
        );

        let response = self.http.get(&self.endpoint).query(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string());
            let body = response.text().await.unwrap_or_default();
            return Err(StatsError::from_status(
                status.as_u16(),
                retry_after.as_deref(),
                &body,
            ));
        }

        let body = response.text().await?;
        PlaylistItemListResponse::from_json(&body)
    }
}
