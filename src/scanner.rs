//! Playlist scanner: fetches pages of playlist items, classifies them and
//! exhausts the listing by following continuation tokens

use async_stream::try_stream;
use futures::stream::{Stream, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{Classifier, RuleSet};
use crate::client::YouTubeClient;
use crate::config::Config;
use crate::error::{Result, StatsError};
use crate::models::{Page, Video};

/// Stream of classified pages in fetch order
pub type PageStream<'a> = Pin<Box<dyn Stream<Item = Result<Page>> + Send + 'a>>;

/// Scanner for one playlist
pub struct PlaylistScanner {
    client: Box<dyn YouTubeClient>,
    classifier: Classifier,
    playlist_id: String,
    max_pages: usize,
}

impl PlaylistScanner {
    /// Create a scanner
    ///
    /// # Arguments
    /// * `client` - Upstream listing client
    /// * `classifier` - Classifier applied to every item description
    /// * `playlist_id` - Playlist to scan
    /// * `max_pages` - Number of pages after which a still-continuing listing is an error
    pub fn new(
        client: Box<dyn YouTubeClient>,
        classifier: Classifier,
        playlist_id: impl Into<String>,
        max_pages: usize,
    ) -> Self {
        Self {
            client,
            classifier,
            playlist_id: playlist_id.into(),
            max_pages,
        }
    }

    /// Create a scanner for the configured channel's uploads playlist
    pub fn from_config(client: Box<dyn YouTubeClient>, config: &Config) -> Result<Self> {
        let rules = RuleSet::from_patterns(&config.youtube.category_patterns)?;
        Ok(Self::new(
            client,
            Classifier::new(Arc::new(rules)),
            config.youtube.playlist_id(),
            config.fetch.max_pages,
        ))
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    /// Fetch and classify a single page
    pub async fn fetch_page(&self, page_token: Option<String>) -> Result<Page> {
        let response = self
            .client
            .list_playlist_items(&self.playlist_id, page_token)
            .await?;

        let videos = response
            .items
            .into_iter()
            .map(|item| Video {
                categories: self.classifier.classify(&item.snippet.description),
                id: item.id,
            })
            .collect();

        // An empty token cannot be sent back, treat it as the last page
        let next_page_token = response.next_page_token.filter(|t| !t.is_empty());

        Ok(Page {
            videos,
            next_page_token,
        })
    }

    /// Stream pages until one comes back without a continuation token.
    ///
    /// Ends with [`StatsError::PaginationLimitExceeded`] if a page past
    /// `max_pages` would be needed. Dropping the stream stops further requests.
    pub fn pages(&self) -> PageStream<'_> {
        Box::pin(try_stream! {
            let mut page_token: Option<String> = None;
            let mut fetched = 0usize;

            loop {
                if fetched >= self.max_pages {
                    warn!(
                        "Playlist {} still has pages after {} requests, giving up",
                        self.playlist_id, fetched
                    );
                    Err(StatsError::PaginationLimitExceeded {
                        max_pages: self.max_pages,
                    })?;
                }

                let page = self.fetch_page(page_token.take()).await?;
                fetched += 1;

                debug!(
                    "Fetched page {} with {} videos (next token: {:?})",
                    fetched,
                    page.videos.len(),
                    page.next_page_token
                );

                let next_page_token = page.next_page_token.clone();
                yield page;

                match next_page_token {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }
        })
    }

    /// Fetch every video of the playlist, in page order
    pub async fn fetch_all(&self) -> Result<Vec<Video>> {
        let run_id = Uuid::new_v4();
        info!("Scanning playlist {} (run {})", self.playlist_id, run_id);

        let mut pages = self.pages();
        let mut videos = Vec::new();
        let mut page_count = 0usize;

        while let Some(page) = pages.try_next().await.map_err(|e| {
            warn!("Scan of playlist {} failed (run {}): {}", self.playlist_id, run_id, e);
            e
        })? {
            page_count += 1;
            videos.extend(page.videos);
        }

        info!(
            "Scan complete (run {}): {} videos from {} pages",
            run_id,
            videos.len(),
            page_count
        );
        Ok(videos)
    }
}
