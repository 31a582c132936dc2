//! Per-category video counts

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::cache::StatsCache;
use crate::client::{ProductionYouTubeClient, YouTubeClient};
use crate::config::Config;
use crate::error::{Result, StatsError};
use crate::models::{Category, Video};
use crate::scanner::PlaylistScanner;

/// Number of videos per category for one aggregation run.
///
/// Sparse unless made [`dense`](StatsTable::dense): categories no video
/// matched are absent. Serializes as a `name -> count` object in category
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsTable {
    counts: BTreeMap<Category, u64>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every category of every video; a video with N categories adds to N counters
    pub fn aggregate<'a>(videos: impl IntoIterator<Item = &'a Video>) -> Self {
        let mut table = Self::new();
        for video in videos {
            for category in video.categories.iter() {
                *table.counts.entry(category).or_insert(0) += 1;
            }
        }
        table
    }

    /// Report every atomic category, zero when never matched
    pub fn dense(mut self) -> Self {
        for category in Category::atomic() {
            self.counts.entry(category).or_insert(0);
        }
        self
    }

    pub fn get(&self, category: Category) -> Option<u64> {
        self.counts.get(&category).copied()
    }

    /// Look up a count by category name or numeric code.
    ///
    /// Unknown identifiers are [`StatsError::UnknownCategory`]; known
    /// categories absent from the table are [`StatsError::EmptyCategory`].
    pub fn lookup(&self, identifier: &str) -> Result<u64> {
        let category = identifier.parse::<Category>()?;
        self.get(category).ok_or_else(|| StatsError::EmptyCategory {
            category: category.name().to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        self.counts.iter().map(|(c, n)| (*c, *n))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(Category, u64)> for StatsTable {
    fn from_iter<I: IntoIterator<Item = (Category, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

impl Serialize for StatsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (category, count) in &self.counts {
            map.serialize_entry(category.name(), count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StatsTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, u64>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(name, count)| {
                name.parse::<Category>()
                    .map(|category| (category, count))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

/// Fold a video list into category counts
pub fn aggregate(videos: &[Video]) -> StatsTable {
    StatsTable::aggregate(videos)
}

/// Runs the scan-and-aggregate pipeline, optionally through a cache
pub struct StatsCollector {
    scanner: PlaylistScanner,
    cache: Option<StatsCache>,
    dense: bool,
}

impl StatsCollector {
    pub fn new(scanner: PlaylistScanner, cache: Option<StatsCache>, dense: bool) -> Self {
        Self {
            scanner,
            cache,
            dense,
        }
    }

    /// Build the production pipeline from configuration
    ///
    /// # Arguments
    /// * `config` - Validated configuration
    /// * `cached` - Serve repeated requests from a TTL cache (used by the service)
    pub fn from_config(config: &Config, cached: bool) -> Result<Self> {
        let client = ProductionYouTubeClient::from_config(config)?;
        Self::with_client(Box::new(client), config, cached)
    }

    /// Build the pipeline around any upstream client
    pub fn with_client(
        client: Box<dyn YouTubeClient>,
        config: &Config,
        cached: bool,
    ) -> Result<Self> {
        let scanner = PlaylistScanner::from_config(client, config)?;
        let cache = cached.then(|| StatsCache::from_config(&config.cache));
        Ok(Self::new(scanner, cache, config.report.dense))
    }

    /// Scan the playlist and count categories
    pub async fn collect(&self) -> Result<StatsTable> {
        let run = async {
            let videos = self.scanner.fetch_all().await?;
            let table = aggregate(&videos);
            info!(
                "Aggregated {} videos into {} categories",
                videos.len(),
                table.len()
            );
            Ok::<_, StatsError>(table)
        };

        let table = match &self.cache {
            Some(cache) => cache.get_or_fetch(self.scanner.playlist_id(), run).await?,
            None => run.await?,
        };

        debug!("Category counts: {:?}", table);
        Ok(if self.dense { table.dense() } else { table })
    }

    /// Count for a single category
    pub async fn lookup(&self, identifier: &str) -> Result<u64> {
        // Reject unknown names before paying for a scan
        identifier.parse::<Category>()?;
        self.collect().await?.lookup(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategorySet;

    fn video(id: &str, categories: &[Category]) -> Video {
        Video {
            id: id.to_string(),
            categories: categories.iter().copied().collect::<CategorySet>(),
        }
    }

    fn sample_videos() -> Vec<Video> {
        vec![
            video("a", &[Category::E8]),
            video("b", &[Category::E8, Category::Mp]),
            video("c", &[]),
        ]
    }

    #[test]
    fn test_aggregate_counts_each_category() {
        let table = aggregate(&sample_videos());

        assert_eq!(table.get(Category::E8), Some(2));
        assert_eq!(table.get(Category::Mp), Some(1));
        assert_eq!(table.get(Category::Mr), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_aggregate_bulk_counts_constituents() {
        let table = aggregate(&[video("a", &[Category::M]), video("b", &[Category::Mr])]);

        assert_eq!(table.get(Category::Mp), Some(1));
        assert_eq!(table.get(Category::Mr), Some(2));
        assert_eq!(table.get(Category::M), None);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_dense_fills_zeros() {
        let table = aggregate(&sample_videos()).dense();

        assert_eq!(table.get(Category::E8), Some(2));
        assert_eq!(table.get(Category::Mp), Some(1));
        assert_eq!(table.get(Category::Mr), Some(0));
        // the bulk category is never reported on its own
        assert_eq!(table.get(Category::M), None);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_lookup() {
        let table = aggregate(&sample_videos());

        assert_eq!(table.lookup("e8").unwrap(), 2);
        assert_eq!(table.lookup("1").unwrap(), 2);
        assert!(matches!(
            table.lookup("4"),
            Err(StatsError::EmptyCategory { ref category }) if category == "mr"
        ));
        // the bulk category is never a row of its own
        assert!(matches!(
            table.lookup("m"),
            Err(StatsError::EmptyCategory { .. })
        ));
        assert!(matches!(
            table.lookup("zz"),
            Err(StatsError::UnknownCategory { .. })
        ));

        let dense = table.dense();
        assert_eq!(dense.lookup("mr").unwrap(), 0);
    }

    #[test]
    fn test_serializes_by_name_in_category_order() {
        let table: StatsTable = [(Category::Mr, 3), (Category::E8, 1)].into_iter().collect();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"e8":1,"mr":3}"#);
    }

    #[test]
    fn test_deserialize_ignores_key_case() {
        let table: StatsTable = serde_json::from_str(r#"{"E8": 4, "mp": 2}"#).unwrap();
        assert_eq!(table.get(Category::E8), Some(4));
        assert_eq!(table.get(Category::Mp), Some(2));

        let result: std::result::Result<StatsTable, _> = serde_json::from_str(r#"{"zz": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let videos = sample_videos();
        assert_eq!(aggregate(&videos), aggregate(&videos));
    }
}
