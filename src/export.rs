//! Static statistics artifact consumed by the front end

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::stats::StatsTable;

/// On-disk artifact: `{"videoCount": {"e8": 2, ...}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub video_count: StatsTable,
}

impl Statistics {
    pub fn new(video_count: StatsTable) -> Self {
        Self { video_count }
    }

    /// Write the artifact, creating parent directories and replacing any existing file
    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string(self)?;
        tokio::fs::write(path, json).await?;
        tracing::info!("Wrote statistics to {:?}", path);
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use tempfile::TempDir;

    fn sample() -> Statistics {
        Statistics::new([(Category::E8, 2), (Category::Mp, 1)].into_iter().collect())
    }

    #[test]
    fn test_artifact_shape() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"videoCount":{"e8":2,"mp":1}}"#);
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("front/src/lib/statistics.json");

        sample().write(&path).await.unwrap();

        let loaded = Statistics::load(&path).await.unwrap();
        assert_eq!(loaded, sample());
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("statistics.json");
        tokio::fs::write(&path, r#"{"videoCount":{"mr":99,"e8":99}, "stale": true}"#)
            .await
            .unwrap();

        let replacement = Statistics::new([(Category::Mr, 4)].into_iter().collect());
        replacement.write(&path).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, r#"{"videoCount":{"mr":4}}"#);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = Statistics::load(&dir.path().join("absent.json")).await;
        assert!(result.is_err());
    }
}
