//! Common test utilities and fixtures

use mockall::mock;
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};
use youtube_stats::client::{PlaylistItemListResponse, YouTubeClient};
use youtube_stats::config::{ApiKey, CategoryPatterns, Config};
use youtube_stats::error::Result;

pub const CHANNEL_ID: &str = "UCtestchannel";
pub const PLAYLIST_ID: &str = "UUtestchannel";
pub const API_KEY: &str = "test-api-key";

/// Configuration pointing at a mock upstream, with the bulk rule first
pub fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.youtube.channel_id = CHANNEL_ID.to_string();
    config.youtube.api_key = ApiKey::new(API_KEY);
    config.youtube.playlists_endpoint = format!("{}/playlistItems", server.uri());
    config.youtube.category_patterns = CategoryPatterns::new(vec![
        ("m".to_string(), r"(?i)#m\b".to_string()),
        ("e8".to_string(), r"(?i)#e8\b".to_string()),
        ("mp".to_string(), r"(?i)#mp\b".to_string()),
        ("mr".to_string(), r"(?i)#mr\b".to_string()),
    ]);
    config.fetch.request_timeout_secs = 5;
    config
}

/// Create mock `playlistItems.list` response (JSON)
pub fn mock_playlist_page(
    items: &[(&str, &str)],
    next_page_token: Option<&str>,
) -> serde_json::Value {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(id, description)| {
            json!({
                "kind": "youtube#playlistItem",
                "etag": format!("etag_{}", id),
                "id": id,
                "snippet": {
                    "title": format!("Video {}", id),
                    "description": description
                }
            })
        })
        .collect();

    let mut response = json!({
        "kind": "youtube#playlistItemListResponse",
        "etag": "etag_page",
        "pageInfo": {"totalResults": items.len(), "resultsPerPage": 50},
        "items": items
    });

    if let Some(token) = next_page_token {
        response["nextPageToken"] = json!(token);
    }

    response
}

/// Typed page for mockall-based tests
pub fn playlist_response(
    items: &[(&str, &str)],
    next_page_token: Option<&str>,
) -> PlaylistItemListResponse {
    serde_json::from_value(mock_playlist_page(items, next_page_token))
        .expect("fixture page deserializes")
}

/// Mount a page answering the first request (no `pageToken`)
pub async fn mount_first_page(server: &MockServer, body: serde_json::Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("playlistId", PLAYLIST_ID))
        .and(query_param("key", API_KEY))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Mount a page answering the request carrying `token`
pub async fn mount_page(
    server: &MockServer,
    token: &str,
    body: serde_json::Value,
    expected_calls: u64,
) {
    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("playlistId", PLAYLIST_ID))
        .and(query_param("pageToken", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// Mock implementation of YouTubeClient for testing
mock! {
    pub YouTubeClient {}

    #[async_trait::async_trait]
    impl YouTubeClient for YouTubeClient {
        async fn list_playlist_items(
            &self,
            playlist_id: &str,
            page_token: Option<String>,
        ) -> Result<PlaylistItemListResponse>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_playlist_page() {
        let page = mock_playlist_page(&[("v1", "#e8"), ("v2", "")], Some("token123"));
        assert_eq!(page["items"].as_array().unwrap().len(), 2);
        assert_eq!(page["nextPageToken"], "token123");
        assert_eq!(page["items"][0]["snippet"]["description"], "#e8");
    }

    #[test]
    fn test_playlist_response() {
        let page = playlist_response(&[("v1", "#mp")], None);
        assert_eq!(page.items[0].id, "v1");
        assert!(page.next_page_token.is_none());
    }
}
