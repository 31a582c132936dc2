//! JSON HTTP service exposing the statistics.
//!
//! Routes:
//! - `GET /stats` returns `{"success": true, "stats": {...}}`
//! - `GET /stats/{category}` returns `{"success": true, "number": n}`
//!
//! Lookup misses are `404`, upstream failures `503`, both with a
//! `{"success": false, "detail": "..."}` body.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::{Result, StatsError};
use crate::models::AVAILABLE_CATEGORIES;
use crate::stats::StatsCollector;

const STATS_PATH: &str = "/stats";

/// Accept connections until `shutdown` resolves
///
/// # Arguments
/// * `listener` - Bound listener to accept on
/// * `collector` - Pipeline shared by every request
/// * `shutdown` - Stops accepting new connections when it completes
pub async fn serve<F>(
    listener: TcpListener,
    collector: Arc<StatsCollector>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    info!("Serving statistics on http://{}{}", addr, STATS_PATH);

    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let collector = Arc::clone(&collector);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let collector = Arc::clone(&collector);
                        async move {
                            let (method, path) = (req.method(), req.uri().path());
                            let response = route(method, path, &collector).await;
                            debug!("{} {} -> {}", method, path, response.status());
                            Ok::<_, Infallible>(response)
                        }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Connection from {} closed with error: {}", peer, e);
                    }
                });
            }
            () = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    Ok(())
}

/// Dispatch one request to its handler
pub async fn route(
    method: &Method,
    path: &str,
    collector: &StatsCollector,
) -> Response<Full<Bytes>> {
    let category = match path.strip_prefix(STATS_PATH) {
        Some("") => None,
        Some(rest) => match rest.strip_prefix('/') {
            Some(category) => Some(category),
            None => return not_found(),
        },
        None => return not_found(),
    };

    if method != Method::GET {
        let mut response = json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({"success": false, "detail": "method not allowed"}),
        );
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET"));
        return response;
    }

    match category {
        None => match collector.collect().await {
            Ok(stats) => json_response(StatusCode::OK, json!({"success": true, "stats": stats})),
            Err(e) => error_response(&e),
        },
        Some(category) => match collector.lookup(category).await {
            Ok(number) => json_response(StatusCode::OK, json!({"success": true, "number": number})),
            Err(e) => error_response(&e),
        },
    }
}

fn error_response(error: &StatsError) -> Response<Full<Bytes>> {
    if error.is_client_error() {
        let detail = format!("available categories are: {}", AVAILABLE_CATEGORIES.as_str());
        return json_response(
            StatusCode::NOT_FOUND,
            json!({"success": false, "detail": detail}),
        );
    }

    warn!("Statistics request failed: {}", error);
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({"success": false, "detail": error.to_string()}),
    )
}

fn not_found() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        json!({"success": false, "detail": "not found"}),
    )
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, Rule, RuleSet};
    use crate::client::{
        PlaylistItem, PlaylistItemListResponse, PlaylistItemSnippet, YouTubeClient,
    };
    use crate::models::Category;
    use crate::scanner::PlaylistScanner;
    use async_trait::async_trait;
    use http_body_util::BodyExt;

    mockall::mock! {
        pub TestYouTubeClient {}

        #[async_trait]
        impl YouTubeClient for TestYouTubeClient {
            async fn list_playlist_items(
                &self,
                playlist_id: &str,
                page_token: Option<String>,
            ) -> Result<PlaylistItemListResponse>;
        }
    }

    fn page(descriptions: &[&str]) -> PlaylistItemListResponse {
        PlaylistItemListResponse {
            kind: "youtube#playlistItemListResponse".to_string(),
            etag: "etag".to_string(),
            next_page_token: None,
            items: descriptions
                .iter()
                .enumerate()
                .map(|(i, description)| PlaylistItem {
                    kind: "youtube#playlistItem".to_string(),
                    etag: format!("etag-{}", i),
                    id: format!("item-{}", i),
                    snippet: PlaylistItemSnippet {
                        description: description.to_string(),
                    },
                })
                .collect(),
        }
    }

    fn collector(client: MockTestYouTubeClient, dense: bool) -> StatsCollector {
        let rules = [Category::M, Category::E8, Category::Mp, Category::Mr]
            .iter()
            .map(|c| Rule::new(*c, &format!(r"#{}\b", c.name())).unwrap())
            .collect();
        let classifier = Classifier::new(Arc::new(RuleSet::new(rules).unwrap()));
        let scanner = PlaylistScanner::new(Box::new(client), classifier, "UUtest", 10);
        StatsCollector::new(scanner, None, dense)
    }

    fn sample_client() -> MockTestYouTubeClient {
        let mut client = MockTestYouTubeClient::new();
        client
            .expect_list_playlist_items()
            .returning(|_, _| Ok(page(&["#e8", "#e8 #mp", "nothing"])));
        client
    }

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_all_stats() {
        let collector = collector(sample_client(), false);
        let response = route(&Method::GET, "/stats", &collector).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            body_json(response).await,
            json!({"success": true, "stats": {"e8": 2, "mp": 1}})
        );
    }

    #[tokio::test]
    async fn test_single_category_by_name_and_code() {
        let collector = collector(sample_client(), false);

        let response = route(&Method::GET, "/stats/e8", &collector).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"success": true, "number": 2}));

        let response = route(&Method::GET, "/stats/2", &collector).await;
        assert_eq!(body_json(response).await, json!({"success": true, "number": 1}));
    }

    #[tokio::test]
    async fn test_unknown_category_is_not_found() {
        // unknown names are rejected without calling upstream
        let collector = collector(MockTestYouTubeClient::new(), false);
        let response = route(&Method::GET, "/stats/zz", &collector).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"success": false, "detail": "available categories are: e8, mp, mr, m"})
        );
    }

    #[tokio::test]
    async fn test_unmatched_category_depends_on_density() {
        let sparse = collector(sample_client(), false);
        let response = route(&Method::GET, "/stats/mr", &sparse).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let dense = collector(sample_client(), true);
        let response = route(&Method::GET, "/stats/mr", &dense).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"success": true, "number": 0}));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_service_unavailable() {
        let mut client = MockTestYouTubeClient::new();
        client.expect_list_playlist_items().returning(|_, _| {
            Err(StatsError::ServerError {
                status: 500,
                message: "backend error".to_string(),
            })
        });
        let collector = collector(client, false);

        let response = route(&Method::GET, "/stats", &collector).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert!(body["detail"].as_str().unwrap().contains("backend error"));
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let collector = collector(MockTestYouTubeClient::new(), false);

        let response = route(&Method::GET, "/", &collector).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = route(&Method::GET, "/statistics", &collector).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = route(&Method::POST, "/stats", &collector).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET");
    }
}
