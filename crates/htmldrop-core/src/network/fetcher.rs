//! Bounded outbound fetches.
//!
//! The body is streamed and the byte ceiling is enforced on what actually
//! arrives, so an origin that omits or lies about `Content-Length` still
//! cannot push more than the limit into memory. There are no retries at this
//! layer.

use crate::config::NetworkConfig;
use crate::error::{HtmlDropError, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::{header, redirect, Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Body and content type of a fetched resource.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Source of third-party resources.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// GET `url`, failing with `PayloadTooLarge` once more than `max_bytes`
    /// have been received and with `UpstreamTimeout` after `timeout`.
    async fn fetch(
        &self,
        url: &str,
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<FetchedResource>;

    /// Learn the content type of `url` without downloading the body.
    async fn probe_content_type(&self, url: &str, timeout: Duration) -> Result<String>;
}

pub type DynFetcher = Arc<dyn ResourceFetcher>;

/// [`ResourceFetcher`] over reqwest.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(NetworkConfig::USER_AGENT)
            .redirect(redirect::Policy::limited(5))
            .build()
            .map_err(|e| HtmlDropError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    async fn fetch_bounded(&self, url: &str, max_bytes: u64) -> Result<FetchedResource> {
        let response = self.client.get(url).send().await?;
        let response = ensure_success(url, response)?;

        // A declared length over the limit can be rejected before reading.
        if let Some(declared) = response.content_length() {
            if declared > max_bytes {
                debug!("Rejecting {}: declared length {} exceeds {}", url, declared, max_bytes);
                return Err(HtmlDropError::PayloadTooLarge {
                    limit_bytes: max_bytes,
                });
            }
        }

        let content_type = content_type_of(&response);
        let mut body = BytesMut::with_capacity(NetworkConfig::FETCH_CHUNK_SIZE);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if (body.len() + chunk.len()) as u64 > max_bytes {
                debug!("Aborting {}: streamed body exceeds {} bytes", url, max_bytes);
                return Err(HtmlDropError::PayloadTooLarge {
                    limit_bytes: max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedResource {
            bytes: body.freeze(),
            content_type,
        })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, max_bytes: u64, timeout: Duration) -> Result<FetchedResource> {
        let fetched = tokio::time::timeout(timeout, self.fetch_bounded(url, max_bytes))
            .await
            .map_err(|_| HtmlDropError::UpstreamTimeout(timeout))?
            .map_err(|e| with_timeout(e, timeout))?;
        debug!("Fetched {} ({} bytes, {})", url, fetched.bytes.len(), fetched.content_type);
        Ok(fetched)
    }

    async fn probe_content_type(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = tokio::time::timeout(timeout, self.client.head(url).send())
            .await
            .map_err(|_| HtmlDropError::UpstreamTimeout(timeout))?
            .map_err(|e| with_timeout(e.into(), timeout))?;
        let response = ensure_success(url, response)?;
        Ok(content_type_of(&response))
    }
}

fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(HtmlDropError::UpstreamUnavailable {
            url: url.to_string(),
            message: format!("Upstream returned status {}", status),
        })
    }
}

fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| NetworkConfig::DEFAULT_CONTENT_TYPE.to_string())
}

/// Fill in the configured limit on transport-level timeouts.
fn with_timeout(err: HtmlDropError, timeout: Duration) -> HtmlDropError {
    match err {
        HtmlDropError::UpstreamTimeout(_) => HtmlDropError::UpstreamTimeout(timeout),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;

    async fn spawn_origin() -> SocketAddr {
        let app = Router::new()
            .route(
                "/style.css",
                get(|| async { ([(header::CONTENT_TYPE, "text/css")], ".a{color:red}") }),
            )
            .route(
                "/chunked.bin",
                get(|| async {
                    let chunks = (0..8)
                        .map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![b'x'; 1024])));
                    Body::from_stream(futures::stream::iter(chunks))
                }),
            )
            .route(
                "/slow.js",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route("/missing.css", get(|| async { StatusCode::NOT_FOUND }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_type() {
        let addr = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let fetched = fetcher
            .fetch(&format!("http://{}/style.css", addr), 1024, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(fetched.bytes, Bytes::from_static(b".a{color:red}"));
        assert_eq!(fetched.content_type, "text/css");
    }

    #[tokio::test]
    async fn test_stream_over_limit_without_length_header() {
        let addr = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let result = fetcher
            .fetch(&format!("http://{}/chunked.bin", addr), 4096, Duration::from_secs(5))
            .await;
        assert!(matches!(
            result,
            Err(HtmlDropError::PayloadTooLarge { limit_bytes: 4096 })
        ));

        // The same body fits under a larger ceiling.
        let fetched = fetcher
            .fetch(&format!("http://{}/chunked.bin", addr), 8192, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(fetched.bytes.len(), 8192);
    }

    #[tokio::test]
    async fn test_declared_length_over_limit() {
        let addr = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let result = fetcher
            .fetch(&format!("http://{}/style.css", addr), 4, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(HtmlDropError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_timeout() {
        let addr = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let timeout = Duration::from_millis(200);
        let result = fetcher
            .fetch(&format!("http://{}/slow.js", addr), 1024, timeout)
            .await;
        match result {
            Err(HtmlDropError::UpstreamTimeout(limit)) => assert_eq!(limit, timeout),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let addr = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let result = fetcher
            .fetch(&format!("http://{}/missing.css", addr), 1024, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(HtmlDropError::UpstreamUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // Bind then drop to find a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher
            .fetch(&format!("http://{}/a.css", addr), 1024, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(HtmlDropError::UpstreamUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_probe_content_type() {
        let addr = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let content_type = fetcher
            .probe_content_type(&format!("http://{}/style.css", addr), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(content_type, "text/css");

        assert!(fetcher
            .probe_content_type(&format!("http://{}/missing.css", addr), Duration::from_secs(5))
            .await
            .is_err());
    }
}
