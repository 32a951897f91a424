//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use htmldrop_core::{FetchedResource, HtmlDrop, HtmlDropError, ResourceFetcher, Result, Settings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// In-memory origin that counts how often it is asked for something.
pub struct CountingFetcher {
    fetches: AtomicUsize,
    probes: AtomicUsize,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn content_type_for(url: &str) -> &'static str {
        if url.ends_with(".woff2") {
            "font/woff2"
        } else if url.ends_with(".js") {
            "application/javascript"
        } else {
            "text/css"
        }
    }
}

#[async_trait]
impl ResourceFetcher for CountingFetcher {
    async fn fetch(
        &self,
        url: &str,
        max_bytes: u64,
        _timeout: Duration,
    ) -> Result<FetchedResource> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let body = format!("payload for {}", url).into_bytes();
        if body.len() as u64 > max_bytes {
            return Err(HtmlDropError::PayloadTooLarge {
                limit_bytes: max_bytes,
            });
        }
        Ok(FetchedResource {
            bytes: Bytes::from(body),
            content_type: Self::content_type_for(url).to_string(),
        })
    }

    async fn probe_content_type(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(Self::content_type_for(url).to_string())
    }
}

pub fn test_settings(data_dir: &TempDir) -> Settings {
    Settings {
        data_dir: data_dir.path().to_path_buf(),
        host_url: "http://localhost:5010".to_string(),
        ..Settings::default()
    }
}

/// Facade over a temp dir with a counting fetcher.
pub fn setup_with(
    settings: impl FnOnce(&mut Settings),
) -> (TempDir, HtmlDrop, Arc<CountingFetcher>) {
    let temp_dir = TempDir::new().unwrap();
    let mut s = test_settings(&temp_dir);
    settings(&mut s);
    let fetcher = Arc::new(CountingFetcher::new());
    let service = HtmlDrop::builder(s)
        .with_fetcher(fetcher.clone())
        .build()
        .unwrap();
    (temp_dir, service, fetcher)
}

pub fn setup() -> (TempDir, HtmlDrop, Arc<CountingFetcher>) {
    setup_with(|_| {})
}
