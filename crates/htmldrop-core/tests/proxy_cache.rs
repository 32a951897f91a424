//! Resource proxy behavior through the public facade.

mod common;

use axum::body::Body;
use axum::http::header;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use common::{setup, setup_with};
use htmldrop_core::{CacheStatus, HtmlDrop, HtmlDropError, OriginAllowList};
use std::fs;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const FONT_URL: &str = "https://fonts.gstatic.com/s/inter/v12/inter-regular.woff2";

#[tokio::test]
async fn non_allow_listed_urls_never_fetch() {
    let (_tmp, service, fetcher) = setup();

    for url in [
        "https://evil.example.com/x.js",
        "http://169.254.169.254/latest/meta-data",
        "file:///etc/passwd",
    ] {
        let result = service.proxy_resource(url).await;
        assert!(
            matches!(result, Err(HtmlDropError::Forbidden { .. })),
            "{} should be forbidden",
            url
        );
    }
    assert_eq!(fetcher.fetches(), 0);
    assert_eq!(fetcher.probes(), 0);
}

#[tokio::test]
async fn cache_status_progression() {
    let (_tmp, service, fetcher) = setup();
    let url = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css";

    assert_eq!(service.proxy_resource(url).await.unwrap().status, CacheStatus::Miss);
    assert_eq!(service.proxy_resource(url).await.unwrap().status, CacheStatus::HitMemory);

    service.clear_memory_cache();
    assert_eq!(service.proxy_resource(url).await.unwrap().status, CacheStatus::HitDisk);

    let report = service.clear_cache().unwrap();
    assert_eq!(report.files_cleared, 1);
    assert_eq!(service.proxy_resource(url).await.unwrap().status, CacheStatus::Miss);

    assert_eq!(fetcher.fetches(), 2);
}

#[tokio::test]
async fn expired_disk_entry_is_refetched_and_removed() {
    let (tmp, service, fetcher) = setup_with(|s| s.resource_cache_ttl = Duration::from_secs(60));
    let url = "https://unpkg.com/htmx.org@1.9.0/dist/htmx.min.js";

    service.proxy_resource(url).await.unwrap();
    let cache_file = tmp
        .path()
        .join("cdn_cache")
        .join(format!("{}.js", htmldrop_core::cache::fingerprint(url)));
    assert!(cache_file.exists());

    let file = fs::File::options().write(true).open(&cache_file).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(61)).unwrap();
    drop(file);

    service.clear_memory_cache();
    let result = service.proxy_resource(url).await.unwrap();
    assert_eq!(result.status, CacheStatus::Miss);
    assert_eq!(fetcher.fetches(), 2);
    // Rewritten by the refetch, so fresh again.
    assert_eq!(service.cleanup_cache().unwrap(), 0);
}

#[tokio::test]
async fn cache_stats_report_both_tiers() {
    let (_tmp, service, _fetcher) = setup();
    let a = service.proxy_resource("https://cdnjs.cloudflare.com/a.js").await.unwrap();
    let b = service.proxy_resource("https://cdnjs.cloudflare.com/b.css").await.unwrap();

    let stats = service.cache_stats();
    assert_eq!(stats.memory.items, 2);
    assert_eq!(stats.disk.items, 2);
    let payload = (a.bytes.len() + b.bytes.len()) as u64;
    assert_eq!(stats.memory.size_bytes, payload);
    assert_eq!(stats.total.size_bytes, 2 * payload);
}

#[tokio::test]
async fn uploaded_page_assets_served_identically_from_cache() {
    let (_tmp, service, fetcher) = setup();
    let html = format!(
        "<html><head><title>Fonts</title><link rel=\"stylesheet\" href=\"{}\"></head></html>",
        FONT_URL
    );
    let created = service.create_project(&html).await.unwrap();
    let project = service.read_project(&created.project_id).await.unwrap();
    assert!(project.html.contains(FONT_URL));

    let first = service.proxy_resource(FONT_URL).await.unwrap();
    let second = service.proxy_resource(FONT_URL).await.unwrap();
    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::HitMemory);
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(second.content_type, "font/woff2");
    assert_eq!(fetcher.fetches(), 1);
}

// ========================================
// Real HTTP fetcher against a local origin
// ========================================

async fn spawn_origin() -> String {
    let app = Router::new()
        .route(
            "/lib.js",
            get(|| async { ([(header::CONTENT_TYPE, "application/javascript")], "let x = 1;") }),
        )
        .route(
            "/huge.bin",
            get(|| async {
                let chunks = (0..64).map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 1024])));
                Body::from_stream(futures::stream::iter(chunks))
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn http_service(tmp: &TempDir, max_resource_bytes: u64) -> HtmlDrop {
    let settings = htmldrop_core::Settings {
        max_resource_bytes,
        ..common::test_settings(tmp)
    };
    HtmlDrop::builder(settings)
        .with_allow_list(OriginAllowList::new(vec!["127.0.0.1".to_string()]))
        .build()
        .unwrap()
}

#[tokio::test]
async fn streamed_body_over_ceiling_is_rejected() {
    let origin = spawn_origin().await;
    let tmp = TempDir::new().unwrap();
    let service = http_service(&tmp, 16 * 1024);

    let result = service.proxy_resource(&format!("{}/huge.bin", origin)).await;
    assert!(matches!(
        result,
        Err(HtmlDropError::PayloadTooLarge { limit_bytes }) if limit_bytes == 16 * 1024
    ));
    assert_eq!(service.cache_stats().total.items, 0);
}

#[tokio::test]
async fn real_fetch_populates_and_hits_disk_by_probe() {
    let origin = spawn_origin().await;
    let tmp = TempDir::new().unwrap();
    let service = http_service(&tmp, 1024 * 1024);
    let url = format!("{}/lib.js", origin);

    let first = service.proxy_resource(&url).await.unwrap();
    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(first.content_type, "application/javascript");

    service.clear_memory_cache();
    let second = service.proxy_resource(&url).await.unwrap();
    assert_eq!(second.status, CacheStatus::HitDisk);
    assert_eq!(second.bytes, first.bytes);
}
