//! Integration tests for the HTTP fetcher and the cache against a local server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use stealthdrop_artifacts::{ArtifactCache, ArtifactFetcher, ArtifactStore, HttpFetcher};

async fn serve(hits: Arc<AtomicUsize>) -> SocketAddr {
    let app = Router::new()
        .route(
            "/keys/vk.bin",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                vec![7u8, 8, 9]
            }),
        )
        .route(
            "/keys/missing.bin",
            get(|| async { (StatusCode::NOT_FOUND, "no such key") }),
        )
        .with_state(hits);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn fetcher_returns_body_bytes() {
    let addr = serve(Arc::new(AtomicUsize::new(0))).await;
    let bytes = HttpFetcher::new()
        .fetch(&format!("http://{addr}/keys/vk.bin"))
        .await
        .unwrap();
    assert_eq!(bytes, vec![7, 8, 9]);
}

#[tokio::test]
async fn fetcher_maps_error_status() {
    let addr = serve(Arc::new(AtomicUsize::new(0))).await;
    let err = HttpFetcher::new()
        .fetch(&format!("http://{addr}/keys/missing.bin"))
        .await
        .unwrap_err();
    assert!(err.is_fetch_failure());
    assert!(err.to_string().contains("404"), "unexpected error: {err}");
}

#[tokio::test]
async fn unreachable_host_is_fetch_failure() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpFetcher::new()
        .fetch(&format!("http://{addr}/keys/vk.bin"))
        .await
        .unwrap_err();
    assert!(err.is_fetch_failure());
}

#[tokio::test]
async fn cache_hits_network_once_across_reopen() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = serve(hits.clone()).await;
    let url = format!("http://{addr}/keys/vk.bin");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store");

    {
        let cache = ArtifactCache::new(
            ArtifactStore::open(&path).unwrap(),
            Arc::new(HttpFetcher::new()),
        );
        assert_eq!(cache.get_or_fetch("vk", &url).await.unwrap(), vec![7, 8, 9]);
        cache.store().flush().unwrap();
    }

    let cache = ArtifactCache::new(
        ArtifactStore::open(&path).unwrap(),
        Arc::new(HttpFetcher::new()),
    );
    assert_eq!(cache.get_or_fetch("vk", &url).await.unwrap(), vec![7, 8, 9]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
