//! `check` against a fake Ollama server.

use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use oaibridge_cli::handlers::check;
use oaibridge_core::BridgeConfig;
use serde_json::json;
use tokio::net::TcpListener;

fn config(backend_url: &str) -> BridgeConfig {
    BridgeConfig::new(backend_url, "llama2")
        .unwrap()
        .with_health_timeout(Duration::from_secs(2))
        .with_request_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn check_succeeds_against_live_backend() {
    let app = Router::new()
        .route("/api/version", get(|| async { Json(json!({"version": "0.5.7"})) }))
        .route(
            "/api/tags",
            get(|| async { Json(json!({"models": [{"name": "llama2:latest"}]})) }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    check::execute(config(&format!("http://{addr}"))).await.unwrap();
}

#[tokio::test]
async fn check_fails_when_backend_is_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = check::execute(config(&format!("http://{addr}")))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not reachable"), "{err:#}");
}
