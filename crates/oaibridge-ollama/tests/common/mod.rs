//! In-process fake Ollama server for client tests.

use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;
use bytes::Bytes;
use futures_util::StreamExt;
use oaibridge_core::BridgeConfig;
use oaibridge_ollama::OllamaClient;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn client(base_url: &str, timeout: Duration) -> OllamaClient {
    let config = BridgeConfig::new(base_url, "llama2")
        .unwrap()
        .with_request_timeout(timeout)
        .with_health_timeout(timeout);
    OllamaClient::from_config(&config).unwrap()
}

/// An `application/x-ndjson` response streaming `lines` one body chunk each.
pub fn ndjson_response(lines: Vec<String>) -> Response {
    let chunks = futures_util::stream::iter(
        lines
            .into_iter()
            .map(|line| Ok::<Bytes, Infallible>(Bytes::from(line))),
    );
    Response::builder()
        .header("content-type", "application/x-ndjson")
        .body(Body::from_stream(chunks))
        .unwrap()
}

/// A response that sends `first` and then fails, aborting the body mid-transfer.
pub fn broken_body_response(status: StatusCode, first: &str) -> Response {
    let first = futures_util::stream::once(std::future::ready(Ok::<Bytes, std::io::Error>(
        Bytes::from(first.to_string()),
    )));
    let failure = futures_util::stream::once(async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Err(std::io::Error::other("connection reset by fake backend"))
    });
    let chunks = first.chain(failure);
    Response::builder()
        .status(status)
        .header("content-type", "application/x-ndjson")
        .body(Body::from_stream(chunks))
        .unwrap()
}
