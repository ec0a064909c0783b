//! Integration tests for `OllamaClient` against a fake Ollama server.

mod common;

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::StreamExt;
use oaibridge_core::{
    BackendError, GenerationEvent, GenerationOptions, GenerationOutput, GenerationRequest,
    InferenceBackend,
};
use serde_json::{Value, json};
use tokio::sync::oneshot;

type Captured = Arc<Mutex<Vec<Value>>>;

fn prompt_request(stream: bool) -> GenerationRequest {
    GenerationRequest::new("llama2", "User: Hello!\nAssistant: ").streaming(stream)
}

#[tokio::test]
async fn list_models_preserves_backend_order() {
    let app = Router::new().route(
        "/api/tags",
        get(|| async {
            Json(json!({"models": [
                {"name": "mistral:latest", "modified_at": "2024-05-01T10:00:00Z", "size": 1},
                {"name": "llama2:latest", "modified_at": "2024-04-01T10:00:00Z", "size": 2}
            ]}))
        }),
    );
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    let models = client.list_models().await.unwrap();
    let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["mistral:latest", "llama2:latest"]);
}

#[tokio::test]
async fn complete_sends_non_streaming_body_with_options() {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route(
            "/api/generate",
            post(|State(seen): State<Captured>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                Json(json!({
                    "model": "llama2",
                    "response": "Hi there!",
                    "done": true,
                    "done_reason": "stop",
                    "prompt_eval_count": 9,
                    "eval_count": 3
                }))
            }),
        )
        .with_state(captured.clone());
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    let request = prompt_request(true).with_options(GenerationOptions {
        temperature: Some(0.1),
        num_predict: Some(10),
        ..Default::default()
    });
    let completion = client.complete(request).await.unwrap();

    assert_eq!(completion.text, "Hi there!");
    assert_eq!(completion.prompt_eval_count, Some(9));
    assert_eq!(completion.eval_count, Some(3));

    let bodies = captured.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({
            "model": "llama2",
            "prompt": "User: Hello!\nAssistant: ",
            "stream": false,
            "options": {"temperature": 0.1, "num_predict": 10}
        })
    );
}

#[tokio::test]
async fn stream_yields_events_in_arrival_order() {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route(
            "/api/generate",
            post(|State(seen): State<Captured>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                common::ndjson_response(vec![
                    "{\"model\":\"llama2\",\"response\":\"Hi\",\"done\":false}\n".to_string(),
                    "{\"model\":\"llama2\",\"response\":\" there\",\"done\":false}\n".to_string(),
                    "{\"model\":\"llama2\",\"response\":\"\",\"done\":true,\"done_reason\":\"stop\",\"eval_count\":2}\n"
                        .to_string(),
                ])
            }),
        )
        .with_state(captured.clone());
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    let events: Vec<_> = client
        .stream(prompt_request(false))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], Ok(GenerationEvent::delta("Hi")));
    assert_eq!(events[1], Ok(GenerationEvent::delta(" there")));
    let last = events[2].as_ref().unwrap();
    assert!(last.done);
    assert_eq!(last.metadata.as_ref().unwrap().eval_count, Some(2));

    assert_eq!(captured.lock().unwrap()[0]["stream"], json!(true));
}

#[tokio::test]
async fn generate_dispatches_on_stream_flag() {
    let app = Router::new().route(
        "/api/generate",
        post(|Json(body): Json<Value>| async move {
            if body["stream"] == json!(true) {
                common::ndjson_response(vec!["{\"response\":\"\",\"done\":true}\n".to_string()])
            } else {
                Json(json!({"response": "whole", "done": true})).into_response()
            }
        }),
    );
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    match client.generate(prompt_request(false)).await.unwrap() {
        GenerationOutput::Complete(completion) => assert_eq!(completion.text, "whole"),
        other => panic!("expected a completion, got {other:?}"),
    }
    match client.generate(prompt_request(true)).await.unwrap() {
        GenerationOutput::Stream(stream) => assert_eq!(stream.count().await, 1),
        other => panic!("expected a stream, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_model_maps_to_model_not_found() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "model \"nope\" not found, try pulling it first"})),
            )
        }),
    );
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    let mut request = prompt_request(false);
    request.model = "nope".to_string();
    let err = client.complete(request.clone()).await.unwrap_err();
    assert_eq!(err, BackendError::ModelNotFound("nope".to_string()));

    let err = client.stream(request).await.err().unwrap();
    assert_eq!(err, BackendError::ModelNotFound("nope".to_string()));
}

#[tokio::test]
async fn unreadable_error_body_falls_back_to_reason() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async {
            common::broken_body_response(StatusCode::INTERNAL_SERVER_ERROR, "{\"err")
        }),
    );
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    let err = client.complete(prompt_request(false)).await.unwrap_err();
    assert_eq!(
        err,
        BackendError::Status {
            status: 500,
            message: "Internal Server Error".to_string(),
        }
    );
}

#[tokio::test]
async fn server_error_keeps_status_and_message() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "llama runner process has terminated"})),
            )
        }),
    );
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    let err = client.complete(prompt_request(false)).await.unwrap_err();
    assert_eq!(
        err,
        BackendError::Status {
            status: 500,
            message: "llama runner process has terminated".to_string(),
        }
    );
    assert_eq!(err.suggested_status_code(), 500);
}

#[tokio::test]
async fn unreachable_backend_is_classified() {
    let base_url = common::closed_port_url().await;
    let client = common::client(&base_url, Duration::from_secs(2));

    assert!(matches!(
        client.list_models().await,
        Err(BackendError::Unreachable(_))
    ));
    assert!(matches!(
        client.version().await,
        Err(BackendError::Unreachable(_))
    ));
    assert!(matches!(
        client.stream(prompt_request(true)).await.err(),
        Some(BackendError::Unreachable(_))
    ));
}

#[tokio::test]
async fn slow_completion_times_out() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"response": "too late", "done": true}))
        }),
    );
    let base_url = common::spawn(app).await;
    let timeout = Duration::from_millis(200);
    let client = common::client(&base_url, timeout);

    let started = std::time::Instant::now();
    let err = client.complete(prompt_request(false)).await.unwrap_err();
    assert_eq!(err, BackendError::Timeout(timeout));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn version_reads_backend_version() {
    let app = Router::new().route("/api/version", get(|| async { Json(json!({"version": "0.5.7"})) }));
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(1));

    assert_eq!(client.version().await.unwrap(), "0.5.7");
}

/// Fires its sender when dropped.
struct DropSignal(Option<oneshot::Sender<()>>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

type SignalSlot = Arc<Mutex<Option<oneshot::Sender<()>>>>;

async fn endless_generation(State(slot): State<SignalSlot>) -> Response {
    let guard = DropSignal(slot.lock().unwrap().take());
    let tokens = futures_util::stream::unfold((0u64, guard), |(n, guard)| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let line = format!("{{\"response\":\"t{n}\",\"done\":false}}\n");
        Some((Ok::<Bytes, Infallible>(Bytes::from(line)), (n + 1, guard)))
    });
    Response::builder()
        .header("content-type", "application/x-ndjson")
        .body(Body::from_stream(tokens))
        .unwrap()
}

#[tokio::test]
async fn dropping_stream_closes_backend_connection() {
    let (tx, rx) = oneshot::channel();
    let slot: SignalSlot = Arc::new(Mutex::new(Some(tx)));
    let app = Router::new()
        .route("/api/generate", post(endless_generation))
        .with_state(slot);
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    let mut events = client.stream(prompt_request(true)).await.unwrap();
    assert_eq!(events.next().await, Some(Ok(GenerationEvent::delta("t0"))));
    assert_eq!(events.next().await, Some(Ok(GenerationEvent::delta("t1"))));
    drop(events);

    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("backend generation was not cancelled")
        .unwrap();
}

#[tokio::test]
async fn transport_failure_mid_stream_interrupts_once() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async {
            common::broken_body_response(
                StatusCode::OK,
                "{\"response\":\"a\",\"done\":false}\n",
            )
        }),
    );
    let base_url = common::spawn(app).await;
    let client = common::client(&base_url, Duration::from_secs(5));

    let events: Vec<_> = client
        .stream(prompt_request(true))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 2, "events: {events:?}");
    assert_eq!(events[0], Ok(GenerationEvent::delta("a")));
    match &events[1] {
        Err(BackendError::StreamInterrupted(message)) => {
            assert!(message.starts_with("backend connection failed"), "{message}");
        }
        other => panic!("expected an interruption, got {other:?}"),
    }
}
