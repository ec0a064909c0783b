//! SSE framing for streaming chat completions.
//!
//! A backend [`EventStream`] is turned into an ordered sequence of
//! [`Frame`]s: one chunk per content event, the terminal chunk, then the
//! literal `[DONE]` marker. A failure mid-stream produces a single error
//! envelope frame instead and the sequence ends without `[DONE]`.
//!
//! Framing is pull-driven. The backend is polled for its next event only
//! after every frame derived from the previous one has been handed out.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::{Stream, StreamExt};
use oaibridge_core::EventStream;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::assemble::{ChunkAssembler, CompletionIdentity};
use crate::models::{ChatCompletionChunk, ErrorResponse};

/// Payload of the final frame of a successful stream.
pub const DONE_MARKER: &str = "[DONE]";

/// One SSE `data:` frame.
#[derive(Debug, Clone)]
pub enum Frame {
    Chunk(ChatCompletionChunk),
    Error(ErrorResponse),
    Done,
}

impl Frame {
    /// The frame's `data:` payload.
    pub fn data(&self) -> String {
        match self {
            Self::Chunk(chunk) => to_json(chunk),
            Self::Error(body) => to_json(body),
            Self::Done => DONE_MARKER.to_string(),
        }
    }

    pub fn into_event(self) -> Event {
        Event::default().data(self.data())
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        error!("Failed to serialize stream frame: {e}");
        r#"{"error":{"message":"failed to serialize frame","type":"server_error","code":"internal_error"}}"#
            .to_string()
    })
}

struct FrameState {
    events: EventStream,
    assembler: ChunkAssembler,
    pending: VecDeque<Frame>,
    finished: bool,
}

/// Reframe backend events as SSE frames for the call identified by `identity`.
pub fn frames(events: EventStream, identity: CompletionIdentity) -> impl Stream<Item = Frame> + Send {
    let state = FrameState {
        events,
        assembler: ChunkAssembler::new(identity),
        pending: VecDeque::new(),
        finished: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(frame) = st.pending.pop_front() {
                return Some((frame, st));
            }
            if st.finished {
                return None;
            }

            match st.events.next().await {
                Some(Ok(event)) => {
                    st.pending
                        .extend(st.assembler.push(event).into_iter().map(Frame::Chunk));
                    if st.assembler.is_finished() {
                        debug!(id = %st.assembler.identity().id, "Stream completed");
                        st.pending.push_back(Frame::Done);
                        st.finished = true;
                    }
                }
                Some(Err(e)) => {
                    error!(id = %st.assembler.identity().id, "Stream failed: {e}");
                    st.pending.push_back(Frame::Error(ErrorResponse::from(&e)));
                    st.finished = true;
                }
                None => {
                    warn!(
                        id = %st.assembler.identity().id,
                        "Backend stream ended without a final event"
                    );
                    st.pending.extend(st.assembler.finish().map(Frame::Chunk));
                    st.pending.push_back(Frame::Done);
                    st.finished = true;
                }
            }
        }
    })
}

/// Wrap a frame sequence into an SSE response.
///
/// Sets `x-accel-buffering: no` so reverse proxies flush every frame.
pub fn sse_response<S>(frames: S) -> Response
where
    S: Stream<Item = Frame> + Send + 'static,
{
    let events = frames.map(|frame| Ok::<Event, Infallible>(frame.into_event()));
    let sse = Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    );

    (
        [(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        )],
        sse,
    )
        .into_response()
}
