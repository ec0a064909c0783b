//! NDJSON → `GenerationEvent` streaming decoder.
//!
//! Ollama streams one JSON object per line:
//! `{"model":"llama2","response":"Hi","done":false}\n`. This module turns the
//! raw chunked body into an [`EventStream`] on the fly. Body chunks do not
//! align with lines, so the decoder keeps the unfinished tail of the last
//! chunk in a buffer until its newline arrives.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use oaibridge_core::{BackendError, EventStream, GenerationEvent};
use tracing::{debug, warn};

use crate::wire::GenerateChunk;

/// Longest unterminated line kept while waiting for its newline.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// State threaded through the `unfold` stream.
struct DecoderState {
    stream: futures_util::stream::BoxStream<'static, Result<Bytes, reqwest::Error>>,
    buf: BytesMut,
    idle_timeout: Duration,
    finished: bool,
}

/// What a single line decoded to.
enum Line {
    Skip,
    Event(GenerationEvent),
    Failed(String),
}

/// Decode an NDJSON byte stream into generation events.
///
/// The stream ends after the first `done: true` event, when the body ends,
/// or after yielding a single `StreamInterrupted` error. `idle_timeout`
/// bounds the wait for each body read, not the stream as a whole.
pub fn decode_events<S>(byte_stream: S, idle_timeout: Duration) -> EventStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let state = DecoderState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        idle_timeout,
        finished: false,
    };

    let events = futures_util::stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }

        loop {
            // Try to extract a complete line from the buffer.
            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end);
                match decode_line(&line) {
                    Line::Skip => continue,
                    Line::Event(event) => {
                        st.finished = event.done;
                        return Some((Ok(event), st));
                    }
                    Line::Failed(message) => {
                        st.finished = true;
                        return Some((Err(BackendError::StreamInterrupted(message)), st));
                    }
                }
            }

            // Need more data from upstream.
            match tokio::time::timeout(st.idle_timeout, st.stream.next()).await {
                Ok(Some(Ok(chunk))) => {
                    st.buf.extend_from_slice(&chunk);
                    if st.buf.len() > MAX_LINE_BYTES && find_newline(&st.buf).is_none() {
                        warn!(buffered = st.buf.len(), "Backend line exceeds limit");
                        st.finished = true;
                        let message =
                            format!("backend line longer than {MAX_LINE_BYTES} bytes");
                        return Some((Err(BackendError::StreamInterrupted(message)), st));
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Backend stream error: {e}");
                    st.finished = true;
                    let message = format!("backend connection failed: {}", error_chain(&e));
                    return Some((Err(BackendError::StreamInterrupted(message)), st));
                }
                Ok(None) => {
                    // Body ended; a final line may lack its newline.
                    st.finished = true;
                    let rest = st.buf.split();
                    return match decode_line(&rest) {
                        Line::Skip => {
                            debug!("Backend closed the stream");
                            None
                        }
                        Line::Event(event) => Some((Ok(event), st)),
                        Line::Failed(message) => {
                            Some((Err(BackendError::StreamInterrupted(message)), st))
                        }
                    };
                }
                Err(_) => {
                    warn!(timeout = ?st.idle_timeout, "Backend stream stalled");
                    st.finished = true;
                    let message = format!("no data from backend for {:?}", st.idle_timeout);
                    return Some((Err(BackendError::StreamInterrupted(message)), st));
                }
            }
        }
    });

    Box::pin(events)
}

fn decode_line(line: &[u8]) -> Line {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Line::Skip;
    }

    match serde_json::from_slice::<GenerateChunk>(line) {
        Ok(chunk) => match chunk.error {
            Some(message) => Line::Failed(message),
            None => Line::Event(chunk.into_event()),
        },
        Err(e) => {
            warn!(
                line = %String::from_utf8_lossy(line),
                "Skipping undecodable backend line: {e}"
            );
            Line::Skip
        }
    }
}

/// Find the next newline in the buffer, returning the position after it.
fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}

/// Render an error together with its `source()` chain.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
