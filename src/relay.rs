//! Frames provider pieces as newline-delimited JSON.
//!
//! Every stream produced here ends with exactly one terminal record (`done` or
//! `error`) and never yields a transport error: once the response head is sent
//! the status can no longer change, so failures travel as data.

use crate::provider::PieceStream;
use bytes::Bytes;
use futures_core::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use tokio_stream::StreamExt;

/// One NDJSON line of an answer stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRecord {
    Chunk(String),
    Done,
    Error(String),
}

impl StreamRecord {
    pub fn error(err: &anyhow::Error) -> Self {
        StreamRecord::Error(format!("{err:#}"))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            StreamRecord::Chunk(text) => json!({ "chunk": text }),
            StreamRecord::Done => json!({ "done": true }),
            StreamRecord::Error(message) => json!({ "error": message }),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut line = self.to_json().to_string();
        line.push('\n');
        Bytes::from(line)
    }
}

/// Relay an answer: priming chunk, one chunk per non-empty piece, then a terminal record.
///
/// `start` is only awaited after the priming chunk has been yielded, so callers
/// see the stream open before the provider answers.
pub fn relay<F>(start: F) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static
where
    F: Future<Output = anyhow::Result<PieceStream>> + Send + 'static,
{
    async_stream::stream! {
        yield Ok(StreamRecord::Chunk(String::new()).encode());

        let mut pieces = match start.await {
            Ok(pieces) => pieces,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "answer stream failed to start");
                yield Ok(StreamRecord::error(&e).encode());
                return;
            }
        };

        let mut emitted = 0usize;
        while let Some(item) = pieces.next().await {
            match item {
                Ok(piece) if piece.text.is_empty() => {}
                Ok(piece) => {
                    emitted += 1;
                    yield Ok(StreamRecord::Chunk(piece.text).encode());
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), emitted, "answer stream failed");
                    yield Ok(StreamRecord::error(&e).encode());
                    return;
                }
            }
        }

        tracing::debug!(emitted, "answer stream complete");
        yield Ok(StreamRecord::Done.encode());
    }
}

/// A stream holding only an error record, for failures known before any provider call.
pub fn single_error(
    message: impl Into<String>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let line = StreamRecord::Error(message.into()).encode();
    tokio_stream::once(Ok(line))
}
