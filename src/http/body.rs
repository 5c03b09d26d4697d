//! Bounded body capture.
//!
//! # Responsibilities
//! - Decide which methods never get their request body read
//! - Read at most `limit` bytes from a body stream up front (`read_prefix`)
//! - Copy at most `limit` bytes while a body streams out (`tap`)
//! - Hand back a body that still yields every byte to its consumer
//!
//! # Design Decisions
//! - Frames already read are replayed in front of the untouched remainder
//! - A stream error stops capture and is replayed to the consumer as-is
//! - Fully drained bodies are rebuilt as a buffered body to keep their exact size
//! - A tapped body never holds frames back; its callback fires once, at end
//!   of stream, on error, or when the body is dropped

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, BodyDataStream, Bytes},
    http::Method,
};
use futures_util::{ready, stream, Stream, StreamExt};

/// Methods whose request bodies are never captured.
pub const BODILESS_METHODS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

pub fn is_bodiless(method: &Method) -> bool {
    BODILESS_METHODS.contains(method)
}

/// The prefix read from a body.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    /// At most `limit` bytes.
    pub bytes: Bytes,
    /// The stream was read to its end (before the limit, for `read_prefix`).
    pub complete: bool,
    /// The stream failed while reading the prefix.
    pub failed: bool,
}

/// Read up to `limit` bytes from `body`.
///
/// Returns the captured prefix together with a body that replays everything
/// read so far followed by the rest of the original stream.
pub async fn read_prefix(body: Body, limit: usize) -> (Captured, Body) {
    if limit == 0 {
        return (Captured::default(), body);
    }

    let mut stream = body.into_data_stream();
    let mut frames: Vec<Result<Bytes, axum::Error>> = Vec::new();
    let mut prefix: Vec<u8> = Vec::new();
    let mut complete = false;
    let mut failed = false;

    while prefix.len() < limit {
        match stream.next().await {
            Some(Ok(frame)) => {
                let take = frame.len().min(limit - prefix.len());
                prefix.extend_from_slice(&frame[..take]);
                frames.push(Ok(frame));
            }
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Body stream failed during capture");
                frames.push(Err(e));
                failed = true;
                break;
            }
            None => {
                complete = true;
                break;
            }
        }
    }

    let bytes = Bytes::from(prefix);
    let body = if complete {
        Body::from(bytes.clone())
    } else {
        Body::from_stream(stream::iter(frames).chain(stream))
    };

    (
        Captured {
            bytes,
            complete,
            failed,
        },
        body,
    )
}

type OnDone = Box<dyn FnOnce(Captured) + Send + 'static>;

/// Pass `body` through untouched, copying its first `limit` bytes.
///
/// `on_done` receives the copy once the stream ends, fails, or is dropped
/// early (client gone). Frames are forwarded as soon as they arrive.
pub fn tap<F>(body: Body, limit: usize, on_done: F) -> Body
where
    F: FnOnce(Captured) + Send + 'static,
{
    Body::from_stream(Tap {
        inner: body.into_data_stream(),
        limit,
        prefix: Vec::new(),
        on_done: Some(Box::new(on_done)),
    })
}

struct Tap {
    inner: BodyDataStream,
    limit: usize,
    prefix: Vec<u8>,
    on_done: Option<OnDone>,
}

impl Tap {
    fn finish(&mut self, complete: bool, failed: bool) {
        if let Some(on_done) = self.on_done.take() {
            on_done(Captured {
                bytes: Bytes::from(std::mem::take(&mut self.prefix)),
                complete,
                failed,
            });
        }
    }
}

impl Stream for Tap {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match ready!(this.inner.poll_next_unpin(cx)) {
            Some(Ok(frame)) => {
                let take = frame.len().min(this.limit.saturating_sub(this.prefix.len()));
                this.prefix.extend_from_slice(&frame[..take]);
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Body stream failed during capture");
                this.finish(false, true);
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.finish(true, false);
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for Tap {
    fn drop(&mut self) {
        self.finish(false, false);
    }
}

/// Best-effort UTF-8 decoding of a captured prefix.
///
/// A multi-byte sequence cut short at the end (as truncation does) is
/// dropped; any other invalid byte makes the whole prefix undecodable.
pub fn decode_utf8(bytes: &[u8]) -> Option<&str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&bytes[..e.valid_up_to()]).ok(),
        Err(_) => None,
    }
}
