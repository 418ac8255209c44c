//! Byte-for-byte relay of a backend response body to the caller.
//!
//! Chunks are yielded as they arrive. A copy is kept so the finished exchange can be
//! handed to the learner, but only when the backend stream ended cleanly. A caller
//! that disconnects drops the stream, which drops the backend request with it.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures_util::Stream;
use tracing::warn;

/// Bodies larger than this are relayed but not captured.
pub const MAX_CAPTURE_BYTES: usize = 4 * 1024 * 1024;

type Upstream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;
type OnComplete = Box<dyn FnOnce(Vec<u8>) + Send>;

pub struct RelayStream {
    upstream: Upstream,
    captured: Vec<u8>,
    on_complete: Option<OnComplete>,
}

impl RelayStream {
    /// Relay without capturing.
    pub fn passthrough(upstream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            upstream: Box::pin(upstream),
            captured: Vec::new(),
            on_complete: None,
        }
    }

    /// Relay and call `on_complete` with the full body once the backend finishes.
    pub fn capturing(
        upstream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
        on_complete: impl FnOnce(Vec<u8>) + Send + 'static,
    ) -> Self {
        Self {
            upstream: Box::pin(upstream),
            captured: Vec::new(),
            on_complete: Some(Box::new(on_complete)),
        }
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.upstream.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if this.on_complete.is_some() {
                    if this.captured.len() + chunk.len() > MAX_CAPTURE_BYTES {
                        warn!("response too large to learn from");
                        this.on_complete = None;
                        this.captured = Vec::new();
                    } else {
                        this.captured.extend_from_slice(&chunk);
                    }
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                warn!(error = %e, "backend stream failed mid-response");
                this.on_complete = None;
                Poll::Ready(Some(Err(std::io::Error::other(e))))
            }
            Poll::Ready(None) => {
                if let Some(callback) = this.on_complete.take() {
                    callback(std::mem::take(&mut this.captured));
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
