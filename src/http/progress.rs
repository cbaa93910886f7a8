//! Upload and download progress reporting.
//!
//! [`ProgressBody`] wraps a body stream and reports every data frame to an
//! [`OnProgress`] listener. [`ProgressExchange`] installs it around the request
//! body (send) and the response body (receive).

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use http_body::{Body, Frame, SizeHint};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, StreamBody};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::base::log::log_w;
use crate::base::neterror::NetError;
use crate::http::options::OnProgress;
use crate::http::requestbody::RequestBody;
use crate::http::response::HttpResponse;
use crate::http::transport::{Exchange, WireRequest};

/// Upload bodies are handed to the connection in chunks of this size so the
/// send listener sees intermediate progress.
pub const SEND_CHUNK_SIZE: usize = 16 * 1024;

/// One progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub bytes_so_far: u64,
    pub total: Option<u64>,
    pub done: bool,
}

impl Progress {
    /// Completed share in `0.0..=1.0`, `None` when the total is unknown.
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some(self.bytes_so_far as f32 / total as f32),
            None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Send,
    Receive,
}

/// Body wrapper that counts data frames.
///
/// Sending reports `done` once the announced length has been written,
/// receiving reports `done` at end of stream. Either way `done` is reported
/// exactly once, and end of stream always reports it if nothing did before.
pub struct ProgressBody {
    inner: BoxBody<Bytes, NetError>,
    listener: OnProgress,
    direction: Direction,
    so_far: u64,
    total: Option<u64>,
    finished: bool,
}

impl ProgressBody {
    /// Upload body: `bytes` split into [`SEND_CHUNK_SIZE`] frames.
    pub fn send(bytes: Bytes, listener: OnProgress) -> Self {
        let total = bytes.len() as u64;
        let chunks: Vec<Result<Frame<Bytes>, NetError>> = (0..bytes.len())
            .step_by(SEND_CHUNK_SIZE)
            .map(|start| {
                let end = (start + SEND_CHUNK_SIZE).min(bytes.len());
                Ok(Frame::data(bytes.slice(start..end)))
            })
            .collect();

        Self {
            inner: StreamBody::new(stream::iter(chunks)).boxed(),
            listener,
            direction: Direction::Send,
            so_far: 0,
            total: Some(total),
            finished: false,
        }
    }

    /// Download body with the announced length, if any.
    pub fn receive(inner: BoxBody<Bytes, NetError>, listener: OnProgress) -> Self {
        let total = inner.size_hint().exact();
        Self {
            inner,
            listener,
            direction: Direction::Receive,
            so_far: 0,
            total,
            finished: false,
        }
    }

    fn notify(&mut self, done: bool) {
        if self.finished {
            return;
        }
        self.finished = done;

        let (so_far, total) = (self.so_far, self.total);
        let listener = &self.listener;
        if catch_unwind(AssertUnwindSafe(|| listener(so_far, total, done))).is_err() {
            log_w("progress", "progress listener panicked", None);
        }
    }
}

impl Body for ProgressBody {
    type Data = Bytes;
    type Error = NetError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.so_far += data.len() as u64;
                    let done =
                        this.direction == Direction::Send && this.total == Some(this.so_far);
                    this.notify(done);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => {
                this.notify(true);
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        match self.total {
            Some(total) => SizeHint::with_exact(total),
            None => self.inner.size_hint(),
        }
    }
}

/// Exchange layer that reports upload and download progress.
///
/// Send progress is only installed for requests that carry a body.
pub struct ProgressExchange {
    inner: Arc<dyn Exchange>,
    on_send: Option<OnProgress>,
    on_receive: Option<OnProgress>,
}

impl ProgressExchange {
    pub fn new(
        inner: Arc<dyn Exchange>,
        on_send: Option<OnProgress>,
        on_receive: Option<OnProgress>,
    ) -> Self {
        Self {
            inner,
            on_send,
            on_receive,
        }
    }
}

#[async_trait]
impl Exchange for ProgressExchange {
    async fn exchange(&self, mut request: WireRequest) -> Result<HttpResponse, NetError> {
        if let Some(on_send) = &self.on_send {
            if let RequestBody::Bytes(bytes) = &request.body {
                let bytes = bytes.clone();
                let len = bytes.len() as u64;
                request.body = RequestBody::Stream {
                    body: ProgressBody::send(bytes, on_send.clone()).boxed(),
                    len,
                };
            }
        }

        let response = self.inner.exchange(request).await?;

        Ok(match &self.on_receive {
            Some(on_receive) => {
                let listener = on_receive.clone();
                response.map_body(|body| {
                    body.map_inner(|inner| ProgressBody::receive(inner, listener).boxed())
                })
            }
            None => response,
        })
    }
}

/// Progress forwarded into a bounded channel.
///
/// Reports are dropped rather than awaited when the receiver lags behind.
/// The channel closes when the owning work finishes.
#[derive(Clone)]
pub struct ProgressChannel {
    sender: Arc<Mutex<Option<mpsc::Sender<Progress>>>>,
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Progress>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    pub fn offer(&self, progress: Progress) {
        if let Ok(guard) = self.sender.lock() {
            if let Some(sender) = guard.as_ref() {
                let _ = sender.try_send(progress);
            }
        }
    }

    /// A listener that offers into this channel.
    pub fn listener(&self) -> OnProgress {
        let channel = self.clone();
        Arc::new(move |bytes_so_far, total, done| {
            channel.offer(Progress {
                bytes_so_far,
                total,
                done,
            })
        })
    }

    pub fn close(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (OnProgress, Arc<Mutex<Vec<(u64, Option<u64>, bool)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let listener: OnProgress = Arc::new(move |a, b, c| sink.lock().unwrap().push((a, b, c)));
        (listener, calls)
    }

    #[tokio::test]
    async fn test_send_progress_chunks() {
        let (listener, calls) = recorder();
        let data = Bytes::from(vec![7u8; SEND_CHUNK_SIZE * 2 + 10]);
        let body = ProgressBody::send(data.clone(), listener);
        assert_eq!(body.size_hint().exact(), Some(data.len() as u64));

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, data);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(!calls[0].2);
        let total = data.len() as u64;
        assert_eq!(calls[2], (total, Some(total), true));
        assert_eq!(calls.iter().filter(|c| c.2).count(), 1);
    }

    #[tokio::test]
    async fn test_receive_done_at_end_of_stream() {
        let (listener, calls) = recorder();
        let inner = http_body_util::Full::new(Bytes::from_static(b"hello"))
            .map_err(|never| match never {})
            .boxed();
        let body = ProgressBody::receive(inner, listener);
        body.collect().await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.first(), Some(&(5, Some(5), false)));
        assert_eq!(calls.last(), Some(&(5, Some(5), true)));
    }

    #[tokio::test]
    async fn test_empty_send_reports_done() {
        let (listener, calls) = recorder();
        ProgressBody::send(Bytes::new(), listener)
            .collect()
            .await
            .unwrap();
        assert_eq!(calls.lock().unwrap().as_slice(), &[(0, Some(0), true)]);
    }

    #[tokio::test]
    async fn test_panicking_listener_is_contained() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let listener: OnProgress = Arc::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("listener failure");
        });
        let data = ProgressBody::send(Bytes::from_static(b"abc"), listener)
            .collect()
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(data, Bytes::from_static(b"abc"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fraction() {
        let p = Progress {
            bytes_so_far: 25,
            total: Some(100),
            done: false,
        };
        assert_eq!(p.fraction(), Some(0.25));
        let unknown = Progress { total: None, ..p };
        assert_eq!(unknown.fraction(), None);
    }

    #[tokio::test]
    async fn test_channel_closes() {
        let (channel, mut rx) = ProgressChannel::new(8);
        let listener = channel.listener();
        listener(1, Some(2), false);
        listener(2, Some(2), true);
        channel.close();
        listener(3, Some(3), true);

        assert_eq!(rx.recv().await.map(|p| p.bytes_so_far), Some(1));
        assert_eq!(rx.recv().await.map(|p| p.done), Some(true));
        assert!(rx.recv().await.is_none());
    }
}
