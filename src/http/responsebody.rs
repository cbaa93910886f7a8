//! Response body streaming.

use bytes::{Bytes, BytesMut};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use std::fmt;
use std::time::Duration;

use crate::base::neterror::NetError;

/// Response body handed to `Work::convert_response`.
///
/// Each frame read is bounded by the call's read timeout, so a stalled peer
/// surfaces as [`NetError::TimedOut`].
pub struct ResponseBody {
    inner: BoxBody<Bytes, NetError>,
    read_timeout: Option<Duration>,
}

impl ResponseBody {
    pub fn new(inner: BoxBody<Bytes, NetError>) -> Self {
        Self {
            inner,
            read_timeout: None,
        }
    }

    /// A fully buffered body, mostly for fake transports.
    pub fn from_bytes<B: Into<Bytes>>(bytes: B) -> Self {
        Self::new(Full::new(bytes.into()).map_err(|never| match never {}).boxed())
    }

    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new().map_err(|never| match never {}).boxed())
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Announced length, if the peer sent one.
    pub fn content_length(&self) -> Option<u64> {
        http_body::Body::size_hint(&self.inner).exact()
    }

    /// Read the next data chunk; `None` at end of stream.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, NetError> {
        loop {
            let next = match self.read_timeout {
                Some(limit) => tokio::time::timeout(limit, self.inner.frame()).await?,
                None => self.inner.frame().await,
            };
            match next {
                None => return Ok(None),
                Some(frame) => {
                    if let Ok(data) = frame?.into_data() {
                        return Ok(Some(data));
                    }
                }
            }
        }
    }

    /// Read entire body as bytes.
    pub async fn bytes(mut self) -> Result<Bytes, NetError> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }

    /// Read body as UTF-8 string.
    pub async fn text(self) -> Result<String, NetError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    /// Read body as JSON, deserializing to type T.
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, NetError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| NetError::JsonParseError(e.to_string()))
    }

    /// Wrap the underlying stream, keeping the read timeout.
    pub fn map_inner<F>(self, f: F) -> Self
    where
        F: FnOnce(BoxBody<Bytes, NetError>) -> BoxBody<Bytes, NetError>,
    {
        Self {
            inner: f(self.inner),
            read_timeout: self.read_timeout,
        }
    }

    pub fn into_inner(self) -> BoxBody<Bytes, NetError> {
        self.inner
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("content_length", &self.content_length())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http_body::Frame;
    use http_body_util::StreamBody;

    #[tokio::test]
    async fn test_text_and_json() {
        let body = ResponseBody::from_bytes(r#"{"a":1}"#);
        assert_eq!(body.content_length(), Some(7));
        let value: serde_json::Value = body.json().await.unwrap();
        assert_eq!(value["a"], 1);

        let text = ResponseBody::from_bytes("hello").text().await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let err = ResponseBody::from_bytes(vec![0xffu8, 0xfe]).text().await.unwrap_err();
        assert!(matches!(err, NetError::InvalidUtf8));
    }

    #[tokio::test]
    async fn test_chunks_are_concatenated() {
        let frames = stream::iter(vec![
            Ok::<_, NetError>(Frame::data(Bytes::from_static(b"ab"))),
            Ok(Frame::data(Bytes::from_static(b"cd"))),
        ]);
        let body = ResponseBody::new(StreamBody::new(frames).boxed());
        assert_eq!(body.bytes().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_body_times_out() {
        let frames = stream::pending::<Result<Frame<Bytes>, NetError>>();
        let body = ResponseBody::new(StreamBody::new(frames).boxed())
            .with_read_timeout(Some(Duration::from_millis(50)));
        let err = body.bytes().await.unwrap_err();
        assert!(err.is_timeout());
    }
}
