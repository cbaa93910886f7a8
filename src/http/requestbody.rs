//! Request body for POST/PUT/PATCH/DELETE operations.

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use std::fmt;

use crate::base::neterror::NetError;

/// Body of a wire request.
///
/// `Bytes` bodies can be re-sent by the retry layer; `Stream` bodies are
/// produced by the progress layer right before sending and are single-use.
#[derive(Default)]
pub enum RequestBody {
    /// No body (GET, HEAD).
    #[default]
    Empty,
    /// Body with raw bytes.
    Bytes(Bytes),
    /// A one-shot body of known length.
    Stream {
        body: BoxBody<Bytes, NetError>,
        len: u64,
    },
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes(Bytes::from(s))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Bytes(Bytes::from(s.to_owned()))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            RequestBody::Stream { len, .. } => write!(f, "Stream({len} bytes)"),
        }
    }
}

impl RequestBody {
    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the length of the body in bytes.
    pub fn len(&self) -> u64 {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Bytes(b) => b.len() as u64,
            RequestBody::Stream { len, .. } => *len,
        }
    }

    /// Clone a re-sendable body; `None` for streams.
    pub fn try_clone(&self) -> Option<Self> {
        match self {
            RequestBody::Empty => Some(RequestBody::Empty),
            RequestBody::Bytes(b) => Some(RequestBody::Bytes(b.clone())),
            RequestBody::Stream { .. } => None,
        }
    }

    /// Take the bytes out, leaving the body empty. Streams yield nothing.
    pub fn take_bytes(&mut self) -> Bytes {
        match std::mem::take(self) {
            RequestBody::Bytes(b) => b,
            RequestBody::Empty => Bytes::new(),
            stream @ RequestBody::Stream { .. } => {
                *self = stream;
                Bytes::new()
            }
        }
    }

    /// Convert into a boxed `http_body::Body` for the transport.
    pub fn into_box_body(self) -> BoxBody<Bytes, NetError> {
        match self {
            RequestBody::Empty => Empty::<Bytes>::new()
                .map_err(|never| match never {})
                .boxed(),
            RequestBody::Bytes(b) => Full::new(b).map_err(|never| match never {}).boxed(),
            RequestBody::Stream { body, .. } => body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body::Body;

    #[test]
    fn test_empty_body() {
        let body = RequestBody::Empty;
        assert!(body.is_empty());
        assert_eq!(body.len(), 0);
    }

    #[test]
    fn test_bytes_body() {
        let body = RequestBody::Bytes(Bytes::from("hello"));
        assert!(!body.is_empty());
        assert_eq!(body.len(), 5);
    }

    #[test]
    fn test_conversions() {
        let body: RequestBody = "hello world".to_string().into();
        assert_eq!(body.len(), 11);
        let body: RequestBody = "test".into();
        assert_eq!(body.len(), 4);
        let body: RequestBody = vec![1u8, 2, 3, 4].into();
        assert_eq!(body.len(), 4);
        let body: RequestBody = Bytes::from_static(b"raw").into();
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(RequestBody::default().is_empty());
    }

    #[test]
    fn test_try_clone() {
        let body: RequestBody = "data".into();
        let copy = body.try_clone().unwrap();
        assert_eq!(copy.len(), 4);

        let stream = RequestBody::Stream {
            body: RequestBody::from("data").into_box_body(),
            len: 4,
        };
        assert!(stream.try_clone().is_none());
    }

    #[test]
    fn test_take_bytes() {
        let mut body: RequestBody = "data".into();
        assert_eq!(body.take_bytes(), Bytes::from_static(b"data"));
        assert!(body.is_empty());
    }

    #[test]
    fn test_into_box_body_size_hint() {
        let full = RequestBody::from("test").into_box_body();
        assert_eq!(full.size_hint().exact(), Some(4));
        let empty = RequestBody::Empty.into_box_body();
        assert_eq!(empty.size_hint().exact(), Some(0));
    }
}
