//! HTTP response with body access.

use http::{HeaderMap, StatusCode, Version};

use crate::base::neterror::NetError;
use crate::http::responsebody::ResponseBody;

/// Response returned by a [`Call`](crate::http::transport::Call).
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Option<ResponseBody>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers,
            body: Some(body),
        }
    }

    /// Build from an `http::Response` whose body is already boxed.
    pub fn from_http(resp: http::Response<ResponseBody>) -> Self {
        let (parts, body) = resp.into_parts();
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body: Some(body),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status line and headers, detached from the body.
    pub fn meta(&self) -> HttpMeta {
        HttpMeta {
            success: self.is_success(),
            status: self.status,
            headers: self.headers.clone(),
        }
    }

    /// Take the response body for consumption.
    /// Can only be called once; later calls return None.
    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    /// Replace the body, used by layers that wrap the stream.
    pub fn map_body<F>(mut self, f: F) -> Self
    where
        F: FnOnce(ResponseBody) -> ResponseBody,
    {
        self.body = self.body.take().map(f);
        self
    }

    pub async fn bytes(mut self) -> Result<bytes::Bytes, NetError> {
        match self.body.take() {
            Some(body) => body.bytes().await,
            None => Ok(bytes::Bytes::new()),
        }
    }

    pub async fn text(mut self) -> Result<String, NetError> {
        match self.body.take() {
            Some(body) => body.text().await,
            None => Ok(String::new()),
        }
    }
}

/// The parts of a response a work keeps after the body is consumed.
#[derive(Debug, Clone)]
pub struct HttpMeta {
    pub success: bool,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_meta_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert("x-id", "7".parse().unwrap());
        let mut resp = HttpResponse::new(
            StatusCode::CREATED,
            headers,
            ResponseBody::from_bytes("done"),
        );

        let meta = resp.meta();
        assert!(meta.success);
        assert_eq!(meta.status, StatusCode::CREATED);
        assert_eq!(meta.headers["x-id"], "7");

        let body = resp.take_body().unwrap();
        assert!(resp.take_body().is_none());
        assert_eq!(body.text().await.unwrap(), "done");
    }

    #[test]
    fn test_non_2xx_is_not_success() {
        let resp = HttpResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            ResponseBody::empty(),
        );
        assert!(!resp.is_success());
        assert!(!resp.meta().success);
    }
}
