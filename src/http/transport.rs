//! Transport seam between the work engine and the network.
//!
//! A [`Transport`] turns resolved [`Options`] into a cancellable [`Call`].
//! The default [`HttpTransport`] builds a [`WireRequest`] and sends it through
//! a stack of [`Exchange`] layers:
//!
//! ```text
//! RetryExchange -> ProgressExchange -> HyperExchange
//! ```
//!
//! Tests and embedders can substitute any layer, or the whole transport.

use async_trait::async_trait;
use http::{HeaderMap, Method};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::base::log::log_v;
use crate::base::neterror::NetError;
use crate::config::WorkConfig;
use crate::http::builder::build_request;
use crate::http::hyperexchange::HyperExchange;
use crate::http::options::Options;
use crate::http::progress::ProgressExchange;
use crate::http::requestbody::RequestBody;
use crate::http::response::HttpResponse;
use crate::http::retry::RetryExchange;

/// Effective timeouts of one request; `None` disables the limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Option<Duration>,
    pub read: Option<Duration>,
    pub write: Option<Duration>,
}

/// A fully resolved request ready to go on the wire.
#[derive(Debug)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeouts: Timeouts,
}

impl WireRequest {
    /// Copy for a re-send; `None` when the body is a one-shot stream.
    pub fn try_clone(&self) -> Option<Self> {
        Some(Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
            timeouts: self.timeouts,
        })
    }
}

/// One request/response exchange.
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn exchange(&self, request: WireRequest) -> Result<HttpResponse, NetError>;
}

/// A prepared, cancellable request.
#[async_trait]
pub trait Call: Send + Sync {
    fn url(&self) -> &str;

    /// Send the request. A call executes at most once.
    async fn execute(&self) -> Result<HttpResponse, NetError>;

    /// Abort a pending or running `execute`; it then fails with
    /// [`NetError::Canceled`].
    fn cancel(&self);
}

/// Factory for [`Call`]s.
///
/// Errors returned by `new_call` are reported as parameter failures: they
/// mean the request could not be constructed.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn new_call(
        &self,
        tag: &str,
        options: Arc<Options>,
        config: &WorkConfig,
    ) -> Result<Box<dyn Call>, NetError>;
}

/// The default transport, backed by hyper.
#[derive(Clone)]
pub struct HttpTransport {
    exchange: Arc<dyn Exchange>,
}

static SHARED: OnceCell<Arc<HttpTransport>> = OnceCell::new();

impl HttpTransport {
    pub fn new() -> Result<Self, NetError> {
        Ok(Self::with_exchange(Arc::new(HyperExchange::new()?)))
    }

    /// Use `exchange` as the innermost layer instead of hyper.
    pub fn with_exchange(exchange: Arc<dyn Exchange>) -> Self {
        Self { exchange }
    }

    /// Process-wide instance used by configs without their own transport.
    pub fn shared() -> Result<Arc<HttpTransport>, NetError> {
        SHARED
            .get_or_try_init(|| HttpTransport::new().map(Arc::new))
            .cloned()
    }

    fn layered(&self, options: &Options) -> Arc<dyn Exchange> {
        let mut exchange = self.exchange.clone();

        let on_send = options
            .on_send_progress
            .clone()
            .filter(|_| options.method.has_body());
        if on_send.is_some() || options.on_receive_progress.is_some() {
            exchange = Arc::new(ProgressExchange::new(
                exchange,
                on_send,
                options.on_receive_progress.clone(),
            ));
        }

        if options.retry > 0 {
            exchange = Arc::new(RetryExchange::new(exchange, options.retry));
        }

        exchange
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn new_call(
        &self,
        tag: &str,
        options: Arc<Options>,
        config: &WorkConfig,
    ) -> Result<Box<dyn Call>, NetError> {
        let request = build_request(config, &options).await?;
        log_v(tag, "request built", Some(&request));

        Ok(Box::new(HttpCall::new(request, self.layered(&options))))
    }
}

/// [`Call`] over an [`Exchange`] stack.
pub struct HttpCall {
    url: String,
    request: Mutex<Option<WireRequest>>,
    exchange: Arc<dyn Exchange>,
    token: CancellationToken,
}

impl HttpCall {
    pub fn new(request: WireRequest, exchange: Arc<dyn Exchange>) -> Self {
        Self {
            url: request.url.to_string(),
            request: Mutex::new(Some(request)),
            exchange,
            token: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Call for HttpCall {
    fn url(&self) -> &str {
        &self.url
    }

    async fn execute(&self) -> Result<HttpResponse, NetError> {
        let request = self
            .request
            .lock()
            .map_err(|_| NetError::AlreadyExecuted)?
            .take()
            .ok_or(NetError::AlreadyExecuted)?;

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(NetError::Canceled),
            result = self.exchange.exchange(request) => result,
        }
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::options::HttpMethod;
    use crate::http::responsebody::ResponseBody;
    use http::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Echo {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Exchange for Echo {
        async fn exchange(&self, request: WireRequest) -> Result<HttpResponse, NetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(
                StatusCode::OK,
                request.headers,
                ResponseBody::from_bytes(request.url.to_string()),
            ))
        }
    }

    struct Hang;

    #[async_trait]
    impl Exchange for Hang {
        async fn exchange(&self, _request: WireRequest) -> Result<HttpResponse, NetError> {
            futures::future::pending().await
        }
    }

    fn config() -> WorkConfig {
        WorkConfig::builder().base_url("http://example.com/api/").build()
    }

    #[tokio::test]
    async fn test_call_executes_once() {
        let echo = Arc::new(Echo {
            calls: AtomicU32::new(0),
        });
        let transport = HttpTransport::with_exchange(echo.clone());
        let options = Arc::new(Options::new("items", ().into()));
        let call = transport.new_call("t", options, &config()).await.unwrap();

        assert_eq!(call.url(), "http://example.com/api/items");
        let body = call.execute().await.unwrap().text().await.unwrap();
        assert_eq!(body, "http://example.com/api/items");
        assert!(matches!(
            call.execute().await,
            Err(NetError::AlreadyExecuted)
        ));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_aborts_execute() {
        let transport = HttpTransport::with_exchange(Arc::new(Hang));
        let options = Arc::new(Options::new("slow", ().into()));
        let call: Arc<dyn Call> = Arc::from(transport.new_call("t", options, &config()).await.unwrap());

        let runner = call.clone();
        let handle = tokio::spawn(async move { runner.execute().await });
        tokio::task::yield_now().await;
        call.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(NetError::Canceled)));
    }

    #[tokio::test]
    async fn test_build_failure_surfaces_from_new_call() {
        let transport = HttpTransport::with_exchange(Arc::new(Hang));
        let config = WorkConfig::builder().build();
        let options = Arc::new(Options::new("relative/only", ().into()));
        assert!(transport.new_call("t", options, &config).await.is_err());
    }

    #[tokio::test]
    async fn test_send_progress_skipped_for_get() {
        let transport = HttpTransport::with_exchange(Arc::new(Echo {
            calls: AtomicU32::new(0),
        }));
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();

        let mut options = Options::new("q", ().into());
        options.method = HttpMethod::Get;
        options.on_send_progress = Some(Arc::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let call = transport
            .new_call("t", Arc::new(options), &config())
            .await
            .unwrap();
        call.execute().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stream_request_cannot_be_cloned() {
        let request = WireRequest {
            method: Method::PUT,
            url: "http://example.com/".parse().unwrap(),
            headers: HeaderMap::new(),
            body: RequestBody::Stream {
                body: RequestBody::from("x").into_box_body(),
                len: 1,
            },
            timeouts: Timeouts::default(),
        };
        assert!(request.try_clone().is_none());
    }
}
