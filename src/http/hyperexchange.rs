//! The network backend: hyper's pooled client over rustls.
//!
//! Timeouts map onto the client as follows:
//! - connect: the TCP connector's connect timeout
//! - write + read: the wait for the response head, body upload included;
//!   whichever one is set when the other is disabled
//! - read: every frame of the response body

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;

#[cfg(feature = "rustls")]
use crate::base::log::log_w;
#[cfg(feature = "rustls")]
use std::sync::Arc;
use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;
use crate::http::responsebody::ResponseBody;
use crate::http::transport::{Exchange, Timeouts, WireRequest};

/// Connect timeout of the default client.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE_PER_HOST: usize = 10;

#[cfg(feature = "rustls")]
type Connector = hyper_rustls::HttpsConnector<HttpConnector>;
#[cfg(not(feature = "rustls"))]
type Connector = HttpConnector;

type HyperClient = Client<Connector, BoxBody<Bytes, NetError>>;

/// [`Exchange`] backed by `hyper_util`'s legacy client.
///
/// Clients are keyed by connect timeout because the timeout belongs to the
/// connector; requests with the default timeout share one pool.
pub struct HyperExchange {
    default_client: HyperClient,
    by_connect_timeout: DashMap<Option<Duration>, HyperClient>,
}

impl HyperExchange {
    pub fn new() -> Result<Self, NetError> {
        Ok(Self {
            default_client: build_client(Some(DEFAULT_CONNECT_TIMEOUT))?,
            by_connect_timeout: DashMap::new(),
        })
    }

    fn client_for(&self, connect_timeout: Option<Duration>) -> Result<HyperClient, NetError> {
        if connect_timeout == Some(DEFAULT_CONNECT_TIMEOUT) {
            return Ok(self.default_client.clone());
        }
        if let Some(client) = self.by_connect_timeout.get(&connect_timeout) {
            return Ok(client.clone());
        }
        let client = build_client(connect_timeout)?;
        self.by_connect_timeout
            .insert(connect_timeout, client.clone());
        Ok(client)
    }
}

fn build_client(connect_timeout: Option<Duration>) -> Result<HyperClient, NetError> {
    let mut http = HttpConnector::new();
    http.set_connect_timeout(connect_timeout);

    #[cfg(feature = "rustls")]
    let connector = {
        // Idempotent; fails only when another provider was installed first.
        let _ = rustls::crypto::ring::default_provider().install_default();
        http.enforce_http(false);
        let builder = match hyper_rustls::HttpsConnectorBuilder::new().with_native_roots() {
            Ok(builder) => builder,
            Err(e) => {
                // Plain http keeps working; https fails certificate validation.
                log_w("transport", "no native root certificates", Some(&e));
                let tls = rustls::ClientConfig::builder_with_provider(Arc::new(
                    rustls::crypto::ring::default_provider(),
                ))
                .with_safe_default_protocol_versions()
                .map_err(|e| NetError::TlsInit(e.to_string()))?
                .with_root_certificates(rustls::RootCertStore::empty())
                .with_no_client_auth();
                hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(tls)
            }
        };
        builder
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http)
    };
    #[cfg(not(feature = "rustls"))]
    let connector = http;

    Ok(Client::builder(TokioExecutor::new())
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build(connector))
}

fn head_timeout(timeouts: &Timeouts) -> Option<Duration> {
    match (timeouts.write, timeouts.read) {
        (Some(write), Some(read)) => Some(write + read),
        (write, read) => read.or(write),
    }
}

#[async_trait]
impl Exchange for HyperExchange {
    async fn exchange(&self, request: WireRequest) -> Result<HttpResponse, NetError> {
        let client = self.client_for(request.timeouts.connect)?;
        let read_timeout = request.timeouts.read;
        let head_limit = head_timeout(&request.timeouts);

        let uri: http::Uri = request
            .url
            .as_str()
            .parse()
            .map_err(|_| NetError::InvalidUrl(request.url.to_string()))?;

        let mut builder = http::Request::builder().method(request.method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = request.headers;
        }
        let http_request = builder
            .body(request.body.into_box_body())
            .map_err(|e| NetError::InvalidHeader(e.to_string()))?;

        let pending = client.request(http_request);
        let result = match head_limit {
            Some(limit) => tokio::time::timeout(limit, pending).await?,
            None => pending.await,
        };
        let response = result.map_err(|e| classify(&e))?;

        Ok(HttpResponse::from_http(response.map(|incoming| {
            ResponseBody::new(incoming.map_err(|e| body_error(&e)).boxed())
                .with_read_timeout(read_timeout)
        })))
    }
}

fn chain<'a>(err: &'a (dyn StdError + 'static)) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    let mut next = Some(err);
    std::iter::from_fn(move || {
        let current = next?;
        next = current.source();
        Some(current)
    })
}

fn describe(err: &(dyn StdError + 'static)) -> String {
    chain(err)
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

fn find_io<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    chain(err).find_map(|e| e.downcast_ref::<io::Error>())
}

fn find_hyper<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a hyper::Error> {
    chain(err).find_map(|e| e.downcast_ref::<hyper::Error>())
}

/// Map a client error onto a [`NetError`].
fn classify(err: &hyper_util::client::legacy::Error) -> NetError {
    let err: &(dyn StdError + 'static) = err;

    if let Some(io) = find_io(err) {
        match io.kind() {
            io::ErrorKind::TimedOut => return NetError::ConnectionTimedOut,
            io::ErrorKind::ConnectionRefused => return NetError::ConnectionRefused,
            io::ErrorKind::ConnectionReset => return NetError::ConnectionReset,
            _ => {}
        }
    }

    if let Some(hyper) = find_hyper(err) {
        if hyper.is_timeout() {
            return NetError::TimedOut;
        }
        if hyper.is_incomplete_message() || hyper.is_canceled() || hyper.is_closed() {
            return NetError::ConnectionClosed;
        }
        if hyper.is_parse() {
            return NetError::InvalidResponse(describe(err));
        }
    }

    NetError::ConnectionFailed(describe(err))
}

fn body_error(err: &hyper::Error) -> NetError {
    let err: &(dyn StdError + 'static) = err;
    match find_io(err) {
        Some(io) if io.kind() == io::ErrorKind::TimedOut => NetError::TimedOut,
        Some(io) if io.kind() == io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
        _ => NetError::HttpBodyError(describe(err)),
    }
}
