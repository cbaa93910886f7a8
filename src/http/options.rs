//! Per-execution request options.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::http::params::{ListFormat, ParamValue};

/// Progress listener: `(bytes_so_far, total_bytes, done)`.
///
/// `total_bytes` is `None` when the peer did not announce a length. The
/// listener runs on the I/O path; a panic inside it is caught and discarded.
pub type OnProgress = Arc<dyn Fn(u64, Option<u64>, bool) + Send + Sync>;

/// Request headers in insertion order.
pub type Headers = IndexMap<String, String>;

/// HTTP methods a work can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// GET and HEAD put their parameters in the query string instead of a body.
    pub fn has_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }

    pub fn to_http(&self) -> http::Method {
        match self {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Head => http::Method::HEAD,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request configuration for one execution.
///
/// Assembled by the engine from the work's hooks, adjustable once in
/// `Work::post_options`, then frozen behind an `Arc` for the call.
///
/// Timeouts: `None` uses the [`WorkConfig`](crate::config::WorkConfig) value,
/// `Some(Duration::ZERO)` disables the timeout.
#[derive(Clone, Default)]
pub struct Options {
    /// Relative (joined to the config's base URL) or absolute URL.
    pub url: String,
    pub params: ParamValue,
    pub method: HttpMethod,
    /// Extra attempts after the first one.
    pub retry: u32,
    pub config_key: Option<String>,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    /// When set, replaces the config's default headers entirely.
    pub headers: Option<Headers>,
    /// Overrides the config's default content type.
    pub content_type: Option<String>,
    /// Overrides the config's list format.
    pub list_format: Option<ListFormat>,
    /// Ignored for GET and HEAD.
    pub on_send_progress: Option<OnProgress>,
    pub on_receive_progress: Option<OnProgress>,
}

impl Options {
    pub fn new<U: Into<String>>(url: U, params: ParamValue) -> Self {
        Self {
            url: url.into(),
            params,
            ..Default::default()
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .finish()
    }
}
