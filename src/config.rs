//! Named configuration bundles.
//!
//! A [`WorkConfig`] bundles the transport and request defaults shared by a
//! family of works. Configs are registered once under a key, typically at
//! startup, and selected per work through `Work::config_key`. Unknown or
//! absent keys resolve to the default config.
//!
//! # Example
//!
//! ```rust,ignore
//! use httpwork::config::WorkConfig;
//!
//! WorkConfig::set_default(
//!     WorkConfig::builder()
//!         .base_url("https://api.example.com/v1/")
//!         .default_header("User-Agent", "my-app")
//!         .build(),
//! );
//! WorkConfig::register(
//!     "uploads",
//!     WorkConfig::builder()
//!         .base_url("https://upload.example.com/")
//!         .default_content_type("multipart/form-data")
//!         .build(),
//! );
//! ```

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

use crate::base::log::log_d;
use crate::base::neterror::NetError;
use crate::http::options::Headers;
use crate::http::params::ListFormat;
use crate::http::serializer::FORM_URLENCODED;
use crate::http::transport::{HttpTransport, Transport};

static REGISTRY: Lazy<DashMap<String, Arc<WorkConfig>>> = Lazy::new(DashMap::new);

static DEFAULT: Lazy<RwLock<Arc<WorkConfig>>> =
    Lazy::new(|| RwLock::new(Arc::new(WorkConfig::builder().build())));

/// Transport and request defaults for a family of works.
///
/// Immutable once built; share it through an `Arc`.
#[derive(Clone)]
pub struct WorkConfig {
    transport: Option<Arc<dyn Transport>>,
    default_content_type: String,
    base_url: Option<Result<Url, url::ParseError>>,
    list_format: ListFormat,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    default_headers: Headers,
}

impl WorkConfig {
    pub fn builder() -> WorkConfigBuilder {
        WorkConfigBuilder::default()
    }

    /// The configured transport, or the shared [`HttpTransport`].
    pub fn transport(&self) -> Result<Arc<dyn Transport>, NetError> {
        match &self.transport {
            Some(transport) => Ok(transport.clone()),
            None => Ok(HttpTransport::shared()?),
        }
    }

    pub fn default_content_type(&self) -> &str {
        &self.default_content_type
    }

    /// The base URL; an unparsable one fails every relative request.
    pub fn base_url(&self) -> Result<Option<&Url>, NetError> {
        match &self.base_url {
            None => Ok(None),
            Some(Ok(url)) => Ok(Some(url)),
            Some(Err(e)) => Err(NetError::from(*e)),
        }
    }

    pub fn list_format(&self) -> ListFormat {
        self.list_format
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    /// Replace the default config.
    pub fn set_default(config: WorkConfig) {
        if let Ok(mut default) = DEFAULT.write() {
            *default = Arc::new(config);
        }
    }

    pub fn default_config() -> Arc<WorkConfig> {
        match DEFAULT.read() {
            Ok(default) => default.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Register `config` under `key`, replacing any previous entry.
    pub fn register<K: Into<String>>(key: K, config: WorkConfig) {
        let key = key.into();
        log_d("config", "register", Some(&key));
        REGISTRY.insert(key, Arc::new(config));
    }

    pub fn unregister(key: &str) -> Option<Arc<WorkConfig>> {
        REGISTRY.remove(key).map(|(_, config)| config)
    }

    /// The config registered under `key`, falling back to the default.
    pub fn lookup(key: Option<&str>) -> Arc<WorkConfig> {
        key.and_then(|key| REGISTRY.get(key).map(|entry| entry.value().clone()))
            .unwrap_or_else(WorkConfig::default_config)
    }
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for WorkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkConfig")
            .field("base_url", &self.base_url)
            .field("default_content_type", &self.default_content_type)
            .field("list_format", &self.list_format)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("default_headers", &self.default_headers)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

/// Builder for [`WorkConfig`].
pub struct WorkConfigBuilder {
    config: WorkConfig,
}

impl Default for WorkConfigBuilder {
    fn default() -> Self {
        Self {
            config: WorkConfig {
                transport: None,
                default_content_type: FORM_URLENCODED.to_string(),
                base_url: None,
                list_format: ListFormat::Multi,
                connect_timeout: Some(Duration::from_secs(10)),
                read_timeout: Some(Duration::from_secs(30)),
                write_timeout: Some(Duration::from_secs(30)),
                default_headers: Headers::new(),
            },
        }
    }
}

impl WorkConfigBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn default_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.config.default_content_type = content_type.into();
        self
    }

    pub fn base_url<U: AsRef<str>>(mut self, url: U) -> Self {
        self.config.base_url = Some(Url::parse(url.as_ref()));
        self
    }

    pub fn list_format(mut self, format: ListFormat) -> Self {
        self.config.list_format = format;
        self
    }

    /// `Duration::ZERO` disables the timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = non_zero(timeout);
        self
    }

    /// `Duration::ZERO` disables the timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = non_zero(timeout);
        self
    }

    /// `Duration::ZERO` disables the timeout.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = non_zero(timeout);
        self
    }

    pub fn default_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.config.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn default_headers(mut self, headers: Headers) -> Self {
        self.config.default_headers = headers;
        self
    }

    pub fn build(self) -> WorkConfig {
        self.config
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}
