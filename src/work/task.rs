//! The [`Work`] trait: one HTTP request wrapped in lifecycle hooks.
//!
//! A concrete work supplies the request description ([`Work::url`],
//! [`Work::fill_params`]) and the response handling
//! ([`Work::convert_response`], [`Work::request_result`],
//! [`Work::request_successful`]). Every other hook has a default.
//!
//! Projects usually put their protocol envelope (status field, message field,
//! JSON decoding) into one intermediate trait implementation and derive the
//! individual works from that.
//!
//! Hook order for one execution:
//!
//! ```text
//! check_params -> started -> url / method / fill_params / content_type
//!   / config_key / headers -> post_options -> config -> transport
//!   -> convert_response -> request_result
//!   -> request_successful | request_failed
//!   -> on_successful | on_failed | on_canceled -> on_finished
//! ```

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::base::errorkind::HookError;
use crate::base::neterror::NetError;
use crate::config::WorkConfig;
use crate::http::options::{Headers, HttpMethod, Options};
use crate::http::params::ParamValue;
use crate::http::responsebody::ResponseBody;
use crate::http::transport::Transport;
use crate::work::data::WorkData;

/// A reusable, hook-driven HTTP task.
///
/// `Output` is the business result stored in [`WorkData::result`];
/// `Intermediate` is what [`Work::convert_response`] decodes the body into.
#[async_trait]
pub trait Work: Send + Sync {
    type Output: Send + Sync + 'static;
    type Intermediate: Send + Sync + fmt::Debug;

    /// Log tag, `"{TypeName}@{address}"` by default.
    fn tag(&self) -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base);
        format!("{}@{:x}", name, self as *const Self as *const () as usize)
    }

    /// Validate the work's inputs; `false` fails with `ErrorKind::Params`.
    async fn check_params(&self) -> bool {
        true
    }

    fn params_error(&self) -> Option<String> {
        None
    }

    /// Runs before any request. Returning `Some` completes the work as a
    /// cache hit without touching the network.
    async fn started(
        &self,
        _data: &mut WorkData<Self::Output>,
    ) -> Result<Option<Self::Output>, HookError> {
        Ok(None)
    }

    fn from_cache_message(&self, _data: &WorkData<Self::Output>) -> Option<String> {
        None
    }

    /// Relative to the config's base URL, or absolute.
    fn url(&self) -> String;

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    async fn fill_params(&self) -> Result<ParamValue, HookError>;

    /// `None` uses the config's default content type.
    fn content_type(&self) -> Option<String> {
        None
    }

    fn config_key(&self) -> Option<String> {
        None
    }

    /// `Some` replaces the config's default headers.
    async fn headers(&self) -> Result<Option<Headers>, HookError> {
        Ok(None)
    }

    /// Last chance to adjust the options before they are frozen.
    async fn post_options(&self, _options: &mut Options) -> Result<(), HookError> {
        Ok(())
    }

    /// The config for this request; registry lookup by `config_key` by default.
    fn config(&self, options: &Options) -> Arc<WorkConfig> {
        WorkConfig::lookup(options.config_key.as_deref())
    }

    fn transport(&self, config: &WorkConfig) -> Result<Arc<dyn Transport>, NetError> {
        config.transport()
    }

    /// Decode a 2xx response body. Errors fail with `ErrorKind::Parse`.
    async fn convert_response(
        &self,
        data: &WorkData<Self::Output>,
        body: ResponseBody,
    ) -> Result<Self::Intermediate, HookError>;

    /// Business success of a decoded response.
    async fn request_result(
        &self,
        data: &WorkData<Self::Output>,
        response: &Self::Intermediate,
    ) -> bool;

    async fn request_successful(
        &self,
        data: &WorkData<Self::Output>,
        response: &Self::Intermediate,
    ) -> Result<Option<Self::Output>, HookError>;

    fn request_successful_message(
        &self,
        _data: &WorkData<Self::Output>,
        _response: &Self::Intermediate,
    ) -> Option<String> {
        None
    }

    /// Fallback result kept when `request_result` is false.
    async fn request_failed(
        &self,
        _data: &WorkData<Self::Output>,
        _response: &Self::Intermediate,
    ) -> Result<Option<Self::Output>, HookError> {
        Ok(None)
    }

    fn request_failed_message(
        &self,
        _data: &WorkData<Self::Output>,
        _response: &Self::Intermediate,
    ) -> Option<String> {
        None
    }

    async fn parse_failed(&self, _data: &WorkData<Self::Output>) -> Option<String> {
        None
    }

    /// Message for a non-2xx response.
    fn network_request_failed(&self, _data: &WorkData<Self::Output>) -> Option<String> {
        None
    }

    /// Message for a transport failure or timeout.
    fn network_error(&self, _data: &WorkData<Self::Output>) -> Option<String> {
        None
    }

    async fn on_successful(&self, _data: &mut WorkData<Self::Output>) {}

    async fn on_failed(&self, _data: &mut WorkData<Self::Output>) {}

    async fn on_canceled(&self, _data: &mut WorkData<Self::Output>) {}

    /// Always runs last, whatever the outcome.
    async fn on_finished(&self, _data: &mut WorkData<Self::Output>) {}
}
