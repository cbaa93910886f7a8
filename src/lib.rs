//! # httpwork
//!
//! A lifecycle-driven HTTP task engine.
//!
//! `httpwork` wraps a single HTTP request in a [`Work`]: a trait whose hooks
//! validate inputs, short-circuit from a cache, describe the request, decode
//! the response and decide business success. The engine runs those hooks in a
//! fixed order and folds every failure into an [`ErrorKind`] on the returned
//! [`WorkData`], so callers branch on data instead of handling errors.
//!
//! ## Features
//!
//! - **Parameter serialization**: nested maps to query strings, urlencoded
//!   forms, multipart bodies (with file and byte attachments) or JSON, with
//!   selectable list formats
//! - **Retry**: up to N extra attempts on transport errors and non-2xx responses
//! - **Progress**: upload and download callbacks, or bounded channels
//! - **Cancellation**: a `CancellationToken` aborts the in-flight request
//! - **Named configs**: base URL, content type, timeouts, headers and transport
//!   per key, looked up by each work
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use httpwork::prelude::*;
//!
//! struct Login { user: String }
//!
//! #[async_trait]
//! impl Work for Login {
//!     type Output = String;
//!     type Intermediate = serde_json::Value;
//!
//!     fn url(&self) -> String { "/login".into() }
//!     fn method(&self) -> HttpMethod { HttpMethod::Post }
//!
//!     async fn fill_params(&self) -> Result<ParamValue, HookError> {
//!         Ok(params! { "user" => self.user.as_str() }.into())
//!     }
//!
//!     async fn convert_response(
//!         &self,
//!         _data: &WorkData<String>,
//!         body: ResponseBody,
//!     ) -> Result<serde_json::Value, HookError> {
//!         Ok(body.json().await?)
//!     }
//!
//!     async fn request_result(&self, _d: &WorkData<String>, r: &serde_json::Value) -> bool {
//!         r["ok"] == true
//!     }
//!
//!     async fn request_successful(
//!         &self,
//!         _d: &WorkData<String>,
//!         r: &serde_json::Value,
//!     ) -> Result<Option<String>, HookError> {
//!         Ok(r["token"].as_str().map(String::from))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     WorkConfig::set_default(
//!         WorkConfig::builder().base_url("https://api.example.com/").build(),
//!     );
//!     let data = Login { user: "alice".into() }.start(1).await;
//!     println!("{} {:?}", data.success(), data.result());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types, lifecycle states and the logging seam
//! - [`config`] - Named configuration registry
//! - [`http`] - Parameters, serialization, request building and transport
//! - [`work`] - The `Work` trait, lifecycle engine and execution helpers

pub mod base;
pub mod config;
pub mod http;
pub mod work;

pub use base::errorkind::{ErrorKind, HookError};
pub use base::log::{set_debug, set_work_log, WorkLog};
pub use base::neterror::NetError;
pub use config::WorkConfig;
pub use work::{launch, ExecuteOptions, Work, WorkData, WorkExt};

/// Everything a work implementation usually needs.
pub mod prelude {
    pub use crate::base::errorkind::{ErrorKind, HookError};
    pub use crate::config::WorkConfig;
    pub use crate::http::options::{Headers, HttpMethod, Options};
    pub use crate::http::params::{
        BytesAttachment, FileAttachment, ListFormat, ListParams, Map, ParamValue, Value,
    };
    pub use crate::http::responsebody::ResponseBody;
    pub use crate::params;
    pub use crate::work::{ExecuteOptions, Work, WorkData, WorkExt};
    pub use async_trait::async_trait;
}
