//! Request construction and the transport stack.
//!
//! - [`params`] and [`serializer`]: parameter values and their flattening
//! - [`builder`] and [`multipart`]: URL, header and body assembly
//! - [`transport`]: the `Transport` / `Call` / `Exchange` seams
//! - [`retry`] and [`progress`]: exchange decorators
//! - [`hyperexchange`]: the hyper backend

pub mod builder;
pub mod hyperexchange;
pub mod multipart;
pub mod options;
pub mod params;
pub mod progress;
pub mod requestbody;
pub mod response;
pub mod responsebody;
pub mod retry;
pub mod serializer;
pub mod transport;

// Re-exports for convenience
pub use options::{HttpMethod, OnProgress, Options};
pub use params::{ParamValue, Value};
pub use requestbody::RequestBody;
pub use response::{HttpMeta, HttpResponse};
pub use responsebody::ResponseBody;
pub use transport::{Call, Exchange, HttpTransport, Transport, WireRequest};
