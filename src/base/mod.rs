//! Base types and error handling.
//!
//! Provides the foundational types shared by the transport and the
//! lifecycle engine:
//! - [`NetError`](neterror::NetError): transport-level failures
//! - [`ErrorKind`](errorkind::ErrorKind): the classification surfaced to callers
//! - [`WorkState`](workstate::WorkState): lifecycle stages
//! - [`log`]: the replaceable logging seam

pub mod context;
pub mod errorkind;
pub mod log;
pub mod neterror;
pub mod workstate;
