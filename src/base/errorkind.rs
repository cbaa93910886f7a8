//! Failure classification for a work execution.

use std::fmt;
use thiserror::Error;

/// Error type returned by fallible [`Work`](crate::work::Work) hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Why a work execution did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Parameter validation failed, or the call could not be constructed.
    Params,
    /// Low-level I/O failure that is neither a timeout nor a cancellation.
    Network,
    /// Connect, read or write timeout.
    Timeout,
    /// The server answered with a non-2xx status.
    Response,
    /// The business-success predicate rejected a 2xx response.
    Task,
    /// The response body could not be converted.
    Parse,
    /// The execution was cancelled.
    Cancel,
    /// Any other failure raised by a hook.
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Params => "params",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Response => "response",
            ErrorKind::Task => "task",
            ErrorKind::Parse => "parse",
            ErrorKind::Cancel => "cancel",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure travelling through the lifecycle engine.
///
/// `message` is what ends up in [`WorkData::message`](crate::work::WorkData::message);
/// `source` is only logged.
#[derive(Debug, Error)]
#[error("{kind} failure{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct WorkError {
    pub kind: ErrorKind,
    pub message: Option<String>,
    #[source]
    pub source: Option<HookError>,
}

impl WorkError {
    pub fn new(kind: ErrorKind, message: Option<String>) -> Self {
        Self {
            kind,
            message,
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<HookError>,
    {
        self.source = Some(source.into());
        self
    }

    pub fn canceled() -> Self {
        Self::new(ErrorKind::Cancel, None)
    }

    /// Wrap an error raised by a hook that has no dedicated classification.
    pub fn other(source: HookError) -> Self {
        Self {
            kind: ErrorKind::Other,
            message: Some(source.to_string()),
            source: Some(source),
        }
    }
}
