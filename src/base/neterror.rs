use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::http::builder::BuildError;

/// Transport-level failure produced while building or running a call.
///
/// The lifecycle engine never exposes these directly; it folds them into an
/// [`ErrorKind`](crate::base::errorkind::ErrorKind) via [`NetError::is_timeout`]
/// and [`NetError::is_canceled`].
#[derive(Debug, Error)]
pub enum NetError {
    // Request construction
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unknown URL scheme: {0}")]
    UnknownUrlScheme(String),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Request build failed: {0}")]
    Build(#[from] BuildError),
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("TLS setup failed: {0}")]
    TlsInit(String),

    // Connection Errors
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Connection reset")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Connection timed out")]
    ConnectionTimedOut,

    // Exchange Errors
    #[error("timeout")]
    TimedOut,
    #[error("Canceled")]
    Canceled,
    #[error("Call already executed")]
    AlreadyExecuted,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Response body read failed: {0}")]
    HttpBodyError(String),
    #[error("Invalid UTF-8 in response body")]
    InvalidUtf8,
    #[error("JSON parse error: {0}")]
    JsonParseError(String),
    #[error("I/O error ({kind:?}): {message}")]
    Io {
        kind: io::ErrorKind,
        message: String,
    },
}

impl NetError {
    /// Whether this failure is attributable to a connect, read or write timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            NetError::ConnectionTimedOut | NetError::TimedOut => true,
            NetError::Io { kind, .. } => *kind == io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// Whether this failure was caused by cancelling the call.
    ///
    /// Cancellation errors are never retried.
    pub fn is_canceled(&self) -> bool {
        matches!(self, NetError::Canceled)
    }

    /// Chromium-style numeric code, logged next to transport failures.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Canceled => -3,
            NetError::AlreadyExecuted => -1,
            NetError::InvalidHeader(_) | NetError::Build(_) => -4,
            NetError::FileRead { .. } => -6,
            NetError::TimedOut => -7,
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionFailed(_) => -104,
            NetError::TlsInit(_) => -107,
            NetError::ConnectionTimedOut => -118,
            NetError::InvalidUrl(_) => -300,
            NetError::UnknownUrlScheme(_) => -302,
            NetError::InvalidResponse(_) => -320,
            NetError::HttpBodyError(_) | NetError::InvalidUtf8 | NetError::JsonParseError(_) => {
                -2
            }
            NetError::Io { .. } => -2,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
            io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe => {
                NetError::ConnectionClosed
            }
            io::ErrorKind::TimedOut => NetError::TimedOut,
            kind => NetError::Io {
                kind,
                message: e.to_string(),
            },
        }
    }
}

impl From<url::ParseError> for NetError {
    fn from(e: url::ParseError) -> Self {
        NetError::InvalidUrl(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for NetError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        NetError::TimedOut
    }
}
