//! Immediate re-send of failed attempts.
//!
//! An attempt fails when the exchange errors or the response status is not
//! 2xx. Cancellation is never retried. Attempts follow each other without
//! backoff; a task that wants spacing should wrap its own transport.

use async_trait::async_trait;
use std::sync::Arc;

use crate::base::log::log_w;
use crate::base::neterror::NetError;
use crate::http::response::HttpResponse;
use crate::http::transport::{Exchange, WireRequest};

/// Why an attempt is being repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The exchange failed before a response arrived.
    Failed(String),
    /// The server answered with a non-2xx status.
    Status(u16),
}

impl RetryReason {
    /// `None` when the outcome must be returned as-is.
    pub fn from_outcome(outcome: &Result<HttpResponse, NetError>) -> Option<Self> {
        match outcome {
            Ok(response) if response.is_success() => None,
            Ok(response) => Some(Self::Status(response.status().as_u16())),
            Err(e) if e.is_canceled() => None,
            Err(e) => Some(Self::Failed(e.to_string())),
        }
    }
}

/// Check if we should retry based on attempt count.
///
/// `attempt` is zero-based, so `retry = 2` permits attempts 0, 1 and 2.
pub fn should_retry(attempt: u32, retry: u32) -> bool {
    attempt < retry
}

/// Exchange layer making up to `retry + 1` attempts.
pub struct RetryExchange {
    inner: Arc<dyn Exchange>,
    retry: u32,
}

impl RetryExchange {
    pub fn new(inner: Arc<dyn Exchange>, retry: u32) -> Self {
        Self { inner, retry }
    }
}

#[async_trait]
impl Exchange for RetryExchange {
    async fn exchange(&self, request: WireRequest) -> Result<HttpResponse, NetError> {
        let url = request.url.to_string();
        let mut attempt = 0;

        loop {
            // The last attempt, or one whose body cannot be replayed, consumes
            // the request itself.
            let copy = if should_retry(attempt, self.retry) {
                request.try_clone()
            } else {
                None
            };
            let Some(current) = copy else {
                return self.inner.exchange(request).await;
            };

            let outcome = self.inner.exchange(current).await;
            match RetryReason::from_outcome(&outcome) {
                None => return outcome,
                Some(reason) => {
                    attempt += 1;
                    log_w(
                        "retry",
                        &format!("retrying {} (attempt {}/{})", url, attempt + 1, self.retry + 1),
                        Some(&reason),
                    );
                }
            }
        }
    }
}
