//! The lifecycle engine driving one execution of a [`Work`].
//!
//! Every failure is folded into an [`ErrorKind`] on the returned
//! [`WorkData`]; execution itself never fails, and a panicking hook is
//! reported as `ErrorKind::Other`. Exactly one of
//! `on_successful`, `on_failed` or `on_canceled` runs (none for a cache hit),
//! then `on_finished` always runs.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::base::errorkind::{ErrorKind, WorkError};
use crate::base::log::{log_d, log_i, log_v, log_w};
use crate::base::workstate::WorkState;
use crate::http::options::{OnProgress, Options};
use crate::http::responsebody::ResponseBody;
use crate::work::data::WorkData;
use crate::work::task::Work;

/// Execution-time parameters that are not part of the work itself.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// Extra attempts after the first one.
    pub retry: u32,
    pub on_send_progress: Option<OnProgress>,
    pub on_receive_progress: Option<OnProgress>,
    /// Cancelling this token aborts the execution with `ErrorKind::Cancel`.
    pub cancel: CancellationToken,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn on_send_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, Option<u64>, bool) + Send + Sync + 'static,
    {
        self.on_send_progress = Some(Arc::new(f));
        self
    }

    pub fn on_receive_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, Option<u64>, bool) + Send + Sync + 'static,
    {
        self.on_receive_progress = Some(Arc::new(f));
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Tracks the current [`WorkState`] and logs each transition.
struct Stage<'a> {
    tag: &'a str,
    state: WorkState,
}

impl<'a> Stage<'a> {
    fn new(tag: &'a str) -> Self {
        Self {
            tag,
            state: WorkState::Idle,
        }
    }

    fn advance(&mut self, next: WorkState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "{:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
        log_v(self.tag, next.as_str(), None);
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), WorkError> {
    if cancel.is_cancelled() {
        Err(WorkError::canceled())
    } else {
        Ok(())
    }
}

/// Run `work` once.
pub async fn execute<W>(work: &W, exec: ExecuteOptions) -> WorkData<W::Output>
where
    W: Work + ?Sized,
{
    let tag = work.tag();
    log_v(&tag, "work execute", None);

    let mut data = WorkData::new();
    let mut stage = Stage::new(&tag);

    let outcome = AssertUnwindSafe(drive(work, &tag, &exec, &mut data, &mut stage))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            log_w(&tag, "hook panicked", Some(&panic_message(panic.as_ref())));
            Err(WorkError::new(ErrorKind::Other, None))
        });

    match outcome {
        Ok(()) if data.from_cache => {}
        Ok(()) => {
            log_v(&tag, "onSuccessful", None);
            guard(&tag, "on_successful", work.on_successful(&mut data)).await;
        }
        Err(e) if e.kind == ErrorKind::Cancel => {
            data.success = false;
            data.error_kind = Some(ErrorKind::Cancel);
            log_w(&tag, "onCanceled", None);
            guard(&tag, "on_canceled", work.on_canceled(&mut data)).await;
        }
        Err(e) => {
            data.success = false;
            data.error_kind = Some(e.kind);
            log_w(&tag, "onFailed", Some(&e));
            data.message = e.message;
            guard(&tag, "on_failed", work.on_failed(&mut data)).await;
        }
    }

    stage.advance(WorkState::Finished);
    log_v(&tag, "onFinished", None);
    guard(&tag, "on_finished", work.on_finished(&mut data)).await;
    log_v(&tag, "work finished", None);

    data
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Await a terminal hook, swallowing a panic.
async fn guard<F: Future<Output = ()>>(tag: &str, hook: &str, fut: F) {
    if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
        log_w(tag, &format!("{} panicked", hook), None);
    }
}

async fn drive<W>(
    work: &W,
    tag: &str,
    exec: &ExecuteOptions,
    data: &mut WorkData<W::Output>,
    stage: &mut Stage<'_>,
) -> Result<(), WorkError>
where
    W: Work + ?Sized,
{
    let cancel = &exec.cancel;

    stage.advance(WorkState::Validating);
    ensure_live(cancel)?;
    if !work.check_params().await {
        log_d(tag, "onParamsError", None);
        return Err(WorkError::new(ErrorKind::Params, work.params_error()));
    }

    stage.advance(WorkState::CacheCheck);
    if let Some(cached) = work.started(data).await.map_err(WorkError::other)? {
        data.result = Some(cached);
        data.success = true;
        data.from_cache = true;
        data.message = work.from_cache_message(data);
        log_i(tag, "from cache", None);
        return Ok(());
    }

    stage.advance(WorkState::Building);
    ensure_live(cancel)?;
    let options = Arc::new(build_options(work, exec).await?);
    data.options = Some(options.clone());

    stage.advance(WorkState::Requesting);
    ensure_live(cancel)?;
    log_i(tag, "request", Some(&options));

    let config = work.config(&options);
    let call = match work.transport(&config) {
        Ok(transport) => transport.new_call(tag, options.clone(), &config).await,
        Err(e) => Err(e),
    };
    let call = match call {
        Ok(call) => call,
        Err(e) => {
            log_d(tag, "onParamsError", Some(&(e.as_i32(), &e)));
            return Err(WorkError::new(ErrorKind::Params, work.params_error()).with_source(e));
        }
    };
    log_i(tag, "real url", Some(&call.url()));

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            log_d(tag, "http cancelled", None);
            call.cancel();
            return Err(WorkError::canceled());
        }
        outcome = call.execute() => outcome,
    };

    let mut response = match outcome {
        Ok(response) => response,
        Err(e) if e.is_canceled() => return Err(WorkError::canceled()),
        Err(e) => {
            let kind = if e.is_timeout() {
                ErrorKind::Timeout
            } else {
                ErrorKind::Network
            };
            log_d(tag, "onNetworkError", Some(&(e.as_i32(), &e)));
            return Err(WorkError::new(kind, work.network_error(data)).with_source(e));
        }
    };

    let meta = response.meta();
    log_i(tag, "response", Some(&meta));
    let success = meta.success;
    data.response = Some(meta);

    if !success {
        log_d(tag, "onNetworkRequestFailed", None);
        return Err(WorkError::new(
            ErrorKind::Response,
            work.network_request_failed(data),
        ));
    }

    stage.advance(WorkState::Converting);
    ensure_live(cancel)?;
    let body = response.take_body().unwrap_or_else(ResponseBody::empty);
    log_v(tag, "onResponseConvert", None);
    let converted = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(WorkError::canceled()),
        converted = work.convert_response(data, body) => converted,
    };
    let converted = match converted {
        Ok(converted) => converted,
        Err(e) => return Err(parse_error(work, tag, data, e).await),
    };
    log_i(tag, "body", Some(&converted));

    stage.advance(WorkState::Evaluating);
    ensure_live(cancel)?;
    data.success = work.request_result(data, &converted).await;

    if data.success {
        log_v(tag, "onRequestSuccess", None);
        data.result = match work.request_successful(data, &converted).await {
            Ok(result) => result,
            Err(e) => return Err(parse_error(work, tag, data, e).await),
        };
        data.message = work.request_successful_message(data, &converted);
        Ok(())
    } else {
        log_d(tag, "onRequestFailed", None);
        data.result = match work.request_failed(data, &converted).await {
            Ok(result) => result,
            Err(e) => return Err(parse_error(work, tag, data, e).await),
        };
        Err(WorkError::new(
            ErrorKind::Task,
            work.request_failed_message(data, &converted),
        ))
    }
}

async fn parse_error<W>(
    work: &W,
    tag: &str,
    data: &WorkData<W::Output>,
    source: crate::base::errorkind::HookError,
) -> WorkError
where
    W: Work + ?Sized,
{
    log_d(tag, "onParseFailed", Some(&source));
    WorkError::new(ErrorKind::Parse, work.parse_failed(data).await).with_source(source)
}

async fn build_options<W>(work: &W, exec: &ExecuteOptions) -> Result<Options, WorkError>
where
    W: Work + ?Sized,
{
    let mut options = Options::new(work.url(), work.fill_params().await.map_err(WorkError::other)?);
    options.method = work.method();
    options.retry = exec.retry;
    options.config_key = work.config_key();
    options.headers = work.headers().await.map_err(WorkError::other)?;
    options.content_type = work.content_type();
    options.on_send_progress = exec.on_send_progress.clone();
    options.on_receive_progress = exec.on_receive_progress.clone();

    work.post_options(&mut options)
        .await
        .map_err(WorkError::other)?;
    Ok(options)
}
