//! Logging seam for the work lifecycle.
//!
//! Every log point in the crate goes through a single replaceable
//! [`WorkLog`] function. The default forwards to `tracing` with the work tag
//! attached as a field, so a subscriber configured by the embedding
//! application decides what is printed.
//!
//! Logging is purely observational: the sink never influences control flow.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::Level;

/// Log sink signature: `(level, tag, message, data)`.
pub type WorkLog = Arc<dyn Fn(Level, &str, Option<&str>, Option<&dyn fmt::Debug>) + Send + Sync>;

static DEBUG: AtomicBool = AtomicBool::new(true);

static SINK: Lazy<RwLock<WorkLog>> = Lazy::new(|| RwLock::new(Arc::new(tracing_log)));

/// Enable or disable all lifecycle logging.
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Whether lifecycle logging is enabled.
pub fn is_debug() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// Replace the log sink.
pub fn set_work_log(log: WorkLog) {
    if let Ok(mut sink) = SINK.write() {
        *sink = log;
    }
}

/// Restore the default `tracing` sink.
pub fn reset_work_log() {
    set_work_log(Arc::new(tracing_log));
}

/// The default sink.
pub fn tracing_log(level: Level, tag: &str, message: Option<&str>, data: Option<&dyn fmt::Debug>) {
    let message = message.unwrap_or_default();

    macro_rules! emit {
        ($lvl:expr) => {
            match data {
                Some(data) => tracing::event!(target: "httpwork", $lvl, tag = %tag, data = ?data, "{}", message),
                None => tracing::event!(target: "httpwork", $lvl, tag = %tag, "{}", message),
            }
        };
    }

    match level {
        Level::TRACE => emit!(Level::TRACE),
        Level::DEBUG => emit!(Level::DEBUG),
        Level::INFO => emit!(Level::INFO),
        Level::WARN => emit!(Level::WARN),
        _ => emit!(Level::ERROR),
    }
}

fn log(level: Level, tag: &str, message: &str, data: Option<&dyn fmt::Debug>) {
    if !is_debug() {
        return;
    }
    // Clone out of the lock so a sink that calls `set_work_log` cannot deadlock.
    let sink = match SINK.read() {
        Ok(sink) => sink.clone(),
        Err(_) => return,
    };
    sink(level, tag, Some(message), data);
}

pub(crate) fn log_v(tag: &str, message: &str, data: Option<&dyn fmt::Debug>) {
    log(Level::TRACE, tag, message, data)
}

pub(crate) fn log_d(tag: &str, message: &str, data: Option<&dyn fmt::Debug>) {
    log(Level::DEBUG, tag, message, data)
}

pub(crate) fn log_i(tag: &str, message: &str, data: Option<&dyn fmt::Debug>) {
    log(Level::INFO, tag, message, data)
}

pub(crate) fn log_w(tag: &str, message: &str, data: Option<&dyn fmt::Debug>) {
    log(Level::WARN, tag, message, data)
}
