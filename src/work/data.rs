//! The result container of one execution.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::base::errorkind::ErrorKind;
use crate::http::options::Options;
use crate::http::response::HttpMeta;

/// Everything one execution produced.
///
/// Created fresh for every execution and returned by value. Hooks receive it
/// by reference while the engine fills it in; only [`extra`](Self::set_extra)
/// is writable from outside the crate.
///
/// Invariants upheld by the engine:
/// - `success()` implies `error_kind()` is `None`
/// - `response()` is `Some` once a response head was received
pub struct WorkData<D> {
    pub(crate) success: bool,
    pub(crate) result: Option<D>,
    pub(crate) message: Option<String>,
    pub(crate) error_kind: Option<ErrorKind>,
    pub(crate) response: Option<HttpMeta>,
    pub(crate) options: Option<Arc<Options>>,
    pub(crate) from_cache: bool,
    extra: Option<Box<dyn Any + Send + Sync>>,
}

impl<D> Default for WorkData<D> {
    fn default() -> Self {
        Self {
            success: false,
            result: None,
            message: None,
            error_kind: None,
            response: None,
            options: None,
            from_cache: false,
            extra: None,
        }
    }
}

impl<D> WorkData<D> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// The business result, or the fallback of `Work::request_failed`.
    pub fn result(&self) -> Option<&D> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<D> {
        self.result
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    pub fn response(&self) -> Option<&HttpMeta> {
        self.response.as_ref()
    }

    pub fn options(&self) -> Option<&Options> {
        self.options.as_deref()
    }

    /// Whether the result came from `Work::started` without a request.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Attach a per-execution value for later hooks.
    pub fn set_extra<T: Any + Send + Sync>(&mut self, value: T) {
        self.extra = Some(Box::new(value));
    }

    pub fn extra<T: Any>(&self) -> Option<&T> {
        self.extra.as_ref().and_then(|extra| extra.downcast_ref())
    }

    pub fn take_extra<T: Any>(&mut self) -> Option<T> {
        match self.extra.take()?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                self.extra = Some(other);
                None
            }
        }
    }

    /// `(success, result, message)`.
    pub fn into_parts(self) -> (bool, Option<D>, Option<String>) {
        (self.success, self.result, self.message)
    }
}

impl<D: fmt::Debug> fmt::Debug for WorkData<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkData")
            .field("success", &self.success)
            .field("error_kind", &self.error_kind)
            .field("message", &self.message)
            .field("result", &self.result)
            .field("from_cache", &self.from_cache)
            .field("response", &self.response)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_data_is_unsuccessful() {
        let data = WorkData::<String>::new();
        assert!(!data.success());
        assert!(data.result().is_none());
        assert!(data.error_kind().is_none());
        assert!(data.response().is_none());
        assert!(!data.from_cache());
    }

    #[test]
    fn test_extra_round_trip() {
        let mut data = WorkData::<()>::new();
        data.set_extra(42u32);
        assert_eq!(data.extra::<u32>(), Some(&42));
        assert!(data.extra::<String>().is_none());
        assert!(data.take_extra::<String>().is_none());
        assert_eq!(data.take_extra::<u32>(), Some(42));
        assert!(data.extra::<u32>().is_none());
    }

    #[test]
    fn test_into_parts() {
        let mut data = WorkData::new();
        data.success = true;
        data.result = Some("r");
        data.message = Some("ok".into());
        assert_eq!(data.into_parts(), (true, Some("r"), Some("ok".to_string())));
    }
}
