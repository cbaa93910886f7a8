//! Request parameter values.
//!
//! [`ParamValue`] is what a work's `fill_params` hook produces. Only the
//! [`ParamValue::Map`] variant goes through the serializer; the other variants
//! are sent as-is with the request's content type.
//!
//! # Example
//! ```ignore
//! use httpwork::params;
//! use httpwork::http::params::{ListFormat, ListParams};
//!
//! let p = params! {
//!     "name" => "a",
//!     "tags" => vec!["x", "y"],
//!     "ids" => ListParams::new(ListFormat::Csv, vec![1, 2, 3]),
//! };
//! ```

use bytes::Bytes;
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::http::multipart::Form;

/// Insertion-ordered parameter map.
pub type Map = IndexMap<String, Value>;

/// How a list value is flattened into form pairs.
///
/// Only used for `application/x-www-form-urlencoded`, `multipart/form-data`
/// and GET/HEAD query strings. Override it for a single value with
/// [`ListParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ListFormat {
    /// Comma separated, e.g. `foo,bar,baz`.
    Csv,
    /// Space separated, e.g. `foo bar baz`.
    Ssv,
    /// Tab separated, e.g. `foo\tbar\tbaz`.
    Tsv,
    /// Pipe separated, e.g. `foo|bar|baz`.
    Pipes,
    /// Repeated keys, e.g. `foo=value&foo=another_value`.
    #[default]
    Multi,
    /// Bracketed repeated keys, e.g. `foo[]=value&foo[]=another_value`.
    MultiCompatible,
}

impl ListFormat {
    /// The join separator, or `None` for the repeated-key formats.
    pub fn separator(&self) -> Option<&'static str> {
        match self {
            ListFormat::Csv => Some(","),
            ListFormat::Ssv => Some(" "),
            ListFormat::Tsv => Some("\t"),
            ListFormat::Pipes => Some("|"),
            ListFormat::Multi | ListFormat::MultiCompatible => None,
        }
    }
}

/// A list carrying its own [`ListFormat`], independent of the ambient one.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub format: ListFormat,
    pub values: Vec<Value>,
}

impl ListParams {
    pub fn new<T: Into<Value>>(format: ListFormat, values: Vec<T>) -> Self {
        Self {
            format,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A file on disk uploaded as a multipart part.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttachment {
    pub path: PathBuf,
    /// Explicit MIME type; derived from the extension when absent.
    pub mime_type: Option<String>,
    /// Explicit file name; the path's file name when absent.
    pub name: Option<String>,
}

impl FileAttachment {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            mime_type: None,
            name: None,
        }
    }

    pub fn mime_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// In-memory data uploaded as a multipart part.
#[derive(Clone, PartialEq)]
pub struct BytesAttachment {
    pub bytes: Bytes,
    pub mime_type: String,
    pub name: Option<String>,
}

impl BytesAttachment {
    pub fn new<B: Into<Bytes>, S: Into<String>>(bytes: B, mime_type: S) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            name: None,
        }
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Debug for BytesAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytesAttachment")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("name", &self.name)
            .finish()
    }
}

/// A value inside a parameter map.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Skipped when flattening, `null` in JSON.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Map(Map),
    List(Vec<Value>),
    ListOverride(ListParams),
    File(FileAttachment),
    Bytes(BytesAttachment),
}

impl Value {
    /// Maps and lists; these get an index in repeated-key list formats.
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Map(_) | Value::List(_) | Value::ListOverride(_))
    }

    /// String form of a scalar, `None` for everything else.
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(i: $t) -> Self {
                Value::Int(i as i64)
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32, isize);

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string()))
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f as f64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<ListParams> for Value {
    fn from(l: ListParams) -> Self {
        Value::ListOverride(l)
    }
}

impl From<FileAttachment> for Value {
    fn from(f: FileAttachment) -> Self {
        Value::File(f)
    }
}

impl From<BytesAttachment> for Value {
    fn from(b: BytesAttachment) -> Self {
        Value::Bytes(b)
    }
}

/// A request body built by the caller, sent verbatim with its own content type.
#[derive(Clone, PartialEq)]
pub struct PrebuiltBody {
    pub bytes: Bytes,
    pub content_type: String,
}

impl PrebuiltBody {
    pub fn new<B: Into<Bytes>, S: Into<String>>(bytes: B, content_type: S) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }
}

impl From<Form> for PrebuiltBody {
    fn from(form: Form) -> Self {
        let content_type = form.content_type();
        Self {
            bytes: form.into_body(),
            content_type,
        }
    }
}

impl fmt::Debug for PrebuiltBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrebuiltBody")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Everything a work can hand to the request builder.
///
/// For GET and HEAD only `Text` (an unencoded `a=1&b=2` query) and `Map` are
/// used. For other methods `Map` is serialized according to the content type
/// and the remaining variants are sent as the raw body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamValue {
    #[default]
    None,
    Text(String),
    Bytes(Bytes),
    File(PathBuf),
    Body(PrebuiltBody),
    Map(Map),
}

impl ParamValue {
    pub fn is_none(&self) -> bool {
        matches!(self, ParamValue::None)
    }

    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        ParamValue::File(path.as_ref().to_path_buf())
    }
}

impl From<()> for ParamValue {
    fn from(_: ()) -> Self {
        ParamValue::None
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<Bytes> for ParamValue {
    fn from(b: Bytes) -> Self {
        ParamValue::Bytes(b)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        ParamValue::Bytes(Bytes::from(v))
    }
}

impl From<PathBuf> for ParamValue {
    fn from(p: PathBuf) -> Self {
        ParamValue::File(p)
    }
}

impl From<PrebuiltBody> for ParamValue {
    fn from(b: PrebuiltBody) -> Self {
        ParamValue::Body(b)
    }
}

impl From<Form> for ParamValue {
    fn from(form: Form) -> Self {
        ParamValue::Body(form.into())
    }
}

impl From<Map> for ParamValue {
    fn from(m: Map) -> Self {
        ParamValue::Map(m)
    }
}

/// Build a parameter [`Map`] from `key => value` pairs.
#[macro_export]
macro_rules! params {
    () => {
        $crate::http::params::Map::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::http::params::Map::new();
        $(map.insert(::std::string::String::from($key), $crate::http::params::Value::from($value));)+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        assert_eq!(ListFormat::Csv.separator(), Some(","));
        assert_eq!(ListFormat::Ssv.separator(), Some(" "));
        assert_eq!(ListFormat::Tsv.separator(), Some("\t"));
        assert_eq!(ListFormat::Pipes.separator(), Some("|"));
        assert_eq!(ListFormat::Multi.separator(), None);
        assert_eq!(ListFormat::MultiCompatible.separator(), None);
    }

    #[test]
    fn test_default_list_format() {
        assert_eq!(ListFormat::default(), ListFormat::Multi);
    }

    #[test]
    fn test_params_macro_keeps_order() {
        let map = crate::params! {"b" => 1, "a" => "x", "c" => true};
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(map["a"], Value::Text("x".into()));
    }

    #[test]
    fn test_option_into_null() {
        let v: Value = Option::<i32>::None.into();
        assert_eq!(v, Value::Null);
        let v: Value = Some(5).into();
        assert_eq!(v, Value::Int(5));
    }

    #[test]
    fn test_large_u64_as_text() {
        let v: Value = u64::MAX.into();
        assert_eq!(v, Value::Text(u64::MAX.to_string()));
    }

    #[test]
    fn test_collection_detection() {
        assert!(Value::from(vec![1, 2]).is_collection());
        assert!(Value::from(crate::params! {"a" => 1}).is_collection());
        assert!(Value::from(ListParams::new(ListFormat::Csv, vec![1])).is_collection());
        assert!(!Value::from("x").is_collection());
        assert!(!Value::from(FileAttachment::new("a.txt")).is_collection());
    }

    #[test]
    fn test_form_into_prebuilt_body() {
        let form = Form::new().text("k", "v");
        let boundary = form.boundary().to_string();
        let body = PrebuiltBody::from(form);
        assert!(body.content_type.contains(&boundary));
        assert!(!body.bytes.is_empty());
    }
}
