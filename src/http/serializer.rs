//! Parameter serialization.
//!
//! Turns a nested parameter [`Map`] into either a JSON object or a flat,
//! ordered list of `(key, value)` pairs suitable for
//! `application/x-www-form-urlencoded`, `multipart/form-data` and query
//! strings.
//!
//! Keys of nested maps use bracket notation (`user[name]`). Lists follow the
//! [`ListFormat`] in effect:
//!
//! | format | `tags: ["x","y"]` | `rows: [{a:1}]` |
//! |--------|-------------------|-----------------|
//! | `Multi` | `tags=x&tags=y` | `rows[0][a]=1` |
//! | `MultiCompatible` | `tags[]=x&tags[]=y` | `rows[0][a]=1` |
//! | `Csv` | `tags=x,y` | error |
//!
//! `Null` values produce no pair, including inside joined lists:
//! `["x", null, "y"]` under `Csv` is `tags=x,y`. JSON keeps them as `null`,
//! but rejects `NaN` and infinite floats.

use thiserror::Error;

use crate::http::params::{BytesAttachment, FileAttachment, ListFormat, Map, Value};

/// `application/json` with an explicit charset.
pub const APPLICATION_JSON: &str = "application/json; charset=utf-8";
/// `application/x-www-form-urlencoded`.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`; the builder appends the boundary.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Encodings the serializer can produce from a [`Map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    Form,
    Multipart,
}

impl BodyEncoding {
    /// Match a Content-Type by essence, ignoring parameters and case.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match essence(content_type).as_str() {
            "application/json" => Some(BodyEncoding::Json),
            "application/x-www-form-urlencoded" => Some(BodyEncoding::Form),
            "multipart/form-data" => Some(BodyEncoding::Multipart),
            _ => None,
        }
    }
}

/// `type/subtype` of a Content-Type, lowercased.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SerializeError {
    #[error("`{key}` uses {format:?} but holds a value that cannot be joined")]
    NotJoinable { key: String, format: ListFormat },
    #[error("attachment `{key}` is only allowed in multipart/form-data bodies")]
    AttachmentOutsideMultipart { key: String },
    #[error("`{key}` is not a finite number and has no JSON form")]
    NonFiniteFloat { key: String },
}

/// One flattened form entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File(FileAttachment),
    Bytes(BytesAttachment),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Flatten `map` into ordered form pairs.
///
/// Attachments are accepted only when `allow_attachments` is set, which the
/// builder does for multipart bodies.
pub fn flatten(
    map: &Map,
    list_format: ListFormat,
    allow_attachments: bool,
) -> Result<Vec<(String, FormValue)>, SerializeError> {
    let mut flattener = Flattener {
        list_format,
        allow_attachments,
        out: Vec::new(),
    };
    flattener.read_map("", map)?;
    Ok(flattener.out)
}

/// Flatten `map` into plain string pairs for a query string or urlencoded body.
pub fn to_pairs(map: &Map, list_format: ListFormat) -> Result<Vec<(String, String)>, SerializeError> {
    Ok(flatten(map, list_format, false)?
        .into_iter()
        .filter_map(|(key, value)| match value {
            FormValue::Text(text) => Some((key, text)),
            _ => None,
        })
        .collect())
}

/// Convert `map` to a JSON object without flattening.
pub fn to_json(map: &Map) -> Result<serde_json::Value, SerializeError> {
    map_to_json("", map)
}

struct Flattener {
    list_format: ListFormat,
    allow_attachments: bool,
    out: Vec<(String, FormValue)>,
}

impl Flattener {
    fn read_map(&mut self, key: &str, map: &Map) -> Result<(), SerializeError> {
        for (child, value) in map {
            let path = if key.is_empty() {
                child.clone()
            } else {
                format!("{key}[{child}]")
            };
            self.read_next(path, value)?;
        }
        Ok(())
    }

    fn read_next(&mut self, key: String, value: &Value) -> Result<(), SerializeError> {
        match value {
            Value::Null => Ok(()),
            Value::Map(map) => self.read_map(&key, map),
            Value::List(values) => self.read_list(key, values, self.list_format),
            Value::ListOverride(list) => self.read_list(key, &list.values, list.format),
            Value::File(file) => {
                self.check_attachment(&key)?;
                self.out.push((key, FormValue::File(file.clone())));
                Ok(())
            }
            Value::Bytes(bytes) => {
                self.check_attachment(&key)?;
                self.out.push((key, FormValue::Bytes(bytes.clone())));
                Ok(())
            }
            scalar => {
                let text = scalar.as_scalar_string().unwrap_or_default();
                self.out.push((key, FormValue::Text(text)));
                Ok(())
            }
        }
    }

    fn read_list(
        &mut self,
        key: String,
        values: &[Value],
        format: ListFormat,
    ) -> Result<(), SerializeError> {
        match format.separator() {
            None => {
                for (index, value) in values.iter().enumerate() {
                    let child = match (format, value.is_collection()) {
                        (_, true) => format!("{key}[{index}]"),
                        (ListFormat::MultiCompatible, false) => format!("{key}[]"),
                        (_, false) => key.clone(),
                    };
                    self.read_next(child, value)?;
                }
                Ok(())
            }
            Some(separator) => {
                let mut parts = Vec::with_capacity(values.len());
                for value in values {
                    match value {
                        Value::Null => {}
                        other => match other.as_scalar_string() {
                            Some(text) => parts.push(text),
                            None => return Err(SerializeError::NotJoinable { key, format }),
                        },
                    }
                }
                self.out.push((key, FormValue::Text(parts.join(separator))));
                Ok(())
            }
        }
    }

    fn check_attachment(&self, key: &str) -> Result<(), SerializeError> {
        if self.allow_attachments {
            Ok(())
        } else {
            Err(SerializeError::AttachmentOutsideMultipart {
                key: key.to_string(),
            })
        }
    }
}

fn map_to_json(key: &str, map: &Map) -> Result<serde_json::Value, SerializeError> {
    let mut object = serde_json::Map::with_capacity(map.len());
    for (child, value) in map {
        let path = if key.is_empty() {
            child.clone()
        } else {
            format!("{key}[{child}]")
        };
        let json = value_to_json(&path, value)?;
        object.insert(child.clone(), json);
    }
    Ok(serde_json::Value::Object(object))
}

fn list_to_json(key: &str, values: &[Value]) -> Result<serde_json::Value, SerializeError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| value_to_json(&format!("{key}[{index}]"), value))
        .collect::<Result<Vec<_>, _>>()
        .map(serde_json::Value::Array)
}

fn value_to_json(key: &str, value: &Value) -> Result<serde_json::Value, SerializeError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| SerializeError::NonFiniteFloat {
                key: key.to_string(),
            })?,
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Map(map) => map_to_json(key, map)?,
        Value::List(values) => list_to_json(key, values)?,
        Value::ListOverride(list) => list_to_json(key, &list.values)?,
        Value::File(_) | Value::Bytes(_) => {
            return Err(SerializeError::AttachmentOutsideMultipart {
                key: key.to_string(),
            })
        }
    })
}
