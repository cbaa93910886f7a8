//! `multipart/form-data` bodies (RFC 7578 over RFC 2046 framing).
//!
//! The request builder fills a [`Form`] from flattened parameters. A form
//! built by hand can be sent as a
//! [`PrebuiltBody`](crate::http::params::PrebuiltBody).
//!
//! # Example
//! ```ignore
//! use httpwork::http::multipart::{Form, Part};
//!
//! let form = Form::new()
//!     .text("user[name]", "alice")
//!     .part("avatar", Part::bytes(png).file_name("me.png").content_type("image/png"));
//! let body = form.into_body();
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU32, Ordering};

const DASHES: &[u8] = b"--";
const CRLF: &[u8] = b"\r\n";

/// An ordered set of named parts sharing one boundary.
#[derive(Debug)]
pub struct Form {
    boundary: String,
    parts: Vec<(String, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    pub fn new() -> Self {
        Self {
            boundary: next_boundary(),
            parts: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn text<N: Into<String>, V: Into<String>>(self, name: N, value: V) -> Self {
        self.part(name, Part::text(value))
    }

    pub fn part<N: Into<String>>(mut self, name: N, part: Part) -> Self {
        self.push(name, part);
        self
    }

    /// Same as [`part`](Self::part) without consuming the form.
    pub fn push<N: Into<String>>(&mut self, name: N, part: Part) {
        self.parts.push((name.into(), part));
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Part names in insertion order. Repeated names are kept.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    /// `multipart/form-data; boundary=...`
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact size of [`into_body`](Self::into_body); zero for an empty form.
    pub fn content_length(&self) -> usize {
        if self.parts.is_empty() {
            return 0;
        }
        let delimiter = DASHES.len() + self.boundary.len() + CRLF.len();
        let parts: usize = self
            .parts
            .iter()
            .map(|(name, part)| {
                delimiter + part.head(name).len() + 2 * CRLF.len() + part.data.len() + CRLF.len()
            })
            .sum();
        parts + DASHES.len() + self.boundary.len() + DASHES.len() + CRLF.len()
    }

    pub fn into_body(self) -> Bytes {
        if self.parts.is_empty() {
            return Bytes::new();
        }

        let mut out = BytesMut::with_capacity(self.content_length());
        for (name, part) in &self.parts {
            out.put_slice(DASHES);
            out.put_slice(self.boundary.as_bytes());
            out.put_slice(CRLF);
            out.put_slice(part.head(name).as_bytes());
            out.put_slice(CRLF);
            out.put_slice(CRLF);
            out.put_slice(&part.data);
            out.put_slice(CRLF);
        }
        out.put_slice(DASHES);
        out.put_slice(self.boundary.as_bytes());
        out.put_slice(DASHES);
        out.put_slice(CRLF);
        out.freeze()
    }
}

/// One part: payload plus optional file name and media type.
#[derive(Debug, Clone)]
pub struct Part {
    data: Bytes,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl Part {
    /// A plain field; sent without a Content-Type line.
    pub fn text<V: Into<String>>(value: V) -> Self {
        Self::bytes(value.into())
    }

    pub fn bytes<B: Into<Bytes>>(data: B) -> Self {
        Self {
            data: data.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn content_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    pub fn file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Part header lines without the trailing blank line.
    fn head(&self, name: &str) -> String {
        let mut head = format!("Content-Disposition: form-data; name=\"{}\"", quote(name));
        if let Some(file_name) = &self.file_name {
            head.push_str("; filename=\"");
            head.push_str(&quote(file_name));
            head.push('"');
        }
        if let Some(mime) = &self.content_type {
            head.push_str("\r\nContent-Type: ");
            head.push_str(mime);
        }
        head
    }
}

/// Backslash-escape characters that would break a quoted header parameter.
fn quote(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\\', '\r', '\n']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\r' => escaped.push_str("\\r"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

static BOUNDARY_SEQ: AtomicU32 = AtomicU32::new(0);

fn next_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);

    format!(
        "----httpwork-boundary-{:016x}{:08x}{:04x}",
        nanos,
        std::process::id(),
        seq & 0xffff
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_form_has_no_body() {
        let form = Form::new();
        assert!(form.is_empty());
        assert_eq!(form.content_length(), 0);
        assert!(form.into_body().is_empty());
    }

    #[test]
    fn test_exact_framing() {
        let form = Form::new()
            .text("user[name]", "alice")
            .part(
                "avatar",
                Part::bytes(b"PNG".as_slice())
                    .file_name("me.png")
                    .content_type("image/png"),
            );
        let b = form.boundary().to_string();

        let expected = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"user[name]\"\r\n\r\n\
             alice\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             PNG\r\n\
             --{b}--\r\n"
        );
        assert_eq!(form.into_body(), Bytes::from(expected));
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = Form::new();
        let b = Form::new();
        assert!(a.boundary().starts_with("----httpwork-boundary-"));
        assert_ne!(a.boundary(), b.boundary());
        assert_eq!(
            a.content_type(),
            format!("multipart/form-data; boundary={}", a.boundary())
        );
    }

    #[test]
    fn test_content_length_matches_body() {
        let form = Form::new()
            .text("key", "value")
            .part("f", Part::bytes(vec![0u8; 100]).file_name("zero.bin"))
            .part("g", Part::bytes(Bytes::new()).content_type("text/plain"));

        let length = form.content_length();
        assert_eq!(length, form.into_body().len());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("normal"), "normal");
        assert_eq!(quote("with\"quote"), "with\\\"quote");
        assert_eq!(quote("with\\slash"), "with\\\\slash");
        assert_eq!(quote("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_repeated_names_in_order() {
        let mut form = Form::new().text("tags", "x");
        form.push("tags", Part::text("y"));
        form.push(String::from("ids[0]"), Part::text("1"));

        assert_eq!(form.names().collect::<Vec<_>>(), vec!["tags", "tags", "ids[0]"]);
        assert_eq!(form.len(), 3);
    }
}
