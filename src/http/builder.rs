//! URL and body construction.
//!
//! Resolves a work's [`Options`] against its [`WorkConfig`] into a
//! [`WireRequest`]: the final URL (with the query string for GET/HEAD), the
//! header set, the encoded body and the effective timeouts.

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::HeaderMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::config::WorkConfig;
use crate::http::multipart::{Form, Part};
use crate::http::options::{Headers, Options};
use crate::http::params::{ListFormat, Map, ParamValue};
use crate::http::requestbody::RequestBody;
use crate::http::serializer::{self, BodyEncoding, FormValue, SerializeError};
use crate::http::transport::{Timeouts, WireRequest};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error("parameters cannot be encoded automatically as `{0}`")]
    UnsupportedContentType(String),
    #[error("relative URL `{0}` needs a base URL")]
    MissingBaseUrl(String),
    #[error("JSON encoding failed: {0}")]
    Json(String),
}

/// Build the complete wire request for `options`.
pub async fn build_request(config: &WorkConfig, options: &Options) -> Result<WireRequest, NetError> {
    let url = build_url(config, options)?;
    let (body, content_type) = build_body(config, options).await?;
    let mut headers = build_headers(config, options.headers.as_ref())?;

    if let Some(content_type) = content_type {
        let value = HeaderValue::from_str(&content_type)
            .map_err(|_| NetError::InvalidHeader(content_type.clone()))?;
        headers.insert(CONTENT_TYPE, value);
    }

    Ok(WireRequest {
        method: options.method.to_http(),
        url,
        headers,
        body,
        timeouts: resolve_timeouts(config, options),
    })
}

/// Resolve the request URL, appending the query string for GET/HEAD.
///
/// Relative URLs are joined to the config's base URL following RFC 3986, so
/// absolute task URLs always win over the base.
///
/// A `Text` parameter is used verbatim as the query and replaces any query
/// already present in the URL. Pre-encoded queries belong in the URL itself
/// with empty parameters; mixing both overwrites the URL's query.
pub fn build_url(config: &WorkConfig, options: &Options) -> Result<Url, NetError> {
    let mut url = match Url::parse(&options.url) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => match config.base_url()? {
            Some(base) => base.join(&options.url)?,
            None => return Err(BuildError::MissingBaseUrl(options.url.clone()).into()),
        },
        Err(e) => return Err(e.into()),
    };

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(NetError::UnknownUrlScheme(other.to_string())),
    }

    if !options.method.has_body() {
        match &options.params {
            ParamValue::Text(query) => url.set_query(Some(query)),
            ParamValue::Map(map) => {
                let pairs = serializer::to_pairs(map, list_format(config, options))
                    .map_err(BuildError::from)?;
                if !pairs.is_empty() {
                    let mut query = url.query_pairs_mut();
                    for (key, value) in &pairs {
                        query.append_pair(key, value);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(url)
}

/// Encode the body and pick its Content-Type.
///
/// Returns `(RequestBody::Empty, None)` for GET/HEAD and for empty parameters.
pub async fn build_body(
    config: &WorkConfig,
    options: &Options,
) -> Result<(RequestBody, Option<String>), NetError> {
    if !options.method.has_body() {
        return Ok((RequestBody::Empty, None));
    }

    let content_type = options
        .content_type
        .clone()
        .unwrap_or_else(|| config.default_content_type().to_string());

    let built = match &options.params {
        ParamValue::None => (RequestBody::Empty, None),
        ParamValue::Text(text) => (RequestBody::from(text.clone()), Some(content_type)),
        ParamValue::Bytes(bytes) => (RequestBody::from(bytes.clone()), Some(content_type)),
        ParamValue::File(path) => {
            let data = tokio::fs::read(path).await.file_context(path)?;
            (RequestBody::from(data), Some(content_type))
        }
        ParamValue::Body(prebuilt) => (
            RequestBody::from(prebuilt.bytes.clone()),
            Some(prebuilt.content_type.clone()),
        ),
        ParamValue::Map(map) => {
            let format = list_format(config, options);
            encode_map(map, format, content_type).await?
        }
    };

    Ok(built)
}

async fn encode_map(
    map: &Map,
    format: ListFormat,
    content_type: String,
) -> Result<(RequestBody, Option<String>), NetError> {
    match BodyEncoding::from_content_type(&content_type) {
        Some(BodyEncoding::Json) => {
            let json = serializer::to_json(map).map_err(BuildError::from)?;
            let bytes =
                serde_json::to_vec(&json).map_err(|e| BuildError::Json(e.to_string()))?;
            Ok((RequestBody::from(bytes), Some(content_type)))
        }
        Some(BodyEncoding::Form) => {
            let pairs = serializer::to_pairs(map, format).map_err(BuildError::from)?;
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish();
            Ok((RequestBody::from(encoded), Some(content_type)))
        }
        Some(BodyEncoding::Multipart) => {
            let form = build_multipart(map, format).await?;
            let content_type = form.content_type();
            Ok((RequestBody::from(form.into_body()), Some(content_type)))
        }
        None => Err(BuildError::UnsupportedContentType(content_type).into()),
    }
}

/// Flatten `map` into a multipart form, reading file attachments from disk.
pub async fn build_multipart(map: &Map, format: ListFormat) -> Result<Form, NetError> {
    let mut form = Form::new();

    for (key, value) in serializer::flatten(map, format, true).map_err(BuildError::from)? {
        let part = match value {
            FormValue::Text(text) => Part::text(text),
            FormValue::File(file) => {
                let data = tokio::fs::read(&file.path).await.file_context(&file.path)?;
                let mime = file
                    .mime_type
                    .unwrap_or_else(|| guess_mime(&file.path));
                let name = file
                    .name
                    .or_else(|| file_name_of(&file.path))
                    .unwrap_or_else(|| key.clone());
                Part::bytes(data).content_type(mime).file_name(name)
            }
            FormValue::Bytes(bytes) => {
                let name = bytes.name.unwrap_or_else(|| key.clone());
                Part::bytes(bytes.bytes)
                    .content_type(bytes.mime_type)
                    .file_name(name)
            }
        };
        form.push(key, part);
    }

    Ok(form)
}

/// MIME type from the file extension, `application/octet-stream` if unknown.
pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Per-request headers replace the config defaults; they are never merged.
pub fn build_headers(config: &WorkConfig, headers: Option<&Headers>) -> Result<HeaderMap, NetError> {
    let source = headers.unwrap_or_else(|| config.default_headers());
    let mut map = HeaderMap::with_capacity(source.len());

    for (name, value) in source {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| NetError::InvalidHeader(name.clone()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader(value.clone()))?;
        map.append(name, value);
    }

    Ok(map)
}

fn list_format(config: &WorkConfig, options: &Options) -> ListFormat {
    options.list_format.unwrap_or_else(|| config.list_format())
}

fn resolve_timeouts(config: &WorkConfig, options: &Options) -> Timeouts {
    fn pick(request: Option<Duration>, fallback: Option<Duration>) -> Option<Duration> {
        match request {
            Some(d) if d.is_zero() => None,
            Some(d) => Some(d),
            None => fallback,
        }
    }

    Timeouts {
        connect: pick(options.connect_timeout, config.connect_timeout()),
        read: pick(options.read_timeout, config.read_timeout()),
        write: pick(options.write_timeout, config.write_timeout()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::options::HttpMethod;
    use crate::http::params::{BytesAttachment, FileAttachment, PrebuiltBody};
    use crate::http::serializer::{APPLICATION_JSON, MULTIPART_FORM_DATA};
    use crate::params;
    use bytes::Bytes;

    fn config() -> WorkConfig {
        WorkConfig::builder().base_url("http://example.com/").build()
    }

    fn options(method: HttpMethod, url: &str, params: ParamValue) -> Options {
        let mut options = Options::new(url, params);
        options.method = method;
        options
    }

    #[test]
    fn test_get_query_from_map() {
        for base in ["http://example.com", "http://example.com/"] {
            let config = WorkConfig::builder().base_url(base).build();
            let opts = options(HttpMethod::Get, "/get", params! {"age" => 32}.into());
            let url = build_url(&config, &opts).unwrap();
            assert_eq!(url.as_str(), "http://example.com/get?age=32");
        }
    }

    #[test]
    fn test_get_query_is_encoded() {
        let opts = options(
            HttpMethod::Get,
            "/get",
            params! {"q" => "a b&c", "tags" => vec!["x", "y"]}.into(),
        );
        let url = build_url(&config(), &opts).unwrap();
        assert_eq!(url.query(), Some("q=a+b%26c&tags=x&tags=y"));
    }

    #[test]
    fn test_get_text_query_is_verbatim() {
        let opts = options(HttpMethod::Head, "/get?old=1", "a=1&b=2".into());
        let url = build_url(&config(), &opts).unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_get_map_appends_to_existing_query() {
        let opts = options(HttpMethod::Get, "/get?x=1", params! {"y" => 2}.into());
        let url = build_url(&config(), &opts).unwrap();
        assert_eq!(url.query(), Some("x=1&y=2"));
    }

    #[test]
    fn test_absolute_url_wins() {
        let opts = options(HttpMethod::Get, "https://other.org/a", ParamValue::None);
        let url = build_url(&config(), &opts).unwrap();
        assert_eq!(url.as_str(), "https://other.org/a");
    }

    #[test]
    fn test_relative_without_base_fails() {
        let config = WorkConfig::builder().build();
        let opts = options(HttpMethod::Get, "/get", ParamValue::None);
        let err = build_url(&config, &opts).unwrap_err();
        assert!(matches!(
            err,
            NetError::Build(BuildError::MissingBaseUrl(_))
        ));
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let opts = options(HttpMethod::Get, "ftp://example.com/a", ParamValue::None);
        assert!(matches!(
            build_url(&config(), &opts),
            Err(NetError::UnknownUrlScheme(_))
        ));
    }

    #[test]
    fn test_post_params_stay_out_of_query() {
        let opts = options(HttpMethod::Post, "/post", params! {"a" => 1}.into());
        let url = build_url(&config(), &opts).unwrap();
        assert_eq!(url.query(), None);
    }

    #[tokio::test]
    async fn test_form_body() {
        let opts = options(
            HttpMethod::Post,
            "/post",
            params! {"name" => "a b", "tags" => vec!["x", "y"]}.into(),
        );
        let (mut body, ct) = build_body(&config(), &opts).await.unwrap();
        assert_eq!(ct.as_deref(), Some(serializer::FORM_URLENCODED));
        assert_eq!(body.take_bytes(), Bytes::from("name=a+b&tags=x&tags=y"));
    }

    #[tokio::test]
    async fn test_json_body() {
        let mut opts = options(
            HttpMethod::Put,
            "/put",
            params! {"name" => "a", "tags" => vec!["x"]}.into(),
        );
        opts.content_type = Some(APPLICATION_JSON.to_string());
        let (mut body, ct) = build_body(&config(), &opts).await.unwrap();
        assert_eq!(ct.as_deref(), Some(APPLICATION_JSON));
        let json: serde_json::Value = serde_json::from_slice(&body.take_bytes()).unwrap();
        assert_eq!(json, serde_json::json!({"name": "a", "tags": ["x"]}));
    }

    #[tokio::test]
    async fn test_multipart_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"PNGDATA").unwrap();

        let mut opts = options(
            HttpMethod::Post,
            "/upload",
            params! {
                "title" => "hello",
                "image" => FileAttachment::new(&path),
                "raw" => BytesAttachment::new(vec![1u8, 2, 3], "text/plain").name("test.txt"),
            }
            .into(),
        );
        opts.content_type = Some(MULTIPART_FORM_DATA.to_string());

        let (mut body, ct) = build_body(&config(), &opts).await.unwrap();
        let ct = ct.unwrap();
        assert!(ct.starts_with("multipart/form-data; boundary="));

        let bytes = body.take_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("name=\"title\"\r\n\r\nhello"));
        assert!(text.contains("name=\"image\"; filename=\"photo.png\"\r\nContent-Type: image/png"));
        assert!(text.contains("PNGDATA"));
        assert!(text.contains("name=\"raw\"; filename=\"test.txt\"\r\nContent-Type: text/plain"));
    }

    #[tokio::test]
    async fn test_missing_upload_file() {
        let mut opts = options(
            HttpMethod::Post,
            "/upload",
            params! {"f" => FileAttachment::new("/definitely/not/here.bin")}.into(),
        );
        opts.content_type = Some(MULTIPART_FORM_DATA.to_string());
        let err = build_body(&config(), &opts).await.unwrap_err();
        assert!(matches!(err, NetError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_map_with_unknown_content_type() {
        let mut opts = options(HttpMethod::Post, "/post", params! {"a" => 1}.into());
        opts.content_type = Some("text/xml".into());
        let err = build_body(&config(), &opts).await.unwrap_err();
        assert!(matches!(
            err,
            NetError::Build(BuildError::UnsupportedContentType(_))
        ));
    }

    #[tokio::test]
    async fn test_raw_text_uses_content_type() {
        let mut opts = options(HttpMethod::Post, "/post", r#"{"a":1}"#.into());
        opts.content_type = Some(APPLICATION_JSON.into());
        let (mut body, ct) = build_body(&config(), &opts).await.unwrap();
        assert_eq!(ct.as_deref(), Some(APPLICATION_JSON));
        assert_eq!(body.take_bytes(), Bytes::from_static(br#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_prebuilt_body_keeps_its_content_type() {
        let form = Form::new().text("k", "v");
        let expected = form.content_type();
        let opts = options(
            HttpMethod::Post,
            "/post",
            ParamValue::Body(PrebuiltBody::from(form)),
        );
        let (_, ct) = build_body(&config(), &opts).await.unwrap();
        assert_eq!(ct, Some(expected));
    }

    #[tokio::test]
    async fn test_file_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.md");
        std::fs::write(&path, b"# title").unwrap();

        let mut opts = options(HttpMethod::Post, "/post", ParamValue::file(&path));
        opts.content_type = Some("text/x-markdown; charset=utf-8".into());
        let (body, ct) = build_body(&config(), &opts).await.unwrap();
        assert_eq!(body.len(), 7);
        assert_eq!(ct.as_deref(), Some("text/x-markdown; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_get_has_no_body() {
        let opts = options(HttpMethod::Get, "/get", "raw".into());
        let (body, ct) = build_body(&config(), &opts).await.unwrap();
        assert!(body.is_empty());
        assert!(ct.is_none());
    }

    #[test]
    fn test_headers_replace_defaults() {
        let config = WorkConfig::builder()
            .default_header("User-Agent", "httpwork")
            .default_header("X-Default", "1")
            .build();

        let defaults = build_headers(&config, None).unwrap();
        assert_eq!(defaults.len(), 2);

        let mut own = Headers::new();
        own.insert("X-Token".into(), "abc".into());
        let replaced = build_headers(&config, Some(&own)).unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced["x-token"], "abc");
        assert!(replaced.get("x-default").is_none());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut own = Headers::new();
        own.insert("bad header".into(), "x".into());
        assert!(matches!(
            build_headers(&config(), Some(&own)),
            Err(NetError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_timeouts_resolution() {
        let config = WorkConfig::builder()
            .read_timeout(Duration::from_secs(30))
            .build();
        let mut opts = options(HttpMethod::Get, "/", ParamValue::None);
        opts.connect_timeout = Some(Duration::from_secs(1));
        opts.read_timeout = Some(Duration::ZERO);

        let timeouts = resolve_timeouts(&config, &opts);
        assert_eq!(timeouts.connect, Some(Duration::from_secs(1)));
        assert_eq!(timeouts.read, None);
        assert_eq!(timeouts.write, config.write_timeout());
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("a.png")), "image/png");
        assert_eq!(guess_mime(Path::new("a.unknownext")), "application/octet-stream");
    }
}
