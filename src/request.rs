//! Immutable description of an outbound request.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use miniserde::json::{Object, Value};
use url::Url;

use crate::error::{Error, Result};
use crate::headers::HeaderSet;

/// The request methods the adapter will send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }

    /// Methods whose requests announce `Content-Length: 0` even without a body.
    pub(crate) const fn expects_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Whether sending the request twice has the same effect as sending it once.
    pub const fn is_idempotent(self) -> bool {
        matches!(self, Self::Get | Self::Put | Self::Delete | Self::Options)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(Error::validation(format!("unsupported method {s:?}"))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload: raw bytes, or a JSON mapping serialized on send.
#[derive(Debug, Clone)]
pub enum Body {
    Bytes(Vec<u8>),
    Json(Object),
}

impl Body {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// The bytes that go on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Json(object) => miniserde::json::to_string(&Value::Object(object.clone())).into_bytes(),
        }
    }
}

/// A validated, immutable outbound request.
///
/// Built once through [`RequestSpec::builder`]; derived requests are produced
/// with the `with_*` methods, which leave the original untouched.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: Url,
    headers: HeaderSet,
    query_params: BTreeMap<String, String>,
    body: Option<Body>,
    timeout: Option<Duration>,
}

impl RequestSpec {
    /// Shorthand for a request without headers, query parameters or body.
    pub fn new(method: &str, url: &str) -> Result<Self> {
        Self::builder(method, url).build()
    }

    pub fn builder(method: impl Into<String>, url: impl Into<String>) -> RequestSpecBuilder {
        RequestSpecBuilder {
            method: method.into(),
            url: url.into(),
            headers: HeaderSet::new(),
            query_params: BTreeMap::new(),
            raw_body: None,
            json_body: None,
            timeout_seconds: None,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The URL as given, without `query_params` merged in.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// `None` means the transport's default applies.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The URL that is actually requested: `query_params` are appended after
    /// any query already present, percent-encoded, without deduplication.
    pub fn target_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query_params.iter());
        }
        url
    }

    /// Serialized body, empty when there is none.
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.as_ref().map(Body::to_bytes).unwrap_or_default()
    }

    /// Returns a copy of this request with one more header.
    pub fn with_header(&self, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let mut derived = self.clone();
        derived.headers.insert(name, value);
        derived.headers.validate()?;
        derived.check_content_type()?;
        Ok(derived)
    }

    /// Returns a copy of this request with a different timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::validation("timeout must be positive"));
        }
        let mut derived = self.clone();
        derived.timeout = Some(timeout);
        Ok(derived)
    }

    /// The request as handed to a transport: defaults filled in, and a JSON
    /// body labelled as such.
    pub(crate) fn prepared(&self, default_headers: &HeaderSet, default_timeout: Option<Duration>) -> Result<Self> {
        let mut derived = self.clone();
        derived.headers = self.headers.merged_over(default_headers);
        derived.check_content_type()?;
        if self.body.as_ref().is_some_and(Body::is_json) && !derived.headers.contains("content-type") {
            derived.headers.insert("Content-Type", "application/json");
        }
        derived.timeout = self.timeout.or(default_timeout);
        Ok(derived)
    }

    fn check_content_type(&self) -> Result<()> {
        if !self.body.as_ref().is_some_and(Body::is_json) {
            return Ok(());
        }
        match self.headers.get("content-type") {
            Some(content_type) if !is_json_media_type(content_type) => Err(Error::validation(format!(
                "content-type {content_type:?} conflicts with a JSON body"
            ))),
            _ => Ok(()),
        }
    }
}

pub(crate) fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Collects request parts; nothing is checked until [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RequestSpecBuilder {
    method: String,
    url: String,
    headers: HeaderSet,
    query_params: BTreeMap<String, String>,
    raw_body: Option<Vec<u8>>,
    json_body: Option<Object>,
    timeout_seconds: Option<f64>,
}

impl RequestSpecBuilder {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Raw payload. Cannot be combined with [`json`](Self::json).
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    /// JSON mapping payload. Cannot be combined with [`body`](Self::body).
    pub fn json(mut self, object: Object) -> Self {
        self.json_body = Some(object);
        self
    }

    pub fn timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = Some(timeout.as_secs_f64());
        self
    }

    pub fn build(self) -> Result<RequestSpec> {
        if self.url.trim().is_empty() {
            return Err(Error::validation("url must not be empty"));
        }
        let method = self.method.parse::<Method>()?;
        let url = Url::parse(self.url.trim())
            .map_err(|e| Error::validation(format!("invalid url {:?}: {e}", self.url)))?;
        if !url.has_host() {
            return Err(Error::validation(format!("url {url} has no host")));
        }

        let body = match (self.raw_body, self.json_body) {
            (Some(_), Some(_)) => {
                return Err(Error::validation(
                    "body cannot be both raw bytes and a JSON mapping",
                ))
            }
            (Some(bytes), None) => Some(Body::Bytes(bytes)),
            (None, Some(object)) => Some(Body::Json(object)),
            (None, None) => None,
        };

        let timeout = match self.timeout_seconds {
            None => None,
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => Some(
                Duration::try_from_secs_f64(seconds)
                    .map_err(|e| Error::validation(format!("invalid timeout {seconds}: {e}")))?,
            ),
            Some(seconds) => {
                return Err(Error::validation(format!(
                    "timeout must be a positive number of seconds, got {seconds}"
                )))
            }
        };

        self.headers.validate()?;
        let spec = RequestSpec {
            method,
            url,
            headers: self.headers,
            query_params: self.query_params,
            body,
            timeout,
        };
        spec.check_content_type()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn object(key: &str, value: &str) -> Object {
        let mut object = Object::new();
        object.insert(key.to_owned(), Value::String(value.to_owned()));
        object
    }

    #[test]
    fn parses_methods_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Options".parse::<Method>().unwrap(), Method::Options);
        let err = "HEAD".parse::<Method>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn only_post_and_patch_are_unsafe_to_replay() {
        let all = [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
            Method::Options,
        ];
        let replayable: Vec<_> = all
            .into_iter()
            .filter(|method| method.is_idempotent())
            .collect();
        assert_eq!(replayable, [Method::Get, Method::Put, Method::Delete, Method::Options]);
    }

    #[test]
    fn rejects_empty_and_relative_urls() {
        assert_eq!(RequestSpec::new("GET", "").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(RequestSpec::new("GET", "   ").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(RequestSpec::new("GET", "/relative/path").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(RequestSpec::new("GET", "mailto:ops@svc").unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn rejects_raw_and_json_body_together() {
        let err = RequestSpec::builder("POST", "http://svc/items")
            .body(b"raw".to_vec())
            .json(object("name", "widget"))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn rejects_conflicting_content_type_for_json() {
        let err = RequestSpec::builder("POST", "http://svc/items")
            .header("Content-Type", "text/plain")
            .json(object("name", "widget"))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let ok = RequestSpec::builder("PATCH", "http://svc/items/1")
            .header("content-type", "application/merge-patch+json; charset=utf-8")
            .json(object("name", "widget"))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_non_positive_timeouts() {
        for seconds in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = RequestSpec::builder("GET", "http://svc/")
                .timeout_seconds(seconds)
                .build()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        let spec = RequestSpec::builder("GET", "http://svc/")
            .timeout_seconds(1.5)
            .build()
            .unwrap();
        assert_eq!(spec.timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn merges_query_params_after_existing_query() {
        let spec = RequestSpec::builder("GET", "http://x/y?z=3")
            .query("a", "1")
            .query("b", "2")
            .build()
            .unwrap();
        assert_eq!(spec.target_url().as_str(), "http://x/y?z=3&a=1&b=2");
        assert_eq!(spec.url().as_str(), "http://x/y?z=3");
    }

    #[test]
    fn keeps_duplicate_keys_across_existing_and_merged_query() {
        let spec = RequestSpec::builder("GET", "http://x/y?a=0")
            .query("a", "1")
            .build()
            .unwrap();
        let pairs: Vec<(String, String)> = spec.target_url().query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("a".into(), "0".into()), ("a".into(), "1".into())]
        );
    }

    #[test]
    fn percent_encodes_query_params() {
        let spec = RequestSpec::builder("GET", "http://x/search")
            .query("q", "a&b=c d")
            .build()
            .unwrap();
        assert_eq!(spec.target_url().query(), Some("q=a%26b%3Dc+d"));
    }

    #[test]
    fn with_header_copies_instead_of_mutating() {
        let original = RequestSpec::new("GET", "http://svc/").unwrap();
        let derived = original.with_header("Authorization", "Bearer t0k3n").unwrap();
        assert!(original.headers().is_empty());
        assert_eq!(derived.headers().get("authorization"), Some("Bearer t0k3n"));
    }

    #[test]
    fn prepared_labels_json_bodies() {
        let spec = RequestSpec::builder("POST", "http://svc/items")
            .json(object("name", "widget"))
            .build()
            .unwrap();
        let prepared = spec.prepared(&HeaderSet::new(), Some(Duration::from_secs(5))).unwrap();
        assert_eq!(prepared.headers().get("Content-Type"), Some("application/json"));
        assert_eq!(prepared.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(prepared.body_bytes(), br#"{"name":"widget"}"#.to_vec());
    }

    #[test]
    fn prepared_rejects_conflicting_default_content_type() {
        let spec = RequestSpec::builder("POST", "http://svc/items")
            .json(object("name", "widget"))
            .build()
            .unwrap();
        let defaults: HeaderSet = [("Content-Type", "text/csv")].into_iter().collect();
        assert_eq!(
            spec.prepared(&defaults, None).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }
}
