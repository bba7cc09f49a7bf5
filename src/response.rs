//! Transport-independent view over a completed response.
//!
//! The body bytes are held as received. Decoding into text or JSON happens
//! on first access and the decoded value is cached, so repeated calls to
//! [`ResponseView::text`] or [`ResponseView::json`] hand back the same value
//! without touching the body again.

use std::sync::OnceLock;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use miniserde::json::Value;
use url::Url;

use crate::error::{Error, Result};

/// How many body bytes an [`Error::HttpStatus`] carries.
const BODY_SNIPPET_LEN: usize = 256;

#[derive(Debug)]
pub struct ResponseView {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    text: OnceLock<String>,
    json: OnceLock<Value>,
}

impl ResponseView {
    pub(crate) fn new(url: Url, status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            text: OnceLock::new(),
            json: OnceLock::new(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Response headers; lookups are case-insensitive.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name`, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The URL the request was sent to, query parameters included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// Charset declared by `Content-Type`, lower-cased.
    pub fn charset(&self) -> Option<String> {
        let content_type = self.header(CONTENT_TYPE.as_str())?;
        content_type.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
        })
    }

    /// Body decoded with the declared charset, UTF-8 when none is declared.
    pub fn text(&self) -> Result<&str> {
        if let Some(text) = self.text.get() {
            return Ok(text);
        }
        let decoded = decode_text(&self.body, self.charset().as_deref())
            .map_err(|message| self.decode_error("text", message))?;
        Ok(self.text.get_or_init(|| decoded))
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<&Value> {
        if let Some(value) = self.json.get() {
            return Ok(value);
        }
        let value: Value = miniserde::json::from_str(self.text()?)
            .map_err(|_| self.decode_error("json", "malformed JSON"))?;
        Ok(self.json.get_or_init(|| value))
    }

    /// Body parsed as JSON into `T`. Not cached.
    pub fn json_as<T: miniserde::Deserialize>(&self) -> Result<T> {
        miniserde::json::from_str(self.text()?).map_err(|_| {
            self.decode_error(
                "json",
                format!("body does not match {}", std::any::type_name::<T>()),
            )
        })
    }

    /// Fails with [`Error::HttpStatus`] unless the status is within 200-399.
    pub fn raise_for_status(&self) -> Result<()> {
        if (200..400).contains(&self.status_code()) {
            return Ok(());
        }
        let end = self.body.len().min(BODY_SNIPPET_LEN);
        Err(Error::HttpStatus {
            url: self.url.to_string(),
            status: self.status_code(),
            body_snippet: String::from_utf8_lossy(&self.body[..end]).trim().to_owned(),
        })
    }

    fn decode_error(&self, target: &'static str, message: impl Into<String>) -> Error {
        Error::Decode {
            url: self.url.to_string(),
            status: self.status_code(),
            target,
            message: message.into(),
        }
    }
}

/// Fails with [`Error::HttpStatus`] unless `response` has a 200-399 status.
pub fn raise_for_status(response: &ResponseView) -> Result<()> {
    response.raise_for_status()
}

fn decode_text(body: &[u8], charset: Option<&str>) -> std::result::Result<String, String> {
    match charset.unwrap_or("utf-8") {
        "utf-8" | "utf8" => String::from_utf8(body.to_vec()).map_err(|e| format!("invalid UTF-8: {e}")),
        "us-ascii" | "ascii" => {
            if body.is_ascii() {
                Ok(body.iter().map(|&b| char::from(b)).collect())
            } else {
                Err("non-ASCII byte in US-ASCII body".to_owned())
            }
        }
        "iso-8859-1" | "latin1" | "latin-1" => Ok(body.iter().map(|&b| char::from(b)).collect()),
        other => Err(format!("unsupported charset {other:?}")),
    }
}
