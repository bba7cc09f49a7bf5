//! Case-insensitive request header storage.

use std::collections::BTreeMap;

use http::{HeaderName, HeaderValue};

use crate::error::{Error, Result};

/// Request headers keyed by their lower-cased name.
///
/// A later write replaces an earlier one with the same canonical name, and its
/// spelling is the one used on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: BTreeMap<String, (String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        self.entries
            .insert(name.to_ascii_lowercase(), (name, value.into()))
            .map(|(_, previous)| previous)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs using the caller's spelling of each name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns `defaults` overlaid with these headers; entries in `self` win.
    pub fn merged_over(&self, defaults: &HeaderSet) -> HeaderSet {
        let mut merged = defaults.clone();
        merged
            .entries
            .extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Checks that every name and value can be sent as an HTTP/1.1 header.
    pub(crate) fn validate(&self) -> Result<()> {
        for (name, value) in self.iter() {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::validation(format!("invalid header name {name:?}")))?;
            HeaderValue::from_str(value)
                .map_err(|_| Error::validation(format!("invalid value for header {name:?}")))?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for HeaderSet {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = HeaderSet::new();
        headers.insert("X-Request-Id", "abc");
        assert_eq!(headers.get("x-request-id"), Some("abc"));
        assert!(headers.contains("X-REQUEST-ID"));
    }

    #[test]
    fn later_write_wins_with_its_own_spelling() {
        let mut headers = HeaderSet::new();
        headers.insert("accept", "text/html");
        let previous = headers.insert("ACCEPT", "application/json");
        assert_eq!(previous.as_deref(), Some("text/html"));
        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![("ACCEPT", "application/json")]
        );
    }

    #[test]
    fn request_headers_override_defaults() {
        let defaults: HeaderSet = [("User-Agent", "svc/1"), ("Accept", "*/*")].into_iter().collect();
        let own: HeaderSet = [("accept", "application/json")].into_iter().collect();
        let merged = own.merged_over(&defaults);
        assert_eq!(merged.get("Accept"), Some("application/json"));
        assert_eq!(merged.get("user-agent"), Some("svc/1"));
    }

    #[test]
    fn rejects_header_injection() {
        let headers: HeaderSet = [("X-Evil", "a\r\nHost: other")].into_iter().collect();
        assert!(headers.validate().is_err());
        let headers: HeaderSet = [("Bad Name", "v")].into_iter().collect();
        assert!(headers.validate().is_err());
    }
}
