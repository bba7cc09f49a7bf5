//! Error taxonomy surfaced to callers of the adapter.
//!
//! Every failure a caller can observe is one [`Error`]. Transport-level
//! problems arrive as [`TransportFailure`]s and are mapped into the
//! `Connection`, `Timeout` or `Cancelled` variants by the adapter; the other
//! variants are produced locally (request validation, body decoding, explicit
//! status checks).

use std::fmt;

use crate::transport::{FailureReason, TransportFailure};

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Connection,
    Timeout,
    Cancelled,
    Decode,
    HttpStatus,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Decode => "decode",
            Self::HttpStatus => "http_status",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request failed local validation; nothing was sent.
    #[error("invalid request: {message}")]
    Validation { message: String },

    /// DNS, connect, TLS or wire-level protocol failure.
    #[error("request to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: TransportFailure,
    },

    /// The configured timeout elapsed before the response was complete.
    #[error("request to {url} timed out: {source}")]
    Timeout {
        url: String,
        #[source]
        source: TransportFailure,
    },

    /// The awaiting task cancelled the call before it completed.
    #[error("request to {url} was cancelled: {source}")]
    Cancelled {
        url: String,
        #[source]
        source: TransportFailure,
    },

    /// The response body could not be decoded as requested.
    #[error("cannot decode {target} body of {status} response from {url}: {message}")]
    Decode {
        url: String,
        status: u16,
        target: &'static str,
        message: String,
    },

    /// Returned by `raise_for_status` for statuses outside 200-399.
    #[error("HTTP status {status} from {url}: {body_snippet}")]
    HttpStatus {
        url: String,
        status: u16,
        body_snippet: String,
    },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
        }
    }

    /// HTTP status of the response this error relates to, when one arrived.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Decode { status, .. } | Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The URL the failed call was sent to. `None` for validation errors.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Validation { .. } => None,
            Self::Connection { url, .. }
            | Self::Timeout { url, .. }
            | Self::Cancelled { url, .. }
            | Self::Decode { url, .. }
            | Self::HttpStatus { url, .. } => Some(url),
        }
    }

    /// The transport reason behind a connection, timeout or cancellation error.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Connection { source, .. }
            | Self::Timeout { source, .. }
            | Self::Cancelled { source, .. } => Some(source.reason()),
            _ => None,
        }
    }
}
