use std::fmt;
use std::io;
use std::num::ParseIntError;

use http::header::{InvalidHeaderName, InvalidHeaderValue, ToStrError};
use http::status::InvalidStatusCode;

/// Why a round trip failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    ConnectError,
    Timeout,
    ProtocolError,
    Cancelled,
}

impl FailureReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectError => "connect_error",
            Self::Timeout => "timeout",
            Self::ProtocolError => "protocol_error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed round trip, as reported by a transport.
///
/// Transports never hand back a partially populated response: anything that
/// goes wrong between resolving the host and reading the last body byte ends
/// up here.
#[derive(Debug, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct TransportFailure {
    reason: FailureReason,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            source: None,
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FailureReason::ConnectError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Timeout, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureReason::ProtocolError, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Cancelled, message)
    }

    /// Attaches the underlying error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn reason(&self) -> FailureReason {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for TransportFailure {
    fn from(err: io::Error) -> Self {
        let reason = match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::AddrInUse
            | io::ErrorKind::AddrNotAvailable => FailureReason::ConnectError,
            io::ErrorKind::TimedOut => FailureReason::Timeout,
            _ => FailureReason::ProtocolError,
        };
        Self::new(reason, err.to_string()).with_source(err)
    }
}

/// Converts the parse errors met while reading a response into protocol failures.
pub trait IntoTransportFailure<T> {
    fn into_transport_failure(self) -> Result<T, TransportFailure>;
}

impl<T> IntoTransportFailure<T> for Result<T, InvalidHeaderName> {
    fn into_transport_failure(self) -> Result<T, TransportFailure> {
        self.map_err(|e| TransportFailure::protocol(e.to_string()).with_source(e))
    }
}

impl<T> IntoTransportFailure<T> for Result<T, InvalidHeaderValue> {
    fn into_transport_failure(self) -> Result<T, TransportFailure> {
        self.map_err(|e| TransportFailure::protocol(e.to_string()).with_source(e))
    }
}

impl<T> IntoTransportFailure<T> for Result<T, ToStrError> {
    fn into_transport_failure(self) -> Result<T, TransportFailure> {
        self.map_err(|e| TransportFailure::protocol(e.to_string()).with_source(e))
    }
}

impl<T> IntoTransportFailure<T> for Result<T, InvalidStatusCode> {
    fn into_transport_failure(self) -> Result<T, TransportFailure> {
        self.map_err(|e| TransportFailure::protocol(e.to_string()).with_source(e))
    }
}

impl<T> IntoTransportFailure<T> for Result<T, ParseIntError> {
    fn into_transport_failure(self) -> Result<T, TransportFailure> {
        self.map_err(|e| TransportFailure::protocol(e.to_string()).with_source(e))
    }
}
