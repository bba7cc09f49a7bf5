//! Transport abstraction: how one request travels over the wire.
//!
//! A transport performs exactly one round trip for a [`RequestSpec`] and
//! normalizes whatever its underlying client produced into a
//! [`TransportResponse`]. There are two flavours, and an adapter is built
//! over exactly one of them:
//!
//! - [`BlockingTransport`]: the calling thread is occupied until the response
//!   is complete. No event loop is needed.
//! - [`CooperativeTransport`]: the calling task is suspended at the network
//!   boundary and resumed when bytes are available.

mod failure;

use std::future::Future;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::request::RequestSpec;

pub use failure::{FailureReason, IntoTransportFailure, TransportFailure};

/// The transport-independent shape of a completed round trip.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// A transport that completes the round trip on the calling thread.
pub trait BlockingTransport: Send + Sync {
    /// Sends `request` and waits for the complete response.
    fn round_trip(&self, request: &RequestSpec) -> Result<TransportResponse, TransportFailure>;
}

/// A transport that suspends the calling task while waiting on the network.
pub trait CooperativeTransport: Send + Sync {
    /// Sends `request`; the returned future resolves once the response is complete.
    ///
    /// Dropping the future before it resolves abandons the round trip and
    /// must not leave a half-used connection behind for later calls.
    fn round_trip(
        &self,
        request: &RequestSpec,
    ) -> impl Future<Output = Result<TransportResponse, TransportFailure>> + Send;
}

impl<T: BlockingTransport + ?Sized> BlockingTransport for Arc<T> {
    fn round_trip(&self, request: &RequestSpec) -> Result<TransportResponse, TransportFailure> {
        (**self).round_trip(request)
    }
}

impl<T: CooperativeTransport> CooperativeTransport for Arc<T> {
    fn round_trip(
        &self,
        request: &RequestSpec,
    ) -> impl Future<Output = Result<TransportResponse, TransportFailure>> + Send {
        (**self).round_trip(request)
    }
}
