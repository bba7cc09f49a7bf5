//! The caller-facing entry point.
//!
//! An [`Adapter`] owns one transport. Validation, default merging, failure
//! mapping and response construction are shared by both entry points; only
//! the line that hands the request to the transport differs between
//! [`Adapter::send`] and [`Adapter::send_async`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_lite::future;
use http::StatusCode;
use url::Url;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::headers::HeaderSet;
use crate::request::RequestSpec;
use crate::response::ResponseView;
use crate::transport::{
    BlockingTransport, CooperativeTransport, FailureReason, TransportFailure, TransportResponse,
};

/// Settings applied to every request an adapter sends.
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Sent with every request unless the request sets the same header.
    pub default_headers: HeaderSet,
    /// Used when a request has no timeout of its own.
    pub default_timeout: Option<Duration>,
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    fn validate(&self) -> Result<()> {
        self.default_headers.validate()?;
        if self.default_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::validation("default timeout must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Adapter<T> {
    transport: T,
    config: AdapterConfig,
    in_flight: AtomicUsize,
}

impl<T> Adapter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: AdapterConfig::default(),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_config(transport: T, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Number of calls that have been handed to the transport and not yet
    /// completed, failed or been dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn prepare(&self, spec: &RequestSpec) -> Result<RequestSpec> {
        spec.prepared(&self.config.default_headers, self.config.default_timeout)
    }
}

impl<T: BlockingTransport> Adapter<T> {
    /// Sends `spec` and blocks the calling thread until the response is complete.
    ///
    /// HTTP error statuses are returned as regular responses; see
    /// [`ResponseView::raise_for_status`].
    pub fn send(&self, spec: &RequestSpec) -> Result<ResponseView> {
        let request = self.prepare(spec)?;
        let url = request.target_url();
        let outcome = {
            let _in_flight = InFlight::enter(&self.in_flight);
            self.transport.round_trip(&request)
        };
        complete(url, outcome)
    }
}

impl<T: CooperativeTransport> Adapter<T> {
    /// Sends `spec`, suspending the calling task until the response is complete.
    ///
    /// HTTP error statuses are returned as regular responses; see
    /// [`ResponseView::raise_for_status`].
    pub async fn send_async(&self, spec: &RequestSpec) -> Result<ResponseView> {
        let request = self.prepare(spec)?;
        let url = request.target_url();
        let outcome = {
            let _in_flight = InFlight::enter(&self.in_flight);
            self.transport.round_trip(&request).await
        };
        complete(url, outcome)
    }

    /// Like [`send_async`](Self::send_async), but gives up as soon as `token`
    /// is cancelled.
    ///
    /// A cancelled call drops the transport's round trip, never yields a
    /// response and fails with [`Error::Cancelled`]. If `token` is already
    /// cancelled the transport is not called at all.
    pub async fn send_async_with_cancel(
        &self,
        spec: &RequestSpec,
        token: &CancelToken,
    ) -> Result<ResponseView> {
        let request = self.prepare(spec)?;
        let url = request.target_url();
        if token.is_cancelled() {
            return Err(Error::Cancelled {
                url: url.to_string(),
                source: TransportFailure::cancelled("cancelled before sending"),
            });
        }
        let outcome = {
            let _in_flight = InFlight::enter(&self.in_flight);
            // cancellation is polled first so it wins a tie with the response
            future::or(
                async {
                    token.cancelled().await;
                    Err::<TransportResponse, _>(TransportFailure::cancelled("cancelled by caller"))
                },
                self.transport.round_trip(&request),
            )
            .await
        };
        complete(url, outcome)
    }
}

/// Tracks one call in the `InFlight` state; leaving scope, including by the
/// future being dropped, moves it out.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn complete(
    url: Url,
    outcome: std::result::Result<TransportResponse, TransportFailure>,
) -> Result<ResponseView> {
    let response = outcome.map_err(|failure| map_failure(&url, failure))?;
    let status = match StatusCode::from_u16(response.status) {
        Ok(status) if status.as_u16() < 600 => status,
        _ => {
            let failure = TransportFailure::protocol(format!("invalid status code {}", response.status));
            return Err(map_failure(&url, failure));
        }
    };
    Ok(ResponseView::new(url, status, response.headers, response.body))
}

fn map_failure(url: &Url, failure: TransportFailure) -> Error {
    let url = url.to_string();
    match failure.reason() {
        FailureReason::ConnectError | FailureReason::ProtocolError => {
            Error::Connection { url, source: failure }
        }
        FailureReason::Timeout => Error::Timeout { url, source: failure },
        FailureReason::Cancelled => Error::Cancelled { url, source: failure },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn url() -> Url {
        Url::parse("http://svc/resource").unwrap()
    }

    #[test]
    fn maps_every_failure_reason() {
        let cases = [
            (TransportFailure::connect("refused"), ErrorKind::Connection),
            (TransportFailure::protocol("bad chunk"), ErrorKind::Connection),
            (TransportFailure::timeout("30s"), ErrorKind::Timeout),
            (TransportFailure::cancelled("dropped"), ErrorKind::Cancelled),
        ];
        for (failure, kind) in cases {
            let message = failure.message().to_owned();
            let err = complete(url(), Err(failure)).unwrap_err();
            assert_eq!(err.kind(), kind);
            assert!(err.to_string().contains(&message));
            assert_eq!(err.url(), Some("http://svc/resource"));
        }
    }

    #[test]
    fn error_statuses_still_produce_a_response() {
        for status in [200, 301, 404, 503] {
            let response = complete(url(), Ok(TransportResponse::new(status))).unwrap();
            assert_eq!(response.status_code(), status);
        }
    }

    #[test]
    fn out_of_range_status_is_a_protocol_error() {
        for status in [0, 99, 600, 999] {
            let err = complete(url(), Ok(TransportResponse::new(status))).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Connection);
            assert_eq!(err.reason(), Some(FailureReason::ProtocolError));
        }
    }

    #[test]
    fn rejects_invalid_default_config() {
        let config = AdapterConfig::new().default_timeout(Duration::ZERO);
        assert!(Adapter::with_config((), config).is_err());
        let config = AdapterConfig::new().header("X Bad", "v");
        assert!(Adapter::with_config((), config).is_err());
    }
}
