use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_io::Timer;
use futures_lite::future;
use url::Url;

use super::connection::{self, AsyncConnection, Endpoint};
use super::exchange::{exchange, Outcome};
use super::pool::{ConnectionPool, PoolStats};
use super::HttpTransportConfig;
use crate::request::RequestSpec;
use crate::transport::{CooperativeTransport, TransportFailure, TransportResponse};

/// HTTP/1.1 over `async-io` sockets, with TLS for `https` URLs.
///
/// Owns its connection pool; the pool lives as long as the transport, or
/// until [`close`](Self::close) is called.
#[derive(Debug)]
pub struct AsyncHttpTransport {
    config: HttpTransportConfig,
    pool: ConnectionPool<Box<dyn AsyncConnection>>,
    closed: AtomicBool,
}

impl AsyncHttpTransport {
    pub fn new() -> Self {
        Self::with_config(HttpTransportConfig::default())
    }

    pub fn with_config(config: HttpTransportConfig) -> Self {
        let pool = ConnectionPool::new(config.pool.clone());
        Self {
            config,
            pool,
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Drops all pooled connections. Later round trips fail with a connect error.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.pool.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) async fn execute(&self, request: &RequestSpec) -> Result<TransportResponse, TransportFailure> {
        if self.is_closed() {
            return Err(TransportFailure::connect("transport is closed"));
        }
        let url = request.target_url();
        let endpoint = Endpoint::from_url(&url)?;

        match request.timeout().or(self.config.default_timeout) {
            Some(timeout) => {
                future::or(self.round_trip_on(&endpoint, request, &url), expire(timeout)).await
            }
            None => self.round_trip_on(&endpoint, request, &url).await,
        }
    }

    async fn round_trip_on(
        &self,
        endpoint: &Endpoint,
        request: &RequestSpec,
        url: &Url,
    ) -> Result<TransportResponse, TransportFailure> {
        if let Some(mut connection) = self.pool.checkout(endpoint) {
            log::trace!("reusing pooled connection to {endpoint}");
            match exchange(&mut *connection, request, url, &self.config.user_agent).await? {
                Outcome::Complete { response, reusable } => {
                    self.release(endpoint, connection, reusable);
                    return Ok(response);
                }
                // the server closed the idle connection; one fresh attempt unless
                // it may already have acted on the request
                Outcome::NothingReceived { failure, sent } => {
                    if sent && !request.method().is_idempotent() {
                        log::debug!(
                            "pooled connection to {endpoint} closed after a {} was sent: {failure}",
                            request.method()
                        );
                        return Err(failure);
                    }
                    log::debug!("pooled connection to {endpoint} was stale: {failure}");
                }
            }
        }

        let mut connection = connection::connect(endpoint).await?;
        log::debug!("connected to {endpoint} (encrypted: {})", connection.is_encrypted());
        match exchange(&mut *connection, request, url, &self.config.user_agent).await? {
            Outcome::Complete { response, reusable } => {
                self.release(endpoint, connection, reusable);
                Ok(response)
            }
            Outcome::NothingReceived { failure, .. } => Err(failure),
        }
    }

    fn release(&self, endpoint: &Endpoint, connection: Box<dyn AsyncConnection>, reusable: bool) {
        if reusable && self.pool.checkin(endpoint, connection) {
            log::trace!("returned connection to {endpoint} to the pool");
        }
    }
}

impl Default for AsyncHttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl CooperativeTransport for AsyncHttpTransport {
    async fn round_trip(&self, request: &RequestSpec) -> Result<TransportResponse, TransportFailure> {
        self.execute(request).await
    }
}

async fn expire(timeout: Duration) -> Result<TransportResponse, TransportFailure> {
    Timer::after(timeout).await;
    Err(TransportFailure::timeout(format!(
        "no complete response within {timeout:?}"
    )))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_lite::future;

    use super::*;

    #[test]
    fn host_lookup_suspends_instead_of_blocking_the_poll() {
        let transport = AsyncHttpTransport::with_config(
            HttpTransportConfig::default().default_timeout(Some(Duration::from_millis(1))),
        );
        let request = RequestSpec::new("GET", "http://unresolvable-host.invalid/").unwrap();

        let first_poll = future::block_on(future::poll_once(transport.execute(&request)));

        assert!(first_poll.is_none(), "round trip completed inside its first poll");
    }

    #[test]
    fn closed_transport_fails_without_connecting() {
        let transport = AsyncHttpTransport::new();
        transport.close();
        let request = RequestSpec::new("GET", "http://svc/").unwrap();

        let failure = future::block_on(transport.execute(&request)).unwrap_err();

        assert_eq!(failure.reason(), crate::transport::FailureReason::ConnectError);
        assert!(transport.is_closed());
    }
}
