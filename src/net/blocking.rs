use super::cooperative::AsyncHttpTransport;
use super::pool::PoolStats;
use super::HttpTransportConfig;
use crate::request::RequestSpec;
use crate::transport::{BlockingTransport, TransportFailure, TransportResponse};

/// HTTP/1.1 transport that runs each round trip to completion on the calling
/// thread.
///
/// The socket work is driven by `async_io::block_on`, so callers need no
/// executor of their own; the thread is simply parked until the response is
/// complete or the timeout fires.
#[derive(Debug, Default)]
pub struct BlockingHttpTransport {
    inner: AsyncHttpTransport,
}

impl BlockingHttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HttpTransportConfig) -> Self {
        Self {
            inner: AsyncHttpTransport::with_config(config),
        }
    }

    pub fn config(&self) -> &HttpTransportConfig {
        self.inner.config()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.inner.pool_stats()
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl From<AsyncHttpTransport> for BlockingHttpTransport {
    fn from(inner: AsyncHttpTransport) -> Self {
        Self { inner }
    }
}

impl BlockingTransport for BlockingHttpTransport {
    fn round_trip(&self, request: &RequestSpec) -> Result<TransportResponse, TransportFailure> {
        async_io::block_on(self.inner.execute(request))
    }
}
