//! Network transports speaking HTTP/1.1 over TCP, with TLS for `https`.
//!
//! [`AsyncHttpTransport`] is the cooperative variant and
//! [`BlockingHttpTransport`] the blocking one; both share the connection
//! code, the wire codec and the pool.

mod blocking;
mod connection;
mod cooperative;
mod exchange;
mod pool;

use std::time::Duration;

pub use blocking::BlockingHttpTransport;
pub use connection::{AsyncConnection, Endpoint, Scheme};
pub use cooperative::AsyncHttpTransport;
pub use pool::{ConnectionPool, PoolConfig, PoolStats};

/// Settings for the network transports.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Applied when a request carries no timeout; `None` waits indefinitely.
    pub default_timeout: Option<Duration>,
    pub pool: PoolConfig,
    /// Sent as `User-Agent` unless the request sets one; empty sends none.
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            default_timeout: Some(Duration::from_secs(30)),
            pool: PoolConfig::default(),
            user_agent: concat!("http_adapter/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl HttpTransportConfig {
    pub fn default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
