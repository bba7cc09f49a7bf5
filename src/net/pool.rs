//! Idle connection pool.
//!
//! Connections are checked out for the length of one exchange and checked
//! back in only when the exchange left them clean. All bookkeeping happens
//! under one mutex, which is never held across an await point.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::connection::Endpoint;

/// Configuration for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Idle connections kept per endpoint; `0` disables pooling.
    pub max_idle_per_host: usize,
    /// How long an idle connection may sit unused before it is discarded.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 8,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

impl PoolConfig {
    pub fn max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

/// Snapshot of the pool's contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub idle_connections: usize,
    pub endpoints: usize,
}

struct Idle<C> {
    connection: C,
    since: Instant,
}

struct PoolState<C> {
    idle: HashMap<Endpoint, Vec<Idle<C>>>,
    closed: bool,
}

pub struct ConnectionPool<C> {
    config: PoolConfig,
    state: Mutex<PoolState<C>>,
}

impl<C> ConnectionPool<C> {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState {
                idle: HashMap::new(),
                closed: false,
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Takes the most recently returned live connection for `endpoint`.
    pub fn checkout(&self, endpoint: &Endpoint) -> Option<C> {
        let mut state = self.state.lock();
        let idle = state.idle.get_mut(endpoint)?;
        let now = Instant::now();
        let mut found = None;
        while let Some(entry) = idle.pop() {
            if now.duration_since(entry.since) < self.config.idle_timeout {
                found = Some(entry.connection);
                break;
            }
            log::trace!("dropping expired connection to {endpoint}");
        }
        if idle.is_empty() {
            state.idle.remove(endpoint);
        }
        found
    }

    /// Returns a connection for reuse. Returns `false` when it was dropped
    /// instead, because the pool is full or closed.
    pub fn checkin(&self, endpoint: &Endpoint, connection: C) -> bool {
        let mut state = self.state.lock();
        if state.closed || self.config.max_idle_per_host == 0 {
            return false;
        }
        let idle = state.idle.entry(endpoint.clone()).or_default();
        if idle.len() >= self.config.max_idle_per_host {
            log::trace!("pool for {endpoint} is full, dropping connection");
            return false;
        }
        idle.push(Idle {
            connection,
            since: Instant::now(),
        });
        true
    }

    /// Drops every idle connection and refuses further check-ins.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        let dropped: usize = state.idle.drain().map(|(_, idle)| idle.len()).sum();
        log::debug!("connection pool closed, dropped {dropped} idle connections");
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle_connections: state.idle.values().map(Vec::len).sum(),
            endpoints: state.idle.len(),
        }
    }
}

impl<C> fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
