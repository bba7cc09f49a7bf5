use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use async_io::Async;
use async_tls::client::TlsStream;
use async_tls::TlsConnector;
use futures_lite::{AsyncRead, AsyncWrite};
use url::{Host, Url};

use crate::transport::TransportFailure;

pub trait AsyncConnection: AsyncRead + AsyncWrite + Send + Sync + Unpin {
    fn is_encrypted(&self) -> bool;
}

impl AsyncConnection for Async<TcpStream> {
    fn is_encrypted(&self) -> bool {
        false
    }
}

impl AsyncConnection for TlsStream<Async<TcpStream>> {
    fn is_encrypted(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

/// Where a connection goes; also the key connections are pooled under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    // Extracts the scheme, host, and port from the request URL
    pub fn from_url(url: &Url) -> Result<Self, TransportFailure> {
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(TransportFailure::connect(format!("unsupported URL scheme {other:?}"))),
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(TransportFailure::connect(format!("no host in {url}"))),
        };
        let port = url.port().unwrap_or(match scheme {
            Scheme::Http => 80,
            Scheme::Https => 443,
        });
        Ok(Self { scheme, host, port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        write!(f, "{scheme}://{}:{}", self.host, self.port)
    }
}

/// Resolves `endpoint` on the blocking thread pool so the calling task only
/// suspends. If the future is dropped the lookup finishes in the background
/// and its result is discarded.
async fn resolve(endpoint: &Endpoint) -> io::Result<Vec<SocketAddr>> {
    let host = endpoint.host.clone();
    let port = endpoint.port;
    blocking::unblock(move || (host.as_str(), port).to_socket_addrs().map(Iterator::collect)).await
}

/// Opens a fresh connection to `endpoint`, negotiating TLS for `https`.
pub async fn connect(endpoint: &Endpoint) -> Result<Box<dyn AsyncConnection>, TransportFailure> {
    log::debug!("connecting to {endpoint}");

    let addrs = resolve(endpoint).await.map_err(|e| {
        TransportFailure::connect(format!("failed to resolve host {}", endpoint.host)).with_source(e)
    })?;

    let mut last_error = None;
    let mut stream = None;
    for addr in addrs {
        match Async::<TcpStream>::connect(addr).await {
            Ok(connected) => {
                stream = Some(connected);
                break;
            }
            Err(e) => {
                log::debug!("connect to {addr} failed: {e}");
                last_error = Some(e);
            }
        }
    }
    let stream = match (stream, last_error) {
        (Some(stream), _) => stream,
        (None, Some(e)) => {
            return Err(TransportFailure::connect(format!("failed to connect to {endpoint}")).with_source(e))
        }
        (None, None) => {
            return Err(TransportFailure::connect(format!(
                "no addresses found for {}",
                endpoint.host
            )))
        }
    };

    let stream: Box<dyn AsyncConnection> = match endpoint.scheme {
        Scheme::Https => {
            let tls_connector = TlsConnector::new();
            let tls_stream = tls_connector
                .connect(&endpoint.host, stream)
                .await
                .map_err(|e| {
                    TransportFailure::connect(format!("TLS handshake with {} failed", endpoint.host))
                        .with_source(e)
                })?;
            Box::new(tls_stream)
        }
        Scheme::Http => Box::new(stream),
    };

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FailureReason;

    fn endpoint(url: &str) -> Result<Endpoint, TransportFailure> {
        Endpoint::from_url(&Url::parse(url).unwrap())
    }

    #[test]
    fn fills_in_default_ports() {
        let http = endpoint("http://svc/resource").unwrap();
        assert_eq!((http.scheme, http.host.as_str(), http.port), (Scheme::Http, "svc", 80));

        let https = endpoint("https://svc:8443/").unwrap();
        assert_eq!((https.scheme, https.port), (Scheme::Https, 8443));
        assert_eq!(https.to_string(), "https://svc:8443");
    }

    #[test]
    fn strips_brackets_from_ipv6_hosts() {
        let endpoint = endpoint("http://[::1]:8080/").unwrap();
        assert_eq!(endpoint.host, "::1");
    }

    #[test]
    fn rejects_other_schemes() {
        let failure = endpoint("ftp://svc/file").unwrap_err();
        assert_eq!(failure.reason(), FailureReason::ConnectError);
    }
}
