//! HTTP request/response adapter over pluggable transports.
//!
//! Build a [`RequestSpec`], hand it to an [`Adapter`], get back a
//! [`ResponseView`] or a typed [`Error`]. The adapter is generic over its
//! transport: a [`BlockingTransport`] gives it a synchronous
//! [`Adapter::send`], a [`CooperativeTransport`] an awaitable
//! [`Adapter::send_async`]. Everything else (validation, header defaults,
//! failure mapping, response decoding) is the same in both modes.
//!
//! ```no_run
//! # #[cfg(feature = "net")]
//! # fn main() -> Result<(), http_adapter::Error> {
//! use http_adapter::net::BlockingHttpTransport;
//! use http_adapter::{Adapter, RequestSpec};
//!
//! let adapter = Adapter::new(BlockingHttpTransport::new());
//! let request = RequestSpec::builder("GET", "http://svc/resource")
//!     .query("page", "2")
//!     .build()?;
//! let response = adapter.send(&request)?;
//! response.raise_for_status()?;
//! println!("{:?}", response.json()?);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "net"))]
//! # fn main() {}
//! ```

mod adapter;
mod cancel;
mod error;
mod headers;
mod request;
mod response;
pub mod transport;

#[cfg(feature = "net")]
pub mod net;
#[cfg(feature = "net")]
mod wire;

pub use adapter::{Adapter, AdapterConfig};
pub use cancel::CancelToken;
pub use error::{Error, ErrorKind, Result};
pub use headers::HeaderSet;
pub use request::{Body, Method, RequestSpec, RequestSpecBuilder};
pub use response::{raise_for_status, ResponseView};
pub use transport::{
    BlockingTransport, CooperativeTransport, FailureReason, TransportFailure, TransportResponse,
};

pub use miniserde::json;
