//! HTTP/1.1 message framing used by the network transports.

mod decode;
mod encode;

pub use decode::{
    body_framing, keeps_alive, parse_response_status_line, read_response_body, read_response_headers,
    read_response_status_line,
};
pub use encode::serialize_request_head;
