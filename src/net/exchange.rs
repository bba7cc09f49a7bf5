use futures_lite::{io::BufReader, AsyncRead, AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::request::RequestSpec;
use crate::transport::{TransportFailure, TransportResponse};
use crate::wire;

pub(crate) enum Outcome {
    /// A full response was read; `reusable` says whether the connection is clean.
    Complete {
        response: TransportResponse,
        reusable: bool,
    },
    /// The connection failed before a single response byte arrived.
    /// `sent` is set once the whole request was written and flushed.
    NothingReceived { failure: TransportFailure, sent: bool },
}

/// Writes `request` to `stream` and reads back one complete response.
pub(crate) async fn exchange<S>(
    stream: &mut S,
    request: &RequestSpec,
    url: &Url,
    user_agent: &str,
) -> Result<Outcome, TransportFailure>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    // Write the HTTP request to the stream
    let body = request.body_bytes();
    let head = wire::serialize_request_head(request, url, body.len(), user_agent);
    log::debug!("request head = {head}");
    if let Err(failure) = write_request(stream, head.as_bytes(), &body).await {
        return Ok(Outcome::NothingReceived { failure, sent: false });
    }

    // Read and parse the response, skipping interim 1xx responses
    let mut reader = BufReader::new(&mut *stream);
    let mut first_line = true;
    let (version, status, headers) = loop {
        let status_line = match wire::read_response_status_line(&mut reader).await {
            Ok(line) => line,
            Err(failure) if first_line => return Ok(Outcome::NothingReceived { failure, sent: true }),
            Err(failure) => return Err(failure),
        };
        first_line = false;
        if status_line.is_empty() {
            return Ok(Outcome::NothingReceived {
                failure: TransportFailure::protocol("connection closed before a response arrived"),
                sent: true,
            });
        }
        log::debug!("response status line = {}", status_line.trim_end());
        let (version, status) = wire::parse_response_status_line(&status_line)?;
        let headers = wire::read_response_headers(&mut reader).await?;
        log::trace!("response headers = {headers:?}");
        if status.is_informational() && status != http::StatusCode::SWITCHING_PROTOCOLS {
            continue;
        }
        break (version, status, headers);
    };

    let framing = wire::body_framing(status, &headers)?;
    let body = wire::read_response_body(&mut reader, framing).await?;
    log::trace!("response body = {} bytes", body.len());

    let reusable = framing.is_delimited()
        && status != http::StatusCode::SWITCHING_PROTOCOLS
        && wire::keeps_alive(version, &headers)
        && reader.buffer().is_empty();

    Ok(Outcome::Complete {
        response: TransportResponse {
            status: status.as_u16(),
            headers,
            body,
        },
        reusable,
    })
}

async fn write_request<S>(stream: &mut S, head: &[u8], body: &[u8]) -> Result<(), TransportFailure>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(head).await?;
    if !body.is_empty() {
        stream.write_all(body).await?;
    }
    stream.flush().await?;
    Ok(())
}
