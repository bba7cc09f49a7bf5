use std::str::FromStr;

use futures_lite::{io::BufReader, AsyncBufReadExt, AsyncRead, AsyncReadExt};
use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};

use crate::transport::{IntoTransportFailure, TransportFailure};

const MAX_HEADERS: usize = 128;

/// How the end of a response body is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

impl Framing {
    /// Whether the connection can carry another exchange after this body.
    pub fn is_delimited(self) -> bool {
        !matches!(self, Self::UntilClose)
    }
}

// Reads the response status line from the stream; empty if the peer closed first
pub async fn read_response_status_line<S>(reader: &mut BufReader<S>) -> Result<String, TransportFailure>
where
    S: AsyncRead + Unpin,
{
    let mut response_status_line = String::new();
    reader.read_line(&mut response_status_line).await?;
    Ok(response_status_line)
}

// Parses the response status line into a version and status code
pub fn parse_response_status_line(response_status_line: &str) -> Result<(Version, StatusCode), TransportFailure> {
    let parts: Vec<&str> = response_status_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(TransportFailure::protocol(format!(
            "malformed status line {:?}",
            response_status_line.trim_end()
        )));
    }

    let version = match parts[0] {
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/1.1" => Version::HTTP_11,
        other => {
            return Err(TransportFailure::protocol(format!(
                "unsupported HTTP version {other:?}"
            )))
        }
    };

    let status = StatusCode::from_u16(parts[1].parse::<u16>().into_transport_failure()?).into_transport_failure()?;
    Ok((version, status))
}

// Reads the response headers up to and including the blank line
pub async fn read_response_headers<S>(reader: &mut BufReader<S>) -> Result<HeaderMap, TransportFailure>
where
    S: AsyncRead + Unpin,
{
    let mut headers = HeaderMap::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(TransportFailure::protocol("connection closed while reading headers"));
        }
        let trimmed = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if trimmed.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(TransportFailure::protocol(format!(
                "more than {MAX_HEADERS} response headers"
            )));
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            let name = HeaderName::from_str(key.trim()).into_transport_failure()?;
            let value = HeaderValue::from_str(value.trim()).into_transport_failure()?;
            headers.append(name, value);
        } else {
            log::warn!("Failed to parse header line: {trimmed}");
        }
    }

    Ok(headers)
}

/// Decides how the body following `headers` is delimited.
pub fn body_framing(status: StatusCode, headers: &HeaderMap) -> Result<Framing, TransportFailure> {
    if status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return Ok(Framing::Empty);
    }
    if let Some(transfer_encoding) = headers.get(TRANSFER_ENCODING) {
        let transfer_encoding = transfer_encoding.to_str().into_transport_failure()?;
        let chunked = transfer_encoding
            .rsplit(',')
            .next()
            .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"));
        return Ok(if chunked { Framing::Chunked } else { Framing::UntilClose });
    }
    if let Some(content_length) = headers.get(CONTENT_LENGTH) {
        let content_length = content_length
            .to_str()
            .into_transport_failure()?
            .trim()
            .parse::<usize>()
            .into_transport_failure()?;
        return Ok(Framing::Length(content_length));
    }
    Ok(Framing::UntilClose)
}

// Reads a chunked HTTP body, including any trailer section
pub async fn read_chunked_body<S>(reader: &mut BufReader<S>) -> Result<Vec<u8>, TransportFailure>
where
    S: AsyncRead + Unpin,
{
    let mut body = Vec::new();
    let mut chunk_size_line = String::new();

    loop {
        chunk_size_line.clear();
        if reader.read_line(&mut chunk_size_line).await? == 0 {
            return Err(TransportFailure::protocol("connection closed inside chunked body"));
        }
        // chunk extensions are ignored
        let size_field = chunk_size_line.split(';').next().unwrap_or_default().trim();
        let chunk_size = usize::from_str_radix(size_field, 16).into_transport_failure()?;

        if chunk_size == 0 {
            break;
        }

        let read = (&mut *reader).take(chunk_size as u64).read_to_end(&mut body).await?;
        if read != chunk_size {
            return Err(TransportFailure::protocol("connection closed inside chunk"));
        }

        let mut crlf = [0; 2];
        reader.read_exact(&mut crlf).await?;
        if &crlf != b"\r\n" {
            return Err(TransportFailure::protocol("invalid chunked encoding: missing CRLF"));
        }
    }

    loop {
        chunk_size_line.clear();
        let read = reader.read_line(&mut chunk_size_line).await?;
        if read == 0 || chunk_size_line.trim().is_empty() {
            break;
        }
        log::trace!("ignoring trailer {}", chunk_size_line.trim_end());
    }

    Ok(body)
}

// Reads the response body as delimited by `framing`
pub async fn read_response_body<S>(reader: &mut BufReader<S>, framing: Framing) -> Result<Vec<u8>, TransportFailure>
where
    S: AsyncRead + Unpin,
{
    match framing {
        Framing::Empty => Ok(Vec::new()),
        Framing::Length(content_length) => {
            let mut body = Vec::new();
            (&mut *reader)
                .take(content_length as u64)
                .read_to_end(&mut body)
                .await?;
            if body.len() != content_length {
                return Err(TransportFailure::protocol(format!(
                    "body ended after {} of {content_length} bytes",
                    body.len()
                )));
            }
            Ok(body)
        }
        Framing::Chunked => read_chunked_body(reader).await,
        Framing::UntilClose => {
            let mut body = Vec::new();
            reader.read_to_end(&mut body).await?;
            Ok(body)
        }
    }
}

/// Whether the server allows another request on this connection.
pub fn keeps_alive(version: Version, headers: &HeaderMap) -> bool {
    let mut close = false;
    let mut keep_alive = false;
    for token in headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
    {
        let token = token.trim();
        close |= token.eq_ignore_ascii_case("close");
        keep_alive |= token.eq_ignore_ascii_case("keep-alive");
    }
    match version {
        Version::HTTP_10 => keep_alive && !close,
        _ => !close,
    }
}

#[cfg(test)]
mod tests {
    use futures_lite::future;
    use futures_lite::io::Cursor;

    use super::*;
    use crate::transport::FailureReason;

    fn reader(bytes: &[u8]) -> BufReader<Cursor<Vec<u8>>> {
        BufReader::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn parses_status_lines() {
        let (version, status) = parse_response_status_line("HTTP/1.1 404 Not Found\r\n").unwrap();
        assert_eq!(version, Version::HTTP_11);
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (version, status) = parse_response_status_line("HTTP/1.0 200\r\n").unwrap();
        assert_eq!(version, Version::HTTP_10);
        assert_eq!(status, StatusCode::OK);

        for bad in ["", "HTTP/1.1\r\n", "SPDY/3 200 OK", "HTTP/1.1 abc OK", "HTTP/1.1 42 Odd"] {
            let failure = parse_response_status_line(bad).unwrap_err();
            assert_eq!(failure.reason(), FailureReason::ProtocolError, "{bad:?}");
        }
    }

    #[test]
    fn reads_repeated_headers_and_stops_at_blank_line() {
        let mut reader = reader(b"Set-Cookie: a=1\r\nset-cookie: b=2\r\nContent-Type:text/plain\r\n\r\nbody");
        let headers = future::block_on(read_response_headers(&mut reader)).unwrap();
        assert_eq!(headers.get_all("set-cookie").iter().count(), 2);
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");

        let rest = future::block_on(read_response_body(&mut reader, Framing::UntilClose)).unwrap();
        assert_eq!(rest, b"body");
    }

    #[test]
    fn headers_cut_short_are_a_protocol_error() {
        let mut reader = reader(b"Content-Type: text/plain\r\n");
        let failure = future::block_on(read_response_headers(&mut reader)).unwrap_err();
        assert_eq!(failure.reason(), FailureReason::ProtocolError);
    }

    #[test]
    fn reads_chunked_body_with_extensions_and_trailers() {
        let mut reader = reader(b"4;name=value\r\nWiki\r\n5\r\npedia\r\n0\r\nExpires: never\r\n\r\nNEXT");
        let body = future::block_on(read_chunked_body(&mut reader)).unwrap();
        assert_eq!(body, b"Wikipedia");
        assert_eq!(reader.buffer(), b"NEXT");
    }

    #[test]
    fn rejects_chunk_without_crlf() {
        let mut reader = reader(b"4\r\nWikiXX0\r\n\r\n");
        assert!(future::block_on(read_chunked_body(&mut reader)).is_err());
    }

    #[test]
    fn short_content_length_body_is_a_protocol_error() {
        let mut reader = reader(b"abc");
        let failure = future::block_on(read_response_body(&mut reader, Framing::Length(10))).unwrap_err();
        assert_eq!(failure.reason(), FailureReason::ProtocolError);
    }

    #[test]
    fn framing_follows_status_and_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(body_framing(StatusCode::NO_CONTENT, &headers).unwrap(), Framing::Empty);
        assert_eq!(body_framing(StatusCode::OK, &headers).unwrap(), Framing::UntilClose);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert_eq!(body_framing(StatusCode::OK, &headers).unwrap(), Framing::Length(12));
        assert_eq!(body_framing(StatusCode::NOT_MODIFIED, &headers).unwrap(), Framing::Empty);

        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip, Chunked"));
        assert_eq!(body_framing(StatusCode::OK, &headers).unwrap(), Framing::Chunked);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("twelve"));
        headers.remove(TRANSFER_ENCODING);
        assert!(body_framing(StatusCode::OK, &headers).is_err());
    }

    #[test]
    fn keep_alive_defaults_by_version() {
        let mut headers = HeaderMap::new();
        assert!(keeps_alive(Version::HTTP_11, &headers));
        assert!(!keeps_alive(Version::HTTP_10, &headers));

        headers.insert(CONNECTION, HeaderValue::from_static("Keep-Alive"));
        assert!(keeps_alive(Version::HTTP_10, &headers));

        headers.insert(CONNECTION, HeaderValue::from_static("upgrade, close"));
        assert!(!keeps_alive(Version::HTTP_11, &headers));
    }
}
