use url::Url;

use crate::request::RequestSpec;

// Serializes the request line and headers; the body follows separately
pub fn serialize_request_head(request: &RequestSpec, url: &Url, body_len: usize, user_agent: &str) -> String {
    let path = url.path();
    let path = if path.is_empty() { "/" } else { path };
    let mut head = match url.query() {
        Some(query) => format!("{} {path}?{query} HTTP/1.1\r\n", request.method()),
        None => format!("{} {path} HTTP/1.1\r\n", request.method()),
    };

    let headers = request.headers();
    if !headers.contains("host") {
        head.push_str(&format!("Host: {}\r\n", host_header(url)));
    }
    if !headers.contains("user-agent") && !user_agent.is_empty() {
        head.push_str(&format!("User-Agent: {user_agent}\r\n"));
    }

    for (name, value) in headers.iter() {
        // framing is derived from the actual body
        if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("transfer-encoding") {
            continue;
        }
        head.push_str(&format!("{name}: {value}\r\n"));
    }

    if body_len > 0 || request.method().expects_body() {
        head.push_str(&format!("Content-Length: {body_len}\r\n"));
    }

    head.push_str("\r\n");
    head
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    }
}
