//! Raw response parsing
//!
//! The transport is run with header-echo enabled, so its raw output is one or
//! more HTTP header blocks followed by the body. When it follows redirects
//! transparently (or relays a `100 Continue`), every intermediate hop's block
//! is echoed ahead of the final one. The parser here separates all of that
//! back out: the last block supplies the status line and header map, the
//! concatenation of every block is stripped to isolate the body.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::transport::TransportInfo;

/// A parsed HTTP response: header map plus isolated body bytes.
///
/// The header map carries the synthetic `Http-Version`, `Status-Code` and
/// `Status` entries alongside one entry per response header line, and a
/// `Redirect_URL` entry when the status is 302. Header names are stored
/// exactly as received.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) body: Vec<u8>,
    pub(crate) info: TransportInfo,
}

impl Response {
    /// Split raw transport output into a structured response.
    ///
    /// Never fails: input that cannot be fully understood degrades to partial
    /// structured data. An empty input yields an empty header map and an
    /// empty body; an input with no recognizable header block becomes the
    /// body wholesale.
    pub fn parse(raw: impl AsRef<[u8]>, info: TransportInfo) -> Response {
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Response {
                info,
                ..Response::default()
            };
        }

        let blocks = find_header_blocks(raw);
        let body = strip_blocks(raw, &blocks);
        let mut headers = BTreeMap::new();

        // The last block is authoritative: with transparent redirects the
        // earlier blocks belong to intermediate hops.
        if let Some(last) = blocks.last() {
            let block = String::from_utf8_lossy(&raw[last.clone()]);
            let block = block.strip_suffix("\r\n\r\n").unwrap_or(&block);
            let mut lines = block.split("\r\n");

            if let Some(status) = lines.next().and_then(parse_status_line) {
                headers.insert("Http-Version".to_string(), status.version);
                headers.insert("Status-Code".to_string(), status.code);
                headers.insert("Status".to_string(), status.status);
            }
            for line in lines {
                if let Some((name, value)) = split_header_line(line) {
                    headers.insert(name.to_string(), value.to_string());
                }
            }
        }

        if headers.get("Status-Code").map(String::as_str) == Some("302") {
            if let Some(url) = &info.effective_url {
                headers.insert("Redirect_URL".to_string(), url.clone());
            }
        }

        Response {
            headers,
            body,
            info,
        }
    }

    /// All parsed headers, including the synthetic `Http-Version`,
    /// `Status-Code`, `Status` and (for 302) `Redirect_URL` entries.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Look up a single header value by its exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The response body with every header block removed.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the response, returning the body bytes.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// The body as text, converted lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parsed status code, when the status line was understood.
    pub fn status_code(&self) -> Option<u16> {
        self.header("Status-Code").and_then(|code| code.parse().ok())
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code(), Some(200..=299))
    }

    /// Whether the status is in the 4xx range.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status_code(), Some(400..=499))
    }

    /// Whether the status is in the 5xx range.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status_code(), Some(500..=599))
    }

    /// Diagnostic metadata captured from the transport for this request.
    pub fn info(&self) -> &TransportInfo {
        &self.info
    }

    pub(crate) fn clear_body(&mut self) {
        self.body.clear();
    }
}

/// Displays exactly the body, never the headers.
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.body))
    }
}

struct StatusLine {
    version: String,
    code: String,
    status: String,
}

/// Locate every header block, front to back, non-overlapping.
///
/// A block starts at the beginning of input or just after a newline with
/// `HTTP/<digit>.<digit>` (`HTTP` matched case-insensitively) and runs
/// through the first blank line. A started block with no blank-line
/// terminator is not a block.
fn find_header_blocks(raw: &[u8]) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some(start) = next_block_start(raw, pos) {
        match find(&raw[start..], b"\r\n\r\n") {
            Some(offset) => {
                let end = start + offset + 4;
                blocks.push(start..end);
                pos = end;
            }
            // Nothing after this point can terminate either.
            None => break,
        }
    }
    blocks
}

fn next_block_start(raw: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    while pos + 8 <= raw.len() {
        if (pos == 0 || raw[pos - 1] == b'\n') && is_block_marker(&raw[pos..]) {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

fn is_block_marker(bytes: &[u8]) -> bool {
    bytes.len() >= 8
        && bytes[..5].eq_ignore_ascii_case(b"HTTP/")
        && bytes[5].is_ascii_digit()
        && bytes[6] == b'.'
        && bytes[7].is_ascii_digit()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Remove the concatenation of every header block from the raw bytes.
///
/// All the hops' blocks sit in front of the final body, so the whole run
/// goes at once. If the blocks are somehow not adjacent the concatenation is
/// absent and the input passes through untouched — known leniency.
fn strip_blocks(raw: &[u8], blocks: &[Range<usize>]) -> Vec<u8> {
    if blocks.is_empty() {
        return raw.to_vec();
    }
    let concat: Vec<u8> = blocks
        .iter()
        .flat_map(|block| raw[block.clone()].iter().copied())
        .collect();

    let mut body = Vec::with_capacity(raw.len());
    let mut pos = 0;
    while pos < raw.len() {
        if raw[pos..].starts_with(&concat) {
            pos += concat.len();
        } else {
            body.push(raw[pos]);
            pos += 1;
        }
    }
    body
}

/// Parse `HTTP/<d.d> <code> <text>` with an explicit bounded scan.
///
/// The text runs to the end of the line unless a literal `HTTP` token is
/// embedded in it (a concatenation artifact), in which case it stops right
/// before the token. Anything that does not match yields `None` and the
/// caller leaves the status entries out entirely.
fn parse_status_line(line: &str) -> Option<StatusLine> {
    let rest = line.strip_prefix("HTTP/")?;
    let bytes = rest.as_bytes();
    if bytes.len() < 4
        || !bytes[0].is_ascii_digit()
        || bytes[1] != b'.'
        || !bytes[2].is_ascii_digit()
        || !bytes[3].is_ascii_whitespace()
    {
        return None;
    }
    let version = &rest[..3];

    let status = &rest[4..];
    let bytes = status.as_bytes();
    if bytes.len() < 4
        || !bytes[..3].iter().all(u8::is_ascii_digit)
        || !bytes[3].is_ascii_whitespace()
    {
        return None;
    }
    let code = &status[..3];

    let status = match status[4..].find("HTTP") {
        Some(offset) => &status[..4 + offset],
        None => status,
    };

    Some(StatusLine {
        version: version.to_string(),
        code: code.to_string(),
        status: status.to_string(),
    })
}

/// Split one `Name: value` line at the first colon followed by whitespace.
///
/// Lines that never match are dropped by the caller — known leniency.
fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    let mut pos = 0;
    while pos + 1 < bytes.len() {
        if bytes[pos] == b':' && bytes[pos + 1].is_ascii_whitespace() {
            return Some((&line[..pos], &line[pos + 2..]));
        }
        pos += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Response {
        Response::parse(raw, TransportInfo::default())
    }

    #[test]
    fn single_block_isolates_body_and_status_fields() {
        let response = parse("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html>ok</html>");
        assert_eq!(response.header("Status-Code"), Some("200"));
        assert_eq!(response.header("Status"), Some("200 OK"));
        assert_eq!(response.header("Http-Version"), Some("1.1"));
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert_eq!(response.headers().len(), 4);
        assert_eq!(response.body(), b"<html>ok</html>");
    }

    #[test]
    fn multiple_blocks_use_last_for_status_and_strip_all() {
        let raw = concat!(
            "HTTP/1.1 301 Moved Permanently\r\nLocation: /interim\r\n\r\n",
            "HTTP/1.1 302 Found\r\nLocation: /final\r\n\r\n",
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n",
            "{example: 1}"
        );
        let response = parse(raw);
        assert_eq!(response.header("Status-Code"), Some("200"));
        assert_eq!(response.header("Status"), Some("200 OK"));
        // Intermediate hop headers do not leak into the map.
        assert_eq!(response.header("Location"), None);
        assert_eq!(response.body(), b"{example: 1}");
    }

    #[test]
    fn empty_input_yields_empty_response() {
        let response = parse("");
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
        assert_eq!(response.status_code(), None);
    }

    #[test]
    fn display_yields_exactly_the_body() {
        let response = parse("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html>ok</html>");
        assert_eq!(format!("{}", response), "<html>ok</html>");
        assert_eq!(response.text(), "<html>ok</html>");
    }

    #[test]
    fn malformed_header_lines_are_silently_skipped() {
        let raw = "HTTP/1.1 200 OK\r\nGood: yes\r\nnot a header\r\nAlso-Good: sure\r\n\r\nbody";
        let response = parse(raw);
        assert_eq!(response.header("Good"), Some("yes"));
        assert_eq!(response.header("Also-Good"), Some("sure"));
        // Http-Version, Status-Code, Status plus the two well-formed lines.
        assert_eq!(response.headers().len(), 5);
        assert_eq!(response.body(), b"body");
    }

    #[test]
    fn status_text_stops_at_embedded_http_token() {
        let response = parse("HTTP/1.1 200 OK HTTPartifact\r\n\r\nbody");
        assert_eq!(response.header("Status"), Some("200 OK "));
        assert_eq!(response.header("Status-Code"), Some("200"));
    }

    #[test]
    fn status_line_without_text_contributes_no_status_entries() {
        let response = parse("HTTP/1.1 204\r\nX-Empty: 1\r\n\r\n");
        assert_eq!(response.header("Status-Code"), None);
        assert_eq!(response.header("Status"), None);
        assert_eq!(response.header("X-Empty"), Some("1"));
    }

    #[test]
    fn missing_terminator_means_no_block() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nno blank line follows";
        let response = parse(raw);
        assert!(response.headers().is_empty());
        assert_eq!(response.body(), raw.as_bytes());
    }

    #[test]
    fn lowercase_marker_is_stripped_but_status_parse_is_case_sensitive() {
        let response = parse("http/1.1 200 OK\r\nX-One: 1\r\n\r\nbody");
        assert_eq!(response.header("Status-Code"), None);
        assert_eq!(response.header("X-One"), Some("1"));
        assert_eq!(response.body(), b"body");
    }

    #[test]
    fn marker_mid_line_does_not_start_a_block() {
        let response = parse("HTTP/1.1 200 OK\r\n\r\nsay HTTP/1.1 to me");
        assert_eq!(response.header("Status-Code"), Some("200"));
        assert_eq!(response.body(), b"say HTTP/1.1 to me");
    }

    #[test]
    fn blocks_separated_by_body_text_degrade_gracefully() {
        // A block-shaped run inside the body, at a line start, is picked up
        // by the scan; the blocks are then not adjacent, so nothing is
        // stripped and the last block still drives the status fields.
        let raw = "HTTP/1.1 200 OK\r\n\r\nintro\r\nHTTP/1.1 500 Oops\r\nX-Fake: 1\r\n\r\ntail";
        let response = parse(raw);
        assert_eq!(response.header("Status-Code"), Some("500"));
        assert_eq!(response.body(), raw.as_bytes());
    }

    #[test]
    fn header_value_keeps_everything_after_the_first_split_point() {
        let raw = "HTTP/1.1 200 OK\r\nServer: nginx: custom build\r\nX-Odd:value: real\r\n\r\n";
        let response = parse(raw);
        assert_eq!(response.header("Server"), Some("nginx: custom build"));
        assert_eq!(response.header("X-Odd:value"), Some("real"));
    }

    #[test]
    fn redirect_url_comes_from_effective_url_metadata_only_for_302() {
        let info = TransportInfo {
            effective_url: Some("http://example.com/next".to_string()),
            ..TransportInfo::default()
        };
        let moved = Response::parse("HTTP/1.1 302 Found\r\n\r\n", info.clone());
        assert_eq!(
            moved.header("Redirect_URL"),
            Some("http://example.com/next")
        );

        let ok = Response::parse("HTTP/1.1 200 OK\r\n\r\n", info);
        assert_eq!(ok.header("Redirect_URL"), None);
    }

    #[test]
    fn status_code_and_range_predicates() {
        let ok = parse("HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(ok.status_code(), Some(200));
        assert!(ok.is_success());
        assert!(!ok.is_client_error());
        assert!(!ok.is_server_error());

        let missing = parse("HTTP/1.1 404 Not Found\r\n\r\ngone");
        assert_eq!(missing.status_code(), Some(404));
        assert!(missing.is_client_error());

        let broken = parse("HTTP/1.1 503 Service Unavailable\r\n\r\n");
        assert!(broken.is_server_error());
    }

    #[test]
    fn into_body_returns_the_isolated_bytes() {
        let response = parse("HTTP/1.1 200 OK\r\n\r\npayload");
        assert_eq!(response.into_body(), b"payload");
    }
}
