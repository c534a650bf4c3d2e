// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wire-format parsing and serialization for SIP messages.
//!
//! The parser is deliberately lenient about bodies: the raw bytes after the
//! header separator are kept untouched, even when they disagree with the
//! declared `Content-Length`. The transport's sanity guard owns that
//! comparison, because a truncated datagram is answered differently for
//! requests (400) and responses (drop).

use bytes::{Bytes, BytesMut};
use sky_core::{
    Headers, Method, Request, RequestLine, Response, SipMessage, SipUri, SipVersion, StatusLine,
};
use smol_str::SmolStr;

/// Largest datagram the parser will look at; SIP-over-UDP messages from the
/// gateway fit a single datagram well under this.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Parses a raw datagram into a request or response.
///
/// Responses are recognized by their `SIP/2.0` status-line prefix; anything
/// else is parsed as a request. Returns [`None`] for messages that fail the
/// structural minimum (start line + well-formed headers).
pub fn parse_message(datagram: &Bytes) -> Option<SipMessage> {
    let first = datagram
        .as_ref()
        .split(|b| *b == b'\r' || *b == b'\n')
        .next()?;
    if first.starts_with(b"SIP/2.0 ") {
        parse_response(datagram).map(SipMessage::Response)
    } else {
        parse_request(datagram).map(SipMessage::Request)
    }
}

/// Parses a SIP request from raw network bytes.
pub fn parse_request(datagram: &Bytes) -> Option<Request> {
    if datagram.len() > DEFAULT_MAX_MESSAGE_SIZE {
        return None;
    }
    let (head, body) = split_head_body(datagram)?;
    let mut lines = head.split("\r\n");
    let first = lines.next()?.trim();
    if first.is_empty() {
        return None;
    }

    let (method, uri) = parse_request_line(first)?;
    let headers = parse_headers(lines)?;

    Some(Request::new(
        RequestLine {
            method,
            uri,
            version: SipVersion::V2,
        },
        headers,
        body,
    ))
}

/// Parses a SIP response from raw network bytes.
pub fn parse_response(datagram: &Bytes) -> Option<Response> {
    if datagram.len() > DEFAULT_MAX_MESSAGE_SIZE {
        return None;
    }
    let (head, body) = split_head_body(datagram)?;
    let mut lines = head.split("\r\n");
    let first = lines.next()?.trim();
    if first.is_empty() {
        return None;
    }

    let status = parse_status_line(first)?;
    let headers = parse_headers(lines)?;

    Some(Response::new(status, headers, body))
}

/// Serializes a SIP request while normalising the `Content-Length` header.
pub fn serialize_request(req: &Request) -> Bytes {
    let mut buf = String::new();
    use std::fmt::Write;

    let _ = write!(
        buf,
        "{} {} {}\r\n",
        req.start.method.as_str(),
        req.start.uri.as_str(),
        req.start.version.as_str()
    );

    let mut has_max_forwards = false;
    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        if header.name.eq_ignore_ascii_case("Max-Forwards") {
            has_max_forwards = true;
        }
        let _ = write!(buf, "{}: {}\r\n", header.name, header.value.trim());
    }

    if !has_max_forwards {
        let _ = write!(buf, "Max-Forwards: 70\r\n");
    }

    let _ = write!(buf, "Content-Length: {}\r\n", req.body.len());
    buf.push_str("\r\n");

    let mut out = BytesMut::with_capacity(buf.len() + req.body.len());
    out.extend_from_slice(buf.as_bytes());
    out.extend_from_slice(req.body.as_ref());
    out.freeze()
}

/// Serializes a SIP response while normalising the `Content-Length` header.
pub fn serialize_response(res: &Response) -> Bytes {
    let mut buf = String::new();
    use std::fmt::Write;

    let _ = write!(
        buf,
        "{} {} {}\r\n",
        res.start.version.as_str(),
        res.start.code,
        res.start.reason
    );

    for header in res.headers.iter() {
        if header.name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        let _ = write!(buf, "{}: {}\r\n", header.name, header.value);
    }

    let _ = write!(buf, "Content-Length: {}\r\n", res.body.len());
    buf.push_str("\r\n");

    let mut out = BytesMut::with_capacity(buf.len() + res.body.len());
    out.extend_from_slice(buf.as_bytes());
    out.extend_from_slice(res.body.as_ref());
    out.freeze()
}

/// Returns the first header value matching `name` (case insensitive).
pub fn header<'a>(headers: &'a Headers, name: &str) -> Option<&'a SmolStr> {
    headers.get(name)
}

/// Reads the declared `Content-Length`, ignoring unparsable values.
pub fn declared_content_length(headers: &Headers) -> Option<usize> {
    headers
        .get("Content-Length")
        .and_then(|value| value.trim().parse::<usize>().ok())
}

/// Parses the request-line into a method and request URI.
fn parse_request_line(line: &str) -> Option<(Method, SipUri)> {
    use nom::{
        bytes::complete::take_while1, character::complete::space1, combinator::rest,
        sequence::tuple,
    };

    let mut parser = tuple((
        take_while1::<_, _, nom::error::Error<_>>(is_token_char),
        space1::<_, nom::error::Error<_>>,
        take_while1::<_, _, nom::error::Error<_>>(is_uri_char),
        space1::<_, nom::error::Error<_>>,
        rest::<_, nom::error::Error<_>>,
    ));
    let (_, (method_token, _, uri_token, _, version_token)) = parser(line.trim()).ok()?;

    if !version_token.eq_ignore_ascii_case("SIP/2.0") {
        return None;
    }
    let method = Method::from_token(method_token);
    let uri = SipUri::parse(uri_token)?;
    Some((method, uri))
}

/// Parses the status-line of a SIP response.
fn parse_status_line(line: &str) -> Option<StatusLine> {
    use nom::{
        bytes::complete::tag_no_case,
        character::complete::{space1, u16 as nom_u16},
        combinator::rest,
        sequence::tuple,
    };

    let mut parser = tuple((
        tag_no_case::<_, _, nom::error::Error<_>>("SIP/2.0"),
        space1::<_, nom::error::Error<_>>,
        nom_u16::<_, nom::error::Error<_>>,
        space1::<_, nom::error::Error<_>>,
        rest::<_, nom::error::Error<_>>,
    ));
    let (_, (_, _, code, _, reason)) = parser(line.trim()).ok()?;

    Some(StatusLine {
        version: SipVersion::V2,
        code,
        reason: SmolStr::new(reason.trim().to_owned()),
    })
}

/// Splits raw bytes into header text and body bytes at the `\r\n\r\n`
/// separator. The body is returned verbatim.
fn split_head_body(datagram: &Bytes) -> Option<(&str, Bytes)> {
    let data = datagram.as_ref();
    let delim = b"\r\n\r\n";

    if let Some(pos) = data.windows(delim.len()).position(|window| window == delim) {
        let head = std::str::from_utf8(&data[..pos]).ok()?;
        let body = datagram.slice(pos + delim.len()..);
        Some((head, body))
    } else {
        let head = std::str::from_utf8(data).ok()?;
        Some((head, Bytes::new()))
    }
}

/// Parses SIP headers, handling folded continuation lines per RFC 3261 §7.3.1.
fn parse_headers<'a, I>(lines: I) -> Option<Headers>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut headers = Headers::new();
    let mut current_name: Option<SmolStr> = None;
    let mut current_value = String::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            let value = line.trim();
            if value.is_empty() {
                continue;
            }
            if current_name.is_none() {
                return None;
            }
            if !current_value.is_empty() {
                current_value.push(' ');
            }
            current_value.push_str(value);
            continue;
        }

        if let Some((name, value)) = line.split_once(':') {
            if let Some(prev_name) = current_name.take() {
                headers.push(prev_name, SmolStr::new(current_value.trim().to_owned()));
                current_value.clear();
            }
            current_name = Some(canonical_header_name(name.trim()));
            current_value = value.trim().to_owned();
        } else if current_name.is_some() {
            let value = line.trim();
            if !value.is_empty() {
                if !current_value.is_empty() {
                    current_value.push(' ');
                }
                current_value.push_str(value);
            }
        }
    }

    if let Some(name) = current_name.take() {
        headers.push(name, SmolStr::new(current_value.trim().to_owned()));
    }

    Some(headers)
}

/// Expands RFC 3261 compact header names to their canonical form.
fn canonical_header_name(name: &str) -> SmolStr {
    let lower = name.to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "i" => "Call-ID",
        "f" => "From",
        "t" => "To",
        "m" => "Contact",
        "l" => "Content-Length",
        "s" => "Subject",
        "k" => "Supported",
        "o" => "Event",
        "e" => "Content-Encoding",
        "c" => "Content-Type",
        "v" => "Via",
        _ => name,
    };
    SmolStr::new(canonical.to_owned())
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|'
                | '~'
        )
}

// Permissive URI character set: stop at whitespace.
fn is_uri_char(c: char) -> bool {
    !c.is_whitespace()
}
