// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytes::Bytes;
use smol_str::SmolStr;

use crate::{headers::Headers, method::Method, uri::SipUri, version::SipVersion};

/// First line of a SIP request: `Method SP Request-URI SP SIP-Version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub uri: SipUri,
    pub version: SipVersion,
}

impl RequestLine {
    /// Creates a request line for the given method and target URI.
    pub fn new(method: Method, uri: SipUri) -> Self {
        Self {
            method,
            uri,
            version: SipVersion::V2,
        }
    }
}

/// First line of a SIP response: `SIP-Version SP Status-Code SP Reason-Phrase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: SipVersion,
    pub code: u16,
    pub reason: SmolStr,
}

impl StatusLine {
    /// Creates a status line with the provided code and reason phrase.
    pub fn new(code: u16, reason: impl Into<SmolStr>) -> Self {
        Self {
            version: SipVersion::V2,
            code,
            reason: reason.into(),
        }
    }

    /// Returns true if this is a success response (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Returns true if this is an error response (4xx, 5xx, or 6xx).
    pub fn is_error(&self) -> bool {
        (400..700).contains(&self.code)
    }
}

/// In-memory representation of a SIP request message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub start: RequestLine,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    /// Builds a request from its components.
    pub fn new(start: RequestLine, headers: Headers, body: Bytes) -> Self {
        Self {
            start,
            headers,
            body,
        }
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.start.method
    }

    /// Returns true if the message has a body.
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}

/// In-memory representation of a SIP response message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub start: StatusLine,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    /// Builds a response from its components.
    pub fn new(start: StatusLine, headers: Headers, body: Bytes) -> Self {
        Self {
            start,
            headers,
            body,
        }
    }

    /// Returns the status code.
    pub fn code(&self) -> u16 {
        self.start.code
    }

    /// Returns true if this is a success response (2xx).
    pub fn is_success(&self) -> bool {
        self.start.is_success()
    }
}

/// Either a SIP request or response message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SipMessage {
    Request(Request),
    Response(Response),
}

impl SipMessage {
    /// Returns true if this is a request.
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Returns the headers regardless of message type.
    pub fn headers(&self) -> &Headers {
        match self {
            Self::Request(req) => &req.headers,
            Self::Response(res) => &res.headers,
        }
    }

    /// Returns the body regardless of message type.
    pub fn body(&self) -> &Bytes {
        match self {
            Self::Request(req) => &req.body,
            Self::Response(res) => &res.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_uri() -> SipUri {
        SipUri::parse("sip:guest@gateway.lan").expect("failed to parse URI")
    }

    #[test]
    fn create_request() {
        let request = Request::new(
            RequestLine::new(Method::Subscribe, mock_uri()),
            Headers::new(),
            Bytes::new(),
        );
        assert_eq!(request.method(), &Method::Subscribe);
        assert!(!request.has_body());
    }

    #[test]
    fn status_line_predicates() {
        assert!(StatusLine::new(200, "OK").is_success());
        assert!(!StatusLine::new(482, "Loop Detected").is_success());
        assert!(StatusLine::new(400, "Bad Request").is_error());
        assert!(!StatusLine::new(180, "Ringing").is_error());
    }

    #[test]
    fn sip_message_classification() {
        let req = Request::new(
            RequestLine::new(Method::Notify, mock_uri()),
            Headers::new(),
            Bytes::from_static(b"<battery/>"),
        );
        let msg = SipMessage::Request(req);
        assert!(msg.is_request());
        assert_eq!(msg.body().as_ref(), b"<battery/>");

        let res = Response::new(StatusLine::new(200, "OK"), Headers::new(), Bytes::new());
        let msg = SipMessage::Response(res);
        assert!(!msg.is_request());
    }
}
