// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Protocol sanity screening for inbound datagrams.
//!
//! The dialog engine above this transport assumes its input has already
//! been screened: its original transport rejected malformed and hostile
//! messages before dispatch, so running it over raw UDP means re-imposing
//! exactly those checks at this boundary. UDP adds one hazard of its own:
//! broadcast or loopback delivery can hand us a datagram we sent
//! ourselves, which is answered with a stateless 482 rather than looped
//! into the engine.

use std::sync::Arc;

use bytes::Bytes;
use sky_core::{Headers, Response, SipMessage, StatusLine, ViaHeader};
use sky_observe::TransportTrace;
use sky_parse::{declared_content_length, parse_message};
use smol_str::SmolStr;

/// Headers every forwardable message must carry.
const MANDATORY_HEADERS: [&str; 5] = ["From", "To", "Call-ID", "CSeq", "Via"];

/// Verdict for one screened datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screened {
    /// Forward to the engine's inbound-request path.
    Request(sky_core::Request),
    /// Forward to the engine's inbound-response path.
    Response(sky_core::Response),
    /// Emit this stateless reply and stop.
    Reply(Response),
    /// Drop the datagram; the agent keeps running.
    Drop,
}

/// Screens every inbound message before it may reach the dialog engine.
///
/// Holds only immutable identity captured at agent construction: the
/// advertised Via endpoint and the session-ID prefix used for local-echo
/// detection (compared by value, never by identity).
pub struct SanityGuard {
    via_host: SmolStr,
    via_port: u16,
    session_prefix: SmolStr,
    trace: Arc<dyn TransportTrace>,
}

impl SanityGuard {
    pub fn new(
        via_host: SmolStr,
        via_port: u16,
        session_prefix: SmolStr,
        trace: Arc<dyn TransportTrace>,
    ) -> Self {
        Self {
            via_host,
            via_port,
            session_prefix,
            trace,
        }
    }

    /// Applies the full screen to one datagram, synchronously.
    pub fn screen(&self, datagram: &Bytes) -> Screened {
        let Some(message) = parse_message(datagram) else {
            tracing::warn!(len = datagram.len(), "dropping unparsable datagram");
            self.trace.on_dropped("screen", "unparsable");
            return Screened::Drop;
        };

        for name in MANDATORY_HEADERS {
            if message.headers().get(name).is_none() {
                tracing::warn!(header = name, "dropping message missing mandatory header");
                self.trace.on_dropped("screen", "missing-header");
                return Screened::Drop;
            }
        }

        match message {
            SipMessage::Request(request) => self.screen_request(request),
            SipMessage::Response(response) => self.screen_response(response),
        }
    }

    fn screen_request(&self, request: sky_core::Request) -> Screened {
        // Local echo: our own request came back to us. Recognized by our
        // session-ID prefix on the Call-ID of a request that has not been
        // answered yet (no To-tag). Both headers passed the mandatory check.
        let (Some(call_id), Some(to)) = (
            request.headers.get("Call-ID"),
            request.headers.get("To"),
        ) else {
            return Screened::Drop;
        };
        if to_tag(to).is_none() && call_id.starts_with(self.session_prefix.as_str()) {
            self.trace.on_dropped("screen", "local-echo");
            return Screened::Reply(stateless_reply(&request.headers, 482, "Loop Detected"));
        }

        if let Some(declared) = declared_content_length(&request.headers) {
            if declared > request.body.len() {
                self.trace.on_dropped("screen", "truncated-body");
                return Screened::Reply(stateless_reply(&request.headers, 400, "Bad Request"));
            }
        }

        Screened::Request(request)
    }

    fn screen_response(&self, response: sky_core::Response) -> Screened {
        if response.headers.count("Via") > 1 {
            tracing::warn!("dropping response with multiple Via headers");
            self.trace.on_dropped("screen", "ambiguous-via");
            return Screened::Drop;
        }

        let Some(via_value) = response.headers.get("Via") else {
            return Screened::Drop;
        };
        let Some(via) = ViaHeader::parse(via_value) else {
            self.trace.on_dropped("screen", "malformed-via");
            return Screened::Drop;
        };
        if !via.sent_by_matches(&self.via_host, Some(self.via_port)) {
            tracing::warn!(
                via = %via_value,
                expected_host = %self.via_host,
                expected_port = self.via_port,
                "dropping response with foreign Via"
            );
            self.trace.on_dropped("screen", "via-mismatch");
            return Screened::Drop;
        }

        if let Some(declared) = declared_content_length(&response.headers) {
            if declared > response.body.len() {
                self.trace.on_dropped("screen", "truncated-body");
                return Screened::Drop;
            }
        }

        Screened::Response(response)
    }
}

/// Builds a stateless reply echoing the request's routing headers.
fn stateless_reply(request_headers: &Headers, code: u16, reason: &str) -> Response {
    let mut headers = Headers::new();
    for name in ["Via", "From", "To", "Call-ID", "CSeq"] {
        for value in request_headers.get_all(name) {
            headers.push(name, value.clone());
        }
    }
    Response::new(StatusLine::new(code, reason), headers, Bytes::new())
}

/// Extracts the `tag` parameter from a To/From header value.
fn to_tag(value: &str) -> Option<&str> {
    value.split(';').skip(1).find_map(|param| {
        let (name, tag) = param.trim().split_once('=')?;
        name.eq_ignore_ascii_case("tag").then_some(tag.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION_PREFIX: &str = "skyg4f7x";

    fn guard() -> SanityGuard {
        SanityGuard::new(
            SmolStr::new("10.0.0.5"),
            49152,
            SmolStr::new(SESSION_PREFIX),
            sky_observe::noop_sink(),
        )
    }

    fn request(call_id: &str, to: &str, extra: &str) -> Bytes {
        Bytes::from(format!(
            "NOTIFY sip:guest@gateway.lan SIP/2.0\r\n\
Via: SIP/2.0/UDP gateway.lan:5060;branch=z9hG4bK776\r\n\
From: <sip:gateway.lan>;tag=srv\r\n\
To: {to}\r\n\
Call-ID: {call_id}\r\n\
CSeq: 2 NOTIFY\r\n\
{extra}Content-Length: 0\r\n\r\n"
        ))
    }

    fn response(vias: &[&str], content_length: usize, body: &str) -> Bytes {
        let mut raw = String::from("SIP/2.0 200 OK\r\n");
        for via in vias {
            raw.push_str(&format!("Via: {via}\r\n"));
        }
        raw.push_str(
            "From: <sip:guest@gateway.lan>;tag=1\r\n\
To: <sip:guest@gateway.lan>;tag=2\r\n\
Call-ID: abc\r\n\
CSeq: 1 REGISTER\r\n",
        );
        raw.push_str(&format!("Content-Length: {content_length}\r\n\r\n{body}"));
        Bytes::from(raw)
    }

    #[test]
    fn forwards_well_formed_request() {
        let verdict = guard().screen(&request("callid-1", "<sip:guest@gateway.lan>", ""));
        assert!(matches!(verdict, Screened::Request(_)));
    }

    #[test]
    fn drops_unparsable_datagram() {
        let verdict = guard().screen(&Bytes::from_static(b"\xff\xfe not sip"));
        assert_eq!(verdict, Screened::Drop);
    }

    #[test]
    fn drops_request_missing_via() {
        let raw = Bytes::from(
            "NOTIFY sip:guest@gateway.lan SIP/2.0\r\n\
From: <sip:gateway.lan>;tag=srv\r\n\
To: <sip:guest@gateway.lan>\r\n\
Call-ID: abc\r\n\
CSeq: 2 NOTIFY\r\n\
Content-Length: 0\r\n\r\n"
                .to_owned(),
        );
        assert_eq!(guard().screen(&raw), Screened::Drop);
    }

    #[test]
    fn drops_message_missing_each_mandatory_header() {
        let full = "Via: SIP/2.0/UDP gw:5060\r\n\
From: <sip:a>;tag=1\r\n\
To: <sip:b>\r\n\
Call-ID: abc\r\n\
CSeq: 1 NOTIFY\r\n";
        for skip in ["Via", "From", "To", "Call-ID", "CSeq"] {
            let headers: String = full
                .lines()
                .filter(|line| !line.starts_with(skip))
                .map(|line| format!("{line}\r\n"))
                .collect();
            let raw = Bytes::from(format!(
                "NOTIFY sip:guest@gateway.lan SIP/2.0\r\n{headers}Content-Length: 0\r\n\r\n"
            ));
            assert_eq!(guard().screen(&raw), Screened::Drop, "missing {skip}");
        }
    }

    #[test]
    fn replies_482_to_local_echo() {
        let call_id = format!("{SESSION_PREFIX}abcdef@10.0.0.5");
        let verdict = guard().screen(&request(&call_id, "<sip:guest@gateway.lan>", ""));
        match verdict {
            Screened::Reply(reply) => {
                assert_eq!(reply.start.code, 482);
                assert_eq!(reply.start.reason.as_str(), "Loop Detected");
                assert_eq!(
                    reply.headers.get("Call-ID").map(|v| v.as_str()),
                    Some(call_id.as_str())
                );
            }
            other => panic!("expected 482 reply, got {other:?}"),
        }
    }

    #[test]
    fn own_prefix_with_to_tag_is_not_an_echo() {
        // A To-tag means the remote answered; this is a legitimate in-dialog
        // request even though the Call-ID is ours.
        let call_id = format!("{SESSION_PREFIX}abcdef@10.0.0.5");
        let verdict = guard().screen(&request(&call_id, "<sip:guest@gateway.lan>;tag=x1", ""));
        assert!(matches!(verdict, Screened::Request(_)));
    }

    #[test]
    fn foreign_call_id_without_to_tag_is_forwarded() {
        let verdict = guard().screen(&request("srv-123@gateway.lan", "<sip:guest@gateway.lan>", ""));
        assert!(matches!(verdict, Screened::Request(_)));
    }

    #[test]
    fn replies_400_to_overlong_content_length() {
        let raw = Bytes::from(
            "NOTIFY sip:guest@gateway.lan SIP/2.0\r\n\
Via: SIP/2.0/UDP gateway.lan:5060;branch=z9hG4bK776\r\n\
From: <sip:gateway.lan>;tag=srv\r\n\
To: <sip:guest@gateway.lan>\r\n\
Call-ID: srv-1\r\n\
CSeq: 2 NOTIFY\r\n\
Content-Length: 99\r\n\r\nshort"
                .to_owned(),
        );
        match guard().screen(&raw) {
            Screened::Reply(reply) => {
                assert_eq!(reply.start.code, 400);
                assert_eq!(reply.start.reason.as_str(), "Bad Request");
            }
            other => panic!("expected 400 reply, got {other:?}"),
        }
    }

    #[test]
    fn forwards_response_with_matching_via() {
        let verdict = guard().screen(&response(
            &["SIP/2.0/UDP 10.0.0.5:49152;branch=z9hG4bK1"],
            0,
            "",
        ));
        assert!(matches!(verdict, Screened::Response(_)));
    }

    #[test]
    fn drops_response_with_two_vias() {
        // Both Vias are individually well-formed; ambiguity alone kills it.
        let verdict = guard().screen(&response(
            &[
                "SIP/2.0/UDP 10.0.0.5:49152;branch=z9hG4bK1",
                "SIP/2.0/UDP 10.0.0.5:49152;branch=z9hG4bK2",
            ],
            0,
            "",
        ));
        assert_eq!(verdict, Screened::Drop);
    }

    #[test]
    fn drops_response_with_foreign_via() {
        let verdict = guard().screen(&response(
            &["SIP/2.0/UDP 203.0.113.9:5060;branch=z9hG4bK1"],
            0,
            "",
        ));
        assert_eq!(verdict, Screened::Drop);

        // Same host, wrong port.
        let verdict = guard().screen(&response(
            &["SIP/2.0/UDP 10.0.0.5:5060;branch=z9hG4bK1"],
            0,
            "",
        ));
        assert_eq!(verdict, Screened::Drop);
    }

    #[test]
    fn drops_response_with_truncated_body() {
        let verdict = guard().screen(&response(
            &["SIP/2.0/UDP 10.0.0.5:49152;branch=z9hG4bK1"],
            64,
            "tiny",
        ));
        assert_eq!(verdict, Screened::Drop);
    }

    #[test]
    fn to_tag_extraction() {
        assert_eq!(to_tag("<sip:a@b>;tag=x7"), Some("x7"));
        assert_eq!(to_tag("<sip:a@b>; TAG=x7"), Some("x7"));
        assert_eq!(to_tag("<sip:a@b>"), None);
        assert_eq!(to_tag("<sip:a@b;tag-like=1>;other=2"), None);
    }
}
