use std::collections::BTreeMap;

use smol_str::SmolStr;

/// Parsed representation of a Via header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaHeader {
    pub transport: SmolStr,
    pub host: SmolStr,
    pub port: Option<u16>,
    pub params: BTreeMap<SmolStr, Option<SmolStr>>,
}

impl ViaHeader {
    /// Parses a Via header value, e.g.
    /// `SIP/2.0/UDP 10.0.0.5:49152;branch=z9hG4bKabc;rport`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (protocol, rest) = value.split_once(char::is_whitespace)?;

        let mut proto_parts = protocol.split('/');
        let name = proto_parts.next()?;
        let version = proto_parts.next()?;
        let transport = proto_parts.next()?;
        if !name.eq_ignore_ascii_case("SIP") || version != "2.0" {
            return None;
        }

        let mut segments = rest.trim().split(';');
        let sent_by = segments.next()?.trim();
        if sent_by.is_empty() {
            return None;
        }

        let (host, port) = match sent_by.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) && !port.is_empty() => {
                (host, Some(port.parse().ok()?))
            }
            _ => (sent_by, None),
        };

        let mut params = BTreeMap::new();
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            if let Some((k, v)) = segment.split_once('=') {
                params.insert(
                    SmolStr::new(k.trim().to_ascii_lowercase()),
                    Some(SmolStr::new(v.trim().to_owned())),
                );
            } else {
                params.insert(SmolStr::new(segment.to_ascii_lowercase()), None);
            }
        }

        Some(Self {
            transport: SmolStr::new(transport.to_ascii_uppercase()),
            host: SmolStr::new(host.to_owned()),
            port,
            params,
        })
    }

    /// Looks up the provided parameter ignoring ASCII case.
    pub fn param(&self, name: &str) -> Option<&Option<SmolStr>> {
        self.params.get(&SmolStr::new(name.to_ascii_lowercase()))
    }

    /// Returns true when the sent-by host and port exactly match.
    ///
    /// An absent port on either side only matches an absent port on the
    /// other; 5060 is deliberately not treated as an implicit default here,
    /// since the guard wants byte-for-byte agreement with what this agent
    /// advertised.
    pub fn sent_by_matches(&self, host: &str, port: Option<u16>) -> bool {
        self.host.eq_ignore_ascii_case(host) && self.port == port
    }
}
