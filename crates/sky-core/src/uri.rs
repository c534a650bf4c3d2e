// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;
use std::fmt;

use smol_str::SmolStr;

/// Parsed representation of a SIP URI (RFC 3261 §19).
///
/// The gateway only speaks plain `sip:`; `sips:` is accepted by the parser
/// so inbound traffic never fails classification on scheme alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SipUri {
    pub raw: SmolStr,
    pub sips: bool,
    pub user: Option<SmolStr>,
    pub host: SmolStr,
    pub port: Option<u16>,
    pub params: BTreeMap<SmolStr, Option<SmolStr>>,
}

impl SipUri {
    /// Attempts to parse a SIP or SIPS URI from the provided string.
    pub fn parse(input: &str) -> Option<Self> {
        let raw = SmolStr::new(input.to_owned());
        let (scheme, rest) = input.split_once(':')?;
        let sips = scheme.eq_ignore_ascii_case("sips");
        if !sips && !scheme.eq_ignore_ascii_case("sip") {
            return None;
        }

        // Header fields after '?' are not used by this agent; strip them.
        let addr_part = match rest.split_once('?') {
            Some((addr, _headers)) => addr,
            None => rest,
        };

        let mut params = BTreeMap::new();
        let mut addr_iter = addr_part.split(';');
        let base = addr_iter.next()?.trim();
        for param in addr_iter {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            if let Some((k, v)) = param.split_once('=') {
                params.insert(
                    SmolStr::new(k.trim().to_owned()),
                    Some(SmolStr::new(v.trim().to_owned())),
                );
            } else {
                params.insert(SmolStr::new(param.to_owned()), None);
            }
        }

        let (user, host_port) = match base.split_once('@') {
            Some((user, host)) => (Some(SmolStr::new(user.trim().to_owned())), host.trim()),
            None => (None, base.trim()),
        };

        if host_port.is_empty() {
            return None;
        }

        let (host, port) = split_host_port(host_port)?;

        Some(Self {
            raw,
            sips,
            user,
            host: SmolStr::new(host.to_ascii_lowercase()),
            port,
            params,
        })
    }

    /// Builds a `sip:user@host` URI for the given account on the given host.
    pub fn for_account(user: &str, host: &str) -> Option<Self> {
        Self::parse(&format!("sip:{}@{}", user, host))
    }

    /// Returns the original textual representation of the URI.
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Looks up a URI parameter ignoring ASCII case.
    pub fn param(&self, name: &str) -> Option<&Option<SmolStr>> {
        self.params.get(&SmolStr::new(name.to_ascii_lowercase()))
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a host[:port] or IPv6 literal "[host]:port" string.
fn split_host_port(input: &str) -> Option<(&str, Option<u16>)> {
    if input.starts_with('[') {
        let end = input.find(']')?;
        let host = &input[1..end];
        let remainder = &input[end + 1..];
        if let Some(stripped) = remainder.strip_prefix(':') {
            let port = stripped.parse().ok()?;
            Some((host, Some(port)))
        } else {
            Some((host, None))
        }
    } else if let Some(idx) = input.rfind(':') {
        if input.matches(':').count() > 1 {
            return None;
        }
        let (host, port_str) = input.split_at(idx);
        if port_str.len() > 1 && port_str[1..].chars().all(|c| c.is_ascii_digit()) {
            let port = port_str[1..].parse().ok()?;
            Some((host, Some(port)))
        } else {
            Some((input, None))
        }
    } else {
        Some((input, None))
    }
}
