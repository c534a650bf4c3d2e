// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use rand::Rng;
use smol_str::SmolStr;

use crate::uri::SipUri;

/// Alphabet for generated contact tokens: a case-insensitive base-32 set.
const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";
const TOKEN_LENGTH: usize = 8;

/// Well-known address used when rendering an anonymous contact without a
/// temporary GRUU (RFC 3323 convention).
const ANONYMOUS_HOST: &str = "anonymous@anonymous.invalid";

/// Rendering mode selected by the call site.
///
/// `Register` claims the genuine address and must never fall back to a
/// GRUU; `Default` prefers a publicly routable GRUU when the registrar has
/// assigned one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactMode {
    Default,
    Anonymous,
    Register,
}

/// Construction-time inputs for the contact synthesizer.
#[derive(Debug, Clone)]
pub struct ContactConfig {
    /// Display token; a random one is generated when empty.
    pub name: Option<SmolStr>,
    /// URI transport parameter, e.g. `udp`.
    pub transport_param: SmolStr,
    /// Advertised (via) host.
    pub host: SmolStr,
    /// Advertised (via) port.
    pub port: u16,
    /// Append the outbound-routing indicator (`;ob`) to rendered values.
    pub outbound: bool,
    /// Instance identifier advertised on every rendering when set
    /// (`+sip.instance` parameter, RFC 5626).
    pub instance_id: Option<SmolStr>,
}

/// Builds the outbound Contact header value identifying this agent.
///
/// Created once per agent; the token is stable for the agent's lifetime.
/// GRUUs are assigned later by the remote party and only affect the
/// `Default` and `Anonymous` renderings.
#[derive(Debug, Clone)]
pub struct Contact {
    token: SmolStr,
    transport_param: SmolStr,
    host: SmolStr,
    port: u16,
    outbound: bool,
    instance_id: Option<SmolStr>,
    pub_gruu: Option<SipUri>,
    temp_gruu: Option<SipUri>,
}

impl Contact {
    /// Creates the contact, generating a random token if none is configured.
    pub fn new(config: ContactConfig) -> Self {
        let token = match config.name {
            Some(name) if !name.is_empty() => name,
            _ => random_token(TOKEN_LENGTH),
        };
        Self {
            token,
            transport_param: config.transport_param,
            host: config.host,
            port: config.port,
            outbound: config.outbound,
            instance_id: config.instance_id,
            pub_gruu: None,
            temp_gruu: None,
        }
    }

    /// Returns the stable display token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Records the publicly routable GRUU assigned by the remote party.
    pub fn set_pub_gruu(&mut self, uri: SipUri) {
        self.pub_gruu = Some(uri);
    }

    /// Records the temporary anonymous GRUU assigned by the remote party.
    pub fn set_temp_gruu(&mut self, uri: SipUri) {
        self.temp_gruu = Some(uri);
    }

    /// Returns the concrete URI this agent is reachable at.
    pub fn concrete_uri(&self) -> String {
        format!(
            "sip:{}@{}:{};transport={}",
            self.token, self.host, self.port, self.transport_param
        )
    }

    /// Renders the Contact header value for the given mode.
    pub fn render(&self, mode: ContactMode) -> String {
        let uri = match mode {
            ContactMode::Anonymous => match &self.temp_gruu {
                Some(gruu) => gruu.as_str().to_owned(),
                None => format!("sip:{};transport={}", ANONYMOUS_HOST, self.transport_param),
            },
            ContactMode::Register => self.concrete_uri(),
            ContactMode::Default => match &self.pub_gruu {
                Some(gruu) => gruu.as_str().to_owned(),
                None => self.concrete_uri(),
            },
        };

        let mut rendered = String::with_capacity(uri.len() + 8);
        rendered.push('<');
        rendered.push_str(&uri);
        if self.outbound {
            rendered.push_str(";ob");
        }
        rendered.push('>');

        if let Some(instance) = &self.instance_id {
            rendered.push_str(";+sip.instance=\"<urn:uuid:");
            rendered.push_str(instance);
            rendered.push_str(">\"");
        }

        rendered
    }
}

/// Generates a token of the given length from the base-32 alphabet.
///
/// Also used by the agent for session-ID prefixes, Via branches and tags.
pub fn random_token(length: usize) -> SmolStr {
    let mut rng = rand::thread_rng();
    let token: String = (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    SmolStr::new(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: Option<&str>) -> ContactConfig {
        ContactConfig {
            name: name.map(SmolStr::new),
            transport_param: SmolStr::new("udp"),
            host: SmolStr::new("10.0.0.5"),
            port: 49152,
            outbound: false,
            instance_id: None,
        }
    }

    #[test]
    fn generated_token_uses_base32_alphabet() {
        let contact = Contact::new(config(None));
        assert_eq!(contact.token().len(), TOKEN_LENGTH);
        assert!(contact
            .token()
            .bytes()
            .all(|b| TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn configured_name_is_kept_verbatim() {
        let contact = Contact::new(config(Some("guest")));
        assert_eq!(contact.token(), "guest");
    }

    #[test]
    fn empty_name_falls_back_to_random_token() {
        let contact = Contact::new(config(Some("")));
        assert_eq!(contact.token().len(), TOKEN_LENGTH);
    }

    #[test]
    fn default_mode_prefers_pub_gruu() {
        let mut contact = Contact::new(config(Some("guest")));
        assert_eq!(
            contact.render(ContactMode::Default),
            "<sip:guest@10.0.0.5:49152;transport=udp>"
        );
        contact.set_pub_gruu(SipUri::parse("sip:guest@example.net;gr=abc").unwrap());
        assert_eq!(
            contact.render(ContactMode::Default),
            "<sip:guest@example.net;gr=abc>"
        );
    }

    #[test]
    fn register_mode_ignores_gruu_assignments() {
        let mut contact = Contact::new(config(Some("guest")));
        contact.set_pub_gruu(SipUri::parse("sip:guest@example.net;gr=abc").unwrap());
        contact.set_temp_gruu(SipUri::parse("sip:tgruu.7hs@example.net;gr").unwrap());
        assert_eq!(
            contact.render(ContactMode::Register),
            "<sip:guest@10.0.0.5:49152;transport=udp>"
        );
    }

    #[test]
    fn anonymous_mode_without_temp_gruu_uses_invalid_address() {
        let contact = Contact::new(config(Some("guest")));
        assert_eq!(
            contact.render(ContactMode::Anonymous),
            "<sip:anonymous@anonymous.invalid;transport=udp>"
        );
    }

    #[test]
    fn anonymous_mode_prefers_temp_gruu() {
        let mut contact = Contact::new(config(Some("guest")));
        contact.set_temp_gruu(SipUri::parse("sip:tgruu.7hs@example.net;gr").unwrap());
        assert_eq!(
            contact.render(ContactMode::Anonymous),
            "<sip:tgruu.7hs@example.net;gr>"
        );
    }

    #[test]
    fn outbound_flag_appends_indicator() {
        let mut cfg = config(Some("guest"));
        cfg.outbound = true;
        let contact = Contact::new(cfg);
        assert_eq!(
            contact.render(ContactMode::Default),
            "<sip:guest@10.0.0.5:49152;transport=udp;ob>"
        );
    }

    #[test]
    fn instance_id_is_appended_outside_brackets() {
        let mut cfg = config(Some("guest"));
        cfg.instance_id = Some(SmolStr::new("00000000-0000-0000-0000-000000000001"));
        let contact = Contact::new(cfg);
        assert_eq!(
            contact.render(ContactMode::Register),
            "<sip:guest@10.0.0.5:49152;transport=udp>;+sip.instance=\"<urn:uuid:00000000-0000-0000-0000-000000000001>\""
        );
    }
}
