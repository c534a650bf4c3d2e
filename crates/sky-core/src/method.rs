use smol_str::SmolStr;

/// SIP request methods the gateway agent exchanges with the device.
///
/// The satellite gateway's SIP server only ever originates NOTIFY and
/// MESSAGE towards us, but the parser has to classify whatever arrives,
/// so the common RFC 3261/3265/3428 set is covered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Register,
    Options,
    Info,
    Message,
    Subscribe,
    Notify,
    Unknown(SmolStr),
}

impl Method {
    /// Returns the canonical uppercase string representation for this method.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Info => "INFO",
            Method::Message => "MESSAGE",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Unknown(token) => token.as_str(),
        }
    }

    /// Parses a method token, returning `Unknown` for extension methods.
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("INVITE") {
            Method::Invite
        } else if token.eq_ignore_ascii_case("ACK") {
            Method::Ack
        } else if token.eq_ignore_ascii_case("BYE") {
            Method::Bye
        } else if token.eq_ignore_ascii_case("CANCEL") {
            Method::Cancel
        } else if token.eq_ignore_ascii_case("REGISTER") {
            Method::Register
        } else if token.eq_ignore_ascii_case("OPTIONS") {
            Method::Options
        } else if token.eq_ignore_ascii_case("INFO") {
            Method::Info
        } else if token.eq_ignore_ascii_case("MESSAGE") {
            Method::Message
        } else if token.eq_ignore_ascii_case("SUBSCRIBE") {
            Method::Subscribe
        } else if token.eq_ignore_ascii_case("NOTIFY") {
            Method::Notify
        } else {
            Method::Unknown(SmolStr::new(token.to_owned()))
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_methods_case_insensitively() {
        assert_eq!(Method::from_token("notify"), Method::Notify);
        assert_eq!(Method::from_token("NOTIFY"), Method::Notify);
        assert_eq!(Method::from_token("Subscribe"), Method::Subscribe);
        assert_eq!(Method::from_token("register"), Method::Register);
    }

    #[test]
    fn preserves_unknown_method_tokens() {
        let m = Method::from_token("PUBLISH");
        assert_eq!(m, Method::Unknown(SmolStr::new("PUBLISH")));
        assert_eq!(m.as_str(), "PUBLISH");
    }

    #[test]
    fn round_trips_canonical_strings() {
        for token in ["INVITE", "ACK", "BYE", "CANCEL", "REGISTER", "OPTIONS", "INFO", "MESSAGE", "SUBSCRIBE", "NOTIFY"] {
            assert_eq!(Method::from_token(token).as_str(), token);
        }
    }
}
