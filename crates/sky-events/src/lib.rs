// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decoder for the gateway's NOTIFY event payloads.
//!
//! The device pushes one XML document per notification, keyed by the
//! event-package name of its root element. Exactly one package is populated
//! per message by protocol contract; anything else decodes to
//! [`EventPayload::Unrecognized`] and renders as `Invalid payload` rather
//! than failing the caller.
//!
//! Field values arrive as strings and are coerced here: booleans from the
//! literals `"true"`/`"1"`, enumerations through fixed numeric name tables,
//! numbers through an ordinary parse. Unparsable numerics coerce to zero so
//! decoding stays total.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use smol_str::SmolStr;

mod payload;

pub use payload::{AttachState, EventPayload, InternetStatus, RegistrationStatus};

/// Event packages the watch surface subscribes to, in subscription order.
///
/// `current-gps-location`, `call-details` and `alerts` exist on the wire
/// but are deliberately not subscribed: the first floods, the latter two
/// carry free-form bodies the device rarely emits.
pub const WATCHABLE_PACKAGES: [&str; 14] = [
    "presence",
    "reg",
    "sim-status",
    "signal-strength",
    "network-registration",
    "sbd-registration-state",
    "sbd-attach-state",
    "battery",
    "sos-state",
    "last-known-gps-location",
    "internet-connection",
    "connected-users",
    "user-privileges",
    "call-status",
];

/// Result of decoding one notification body.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub payload: EventPayload,
    pub line: String,
}

/// Decodes a raw notification body into a typed payload and its
/// human-readable line. Total: never fails, never panics.
pub fn decode(body: &str) -> DecodedEvent {
    let payload = match flatten(body) {
        Some((root, fields)) => EventPayload::from_document(&root, &fields),
        None => EventPayload::Unrecognized,
    };
    let line = payload.render_line();
    DecodedEvent { payload, line }
}

/// Leaf element texts and attribute values collected from a payload
/// document. The device's schemas are shallow enough that local names do
/// not collide within one package.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Fields {
    texts: BTreeMap<SmolStr, SmolStr>,
    attrs: BTreeMap<SmolStr, SmolStr>,
}

impl Fields {
    /// Returns a leaf element's text, or `""` when absent.
    pub fn text(&self, name: &str) -> &str {
        self.texts.get(name).map(SmolStr::as_str).unwrap_or("")
    }

    /// Returns an attribute value, or `""` when absent.
    pub fn attr(&self, name: &str) -> &str {
        self.attrs.get(name).map(SmolStr::as_str).unwrap_or("")
    }

    /// Coerces a leaf to a boolean: the literals `"true"` and `"1"` are
    /// true, everything else (including absence) is false.
    pub fn boolean(&self, name: &str) -> bool {
        matches!(self.text(name), "true" | "1")
    }

    /// Coerces a leaf to an integer, zero when unparsable.
    pub fn integer(&self, name: &str) -> i64 {
        self.text(name).trim().parse().unwrap_or(0)
    }

    /// Coerces a leaf to a float, zero when unparsable.
    pub fn float(&self, name: &str) -> f64 {
        self.text(name).trim().parse().unwrap_or(0.0)
    }

    /// All collected leaf texts, for the free-form packages.
    pub fn into_texts(self) -> BTreeMap<SmolStr, SmolStr> {
        self.texts
    }

    fn record_text(&mut self, element: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.texts
                .insert(SmolStr::new(element), SmolStr::new(value));
        }
    }

    fn record_attr(&mut self, name: &str, value: &str) {
        self.attrs.insert(SmolStr::new(name), SmolStr::new(value));
    }
}

/// Walks the document once, returning the root element's local name and
/// the flattened fields. Returns `None` for empty or unparsable input.
fn flatten(body: &str) -> Option<(SmolStr, Fields)> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let mut reader = Reader::from_str(body);
    let mut root: Option<SmolStr> = None;
    let mut fields = Fields::default();
    let mut current: Option<SmolStr> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = SmolStr::new(String::from_utf8_lossy(e.local_name().as_ref()));
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                    if let Ok(value) = attr.unescape_value() {
                        fields.record_attr(&key, &value);
                    }
                }
                if root.is_none() {
                    root = Some(name.clone());
                }
                current = Some(name);
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(element), Ok(text)) = (&current, e.unescape()) {
                    fields.record_text(element, &text);
                }
            }
            Ok(Event::End(_)) => {
                current = None;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }

    root.map(|root| (root, fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_collects_nested_leaves_and_attributes() {
        let (root, fields) = flatten(
            r#"<reg version="1"><registration><contact><uri>sip:guest@gw</uri><state state="1" details="active"/></contact></registration></reg>"#,
        )
        .expect("flatten");
        assert_eq!(root.as_str(), "reg");
        assert_eq!(fields.text("uri"), "sip:guest@gw");
        assert_eq!(fields.attr("details"), "active");
        assert_eq!(fields.attr("version"), "1");
    }

    #[test]
    fn flatten_rejects_empty_and_garbage() {
        assert!(flatten("").is_none());
        assert!(flatten("   \n ").is_none());
        assert!(flatten("plain text, no document").is_none());
        assert!(flatten("</stray-end>").is_none());
    }

    #[test]
    fn boolean_coercion_accepts_true_and_one() {
        let (_, fields) =
            flatten("<battery><charging>1</charging><present>yes</present></battery>").unwrap();
        assert!(fields.boolean("charging"));
        assert!(!fields.boolean("present"));
        assert!(!fields.boolean("absent-field"));
    }

    #[test]
    fn numeric_coercion_is_total() {
        let (_, fields) =
            flatten("<battery><capacity>83</capacity><temperature>garbled</temperature></battery>")
                .unwrap();
        assert_eq!(fields.integer("capacity"), 83);
        assert_eq!(fields.float("temperature"), 0.0);
        assert_eq!(fields.integer("missing"), 0);
    }
}
