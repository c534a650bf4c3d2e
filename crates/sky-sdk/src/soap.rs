//! SOAP 1.1 plumbing: envelope construction and response walking.
//!
//! The device's endpoint is a small PHP SOAP service; requests are built
//! textually and responses are read with a streaming XML walker rather
//! than a schema-derived deserializer, since the service is loose about
//! namespaces and element order.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use smol_str::SmolStr;

/// Wraps an operation body in a SOAP 1.1 envelope.
pub fn envelope(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
<soap:Body>{body}</soap:Body>\
</soap:Envelope>"
    )
}

/// Escapes text for embedding in an XML element.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Collects every leaf element's text across the whole document.
///
/// The first occurrence of a name wins, which keeps the envelope-level
/// `error`/`errorMessage` pair authoritative over any nested homonyms.
pub fn collect_leaves(xml: &str) -> BTreeMap<SmolStr, String> {
    let mut reader = Reader::from_str(xml);
    let mut leaves = BTreeMap::new();
    let mut current: Option<SmolStr> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                current = Some(SmolStr::new(String::from_utf8_lossy(
                    e.local_name().as_ref(),
                )));
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(name), Ok(text)) = (&current, e.unescape()) {
                    let text = text.trim();
                    if !text.is_empty() {
                        leaves.entry(name.clone()).or_insert_with(|| text.to_owned());
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }
    leaves
}

/// Collects each `<group>` subtree as its own flattened leaf map, in
/// document order. Used for the repeated result lists (task results,
/// status pairs, contacts, users, settings).
pub fn collect_groups(xml: &str, group: &str) -> Vec<BTreeMap<SmolStr, String>> {
    let mut reader = Reader::from_str(xml);
    let mut groups = Vec::new();
    let mut active: Option<BTreeMap<SmolStr, String>> = None;
    let mut depth = 0usize;
    let mut current: Option<SmolStr> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if active.is_some() {
                    if name == group {
                        depth += 1;
                    }
                    current = Some(SmolStr::new(name));
                } else if name == group {
                    active = Some(BTreeMap::new());
                    depth = 0;
                    current = None;
                }
            }
            Ok(Event::Empty(ref e)) => {
                if active.is_some() {
                    current = Some(SmolStr::new(String::from_utf8_lossy(
                        e.local_name().as_ref(),
                    )));
                }
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(map), Some(name), Ok(text)) = (&mut active, &current, e.unescape()) {
                    let text = text.trim();
                    if !text.is_empty() {
                        map.insert(name.clone(), text.to_owned());
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let local = e.local_name();
                let name = String::from_utf8_lossy(local.as_ref());
                current = None;
                if active.is_some() && name == group {
                    if depth == 0 {
                        if let Some(map) = active.take() {
                            groups.push(map);
                        }
                    } else {
                        depth -= 1;
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }
    groups
}

/// Convenience accessors over a flattened leaf map.
pub trait LeafMap {
    fn field(&self, name: &str) -> &str;
    fn int_field(&self, name: &str) -> i64;
    fn bool_field(&self, name: &str) -> bool;
}

impl LeafMap for BTreeMap<SmolStr, String> {
    fn field(&self, name: &str) -> &str {
        self.get(name).map(String::as_str).unwrap_or("")
    }

    fn int_field(&self, name: &str) -> i64 {
        self.field(name).trim().parse().unwrap_or(0)
    }

    fn bool_field(&self, name: &str) -> bool {
        matches!(self.field(name).trim(), "true" | "1")
    }
}
