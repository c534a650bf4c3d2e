use std::collections::BTreeMap;

use serde::Serialize;
use smol_str::SmolStr;

use crate::Fields;

/// Registration status codes shared by the network and SBD registration
/// packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationStatus {
    NotRegistered,
    Registered,
    Other(i64),
}

impl RegistrationStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::NotRegistered,
            1 => Self::Registered,
            other => Self::Other(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRegistered => "not registered",
            Self::Registered => "registered",
            Self::Other(_) => "unknown",
        }
    }
}

/// SBD attach status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttachState {
    Detached,
    Attached,
    Other(i64),
}

impl AttachState {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Detached,
            1 => Self::Attached,
            other => Self::Other(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detached => "detached",
            Self::Attached => "attached",
            Self::Other(_) => "unknown",
        }
    }
}

/// Internet data-call status codes 0–6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InternetStatus {
    Unknown,
    Dialing,
    Negotiating,
    Authenticated,
    Connected,
    Terminating,
    Terminated,
    Other(i64),
}

impl InternetStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Dialing,
            2 => Self::Negotiating,
            3 => Self::Authenticated,
            4 => Self::Connected,
            5 => Self::Terminating,
            6 => Self::Terminated,
            other => Self::Other(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Dialing => "dialing",
            Self::Negotiating => "negotiating",
            Self::Authenticated => "authenticated",
            Self::Connected => "connected",
            Self::Terminating => "terminating",
            Self::Terminated => "terminated",
            Self::Other(_) => "unknown",
        }
    }
}

/// Typed union over the device's event packages.
///
/// Exactly one variant per payload instance; anything the schema set does
/// not cover lands in `Unrecognized`.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Presence {
        basic: SmolStr,
        contact: SmolStr,
    },
    Registration {
        uri: SmolStr,
        details: SmolStr,
    },
    SimStatus {
        code: i64,
        description: SmolStr,
    },
    SignalStrength {
        value: i64,
    },
    NetworkRegistration {
        status: RegistrationStatus,
    },
    SbdRegistrationState {
        status: RegistrationStatus,
    },
    SbdAttachState {
        status: AttachState,
    },
    Battery {
        capacity: i64,
        temperature: f64,
        present: bool,
        charging: bool,
    },
    SosState {
        active: bool,
    },
    GpsLocation {
        valid: bool,
        source: SmolStr,
        fix: bool,
        powered_on: bool,
    },
    InternetConnection {
        status: InternetStatus,
    },
    ConnectedUsers {
        count: i64,
    },
    UserPrivileges {
        username: SmolStr,
    },
    CallStatus {
        value: SmolStr,
    },
    CallDetails {
        fields: BTreeMap<SmolStr, SmolStr>,
    },
    Alerts {
        fields: BTreeMap<SmolStr, SmolStr>,
    },
    Unrecognized,
}

impl EventPayload {
    /// Classifies a flattened document by its root package name.
    pub fn from_document(root: &str, fields: &Fields) -> Self {
        match root {
            "presence" => Self::Presence {
                basic: SmolStr::new(fields.text("basic")),
                contact: SmolStr::new(fields.text("contact")),
            },
            "reg" => Self::Registration {
                uri: SmolStr::new(fields.text("uri")),
                details: SmolStr::new(fields.attr("details")),
            },
            "sim-status" => Self::SimStatus {
                code: fields.integer("code"),
                description: SmolStr::new(fields.text("description")),
            },
            "signal-strength" => Self::SignalStrength {
                value: fields.integer("value"),
            },
            "network-registration" => Self::NetworkRegistration {
                status: RegistrationStatus::from_code(fields.integer("status")),
            },
            "sbd-registration-state" => Self::SbdRegistrationState {
                status: RegistrationStatus::from_code(fields.integer("status")),
            },
            "sbd-attach-state" => Self::SbdAttachState {
                status: AttachState::from_code(fields.integer("status")),
            },
            "battery" => Self::Battery {
                capacity: fields.integer("capacity"),
                temperature: fields.float("temperature"),
                present: fields.boolean("present"),
                charging: fields.boolean("charging"),
            },
            "sos-state" => Self::SosState {
                active: fields.boolean("active"),
            },
            "gps-location" | "last-known-gps-location" | "current-gps-location" => {
                Self::GpsLocation {
                    valid: fields.boolean("valid-location-data"),
                    source: SmolStr::new(fields.text("source")),
                    fix: fields.boolean("gps-fix"),
                    powered_on: fields.boolean("gps-powered-on"),
                }
            }
            "internet-connection" => Self::InternetConnection {
                status: InternetStatus::from_code(fields.integer("status")),
            },
            "connected-users" => Self::ConnectedUsers {
                count: fields.integer("registered-user-count"),
            },
            "user-privileges" => Self::UserPrivileges {
                username: SmolStr::new(fields.text("username")),
            },
            "call-status" => Self::CallStatus {
                value: SmolStr::new(fields.text("value")),
            },
            "call-details" => Self::CallDetails {
                fields: fields.clone().into_texts(),
            },
            "alerts" => Self::Alerts {
                fields: fields.clone().into_texts(),
            },
            _ => Self::Unrecognized,
        }
    }

    /// Returns the event-package name this variant decodes, if recognized.
    pub fn package(&self) -> Option<&'static str> {
        match self {
            Self::Presence { .. } => Some("presence"),
            Self::Registration { .. } => Some("reg"),
            Self::SimStatus { .. } => Some("sim-status"),
            Self::SignalStrength { .. } => Some("signal-strength"),
            Self::NetworkRegistration { .. } => Some("network-registration"),
            Self::SbdRegistrationState { .. } => Some("sbd-registration-state"),
            Self::SbdAttachState { .. } => Some("sbd-attach-state"),
            Self::Battery { .. } => Some("battery"),
            Self::SosState { .. } => Some("sos-state"),
            Self::GpsLocation { .. } => Some("gps-location"),
            Self::InternetConnection { .. } => Some("internet-connection"),
            Self::ConnectedUsers { .. } => Some("connected-users"),
            Self::UserPrivileges { .. } => Some("user-privileges"),
            Self::CallStatus { .. } => Some("call-status"),
            Self::CallDetails { .. } => Some("call-details"),
            Self::Alerts { .. } => Some("alerts"),
            Self::Unrecognized => None,
        }
    }

    /// Renders exactly one human-readable line for this payload.
    pub fn render_line(&self) -> String {
        match self {
            Self::Presence { basic, contact } => format!("Presence: {basic} {contact}"),
            Self::Registration { uri, details } => format!("Registration: {uri} {details}"),
            Self::SimStatus { description, .. } => format!("SIM Status: {description}"),
            Self::SignalStrength { value } => format!("Signal Strength: {value}/5"),
            Self::NetworkRegistration { status } => {
                format!("Network Registration: {}", status.as_str())
            }
            Self::SbdRegistrationState { status } => {
                format!("SBD Registration State: {}", status.as_str())
            }
            Self::SbdAttachState { status } => format!("SBD Attach State: {}", status.as_str()),
            Self::Battery {
                capacity,
                temperature,
                charging,
                ..
            } => format!(
                "Battery: {capacity}%, {}, at {temperature}\u{b0}C",
                if *charging { "charging" } else { "not charging" }
            ),
            Self::SosState { active } => format!(
                "SOS State: {}",
                if *active { "active" } else { "inactive" }
            ),
            Self::GpsLocation {
                valid,
                fix,
                powered_on,
                ..
            } => format!(
                "GPS Location: {} {} {}",
                if *valid { "valid" } else { "invalid" },
                if *fix { "fixed" } else { "not fixed" },
                if *powered_on { "powered on" } else { "powered off" }
            ),
            Self::InternetConnection { status } => {
                format!("Internet Connection: {}", status.as_str())
            }
            Self::ConnectedUsers { count } => format!("Connected Users: {count}"),
            Self::UserPrivileges { username } => format!("User Privileges: {username}"),
            Self::CallStatus { value } => format!("Call Status: {value}"),
            Self::CallDetails { fields } => format!("Call Details: {}", render_fields(fields)),
            Self::Alerts { fields } => format!("Alerts: {}", render_fields(fields)),
            Self::Unrecognized => "Invalid payload".to_owned(),
        }
    }
}

fn render_fields(fields: &BTreeMap<SmolStr, SmolStr>) -> String {
    let mut out = String::from("{");
    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    out.push('}');
    out
}
