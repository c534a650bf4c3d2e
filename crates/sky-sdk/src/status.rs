// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed view over the management API's status pairs.
//!
//! getStatus returns flat `name`/`value` string pairs; this module maps
//! them onto a typed report using the device's fixed label table and
//! renders the report back to labelled lines for the text output mode.

use serde::Serialize;
use sky_events::InternetStatus;

/// Reason codes attached to a terminated data call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    Unknown,
    PppdLaunchError,
    PeerRequest,
    SystemError,
    OptionsError,
    UserRootError,
    KernelPppError,
    TerminatedBySignal,
    SerialPortLockError,
    SerialPortOpenError,
    ConnectScriptFailed,
    PtyCommandError,
    PppNegotiationFailed,
    PppAuthenticationFailed,
    TerminatedByIdle,
    TerminatedByTimeout,
    Callback,
    NoEcho,
    ModemHangUp,
    LoopbackDetected,
    InitScriptFailed,
    AuthenticationFailed,
}

impl TerminationReason {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::PppdLaunchError,
            2 => Self::PeerRequest,
            3 => Self::SystemError,
            4 => Self::OptionsError,
            5 => Self::UserRootError,
            6 => Self::KernelPppError,
            7 => Self::TerminatedBySignal,
            8 => Self::SerialPortLockError,
            9 => Self::SerialPortOpenError,
            10 => Self::ConnectScriptFailed,
            11 => Self::PtyCommandError,
            12 => Self::PppNegotiationFailed,
            13 => Self::PppAuthenticationFailed,
            14 => Self::TerminatedByIdle,
            15 => Self::TerminatedByTimeout,
            16 => Self::Callback,
            17 => Self::NoEcho,
            18 => Self::ModemHangUp,
            19 => Self::LoopbackDetected,
            20 => Self::InitScriptFailed,
            21 => Self::AuthenticationFailed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::PppdLaunchError => "pppd launch error",
            Self::PeerRequest => "peer request",
            Self::SystemError => "system error",
            Self::OptionsError => "options error",
            Self::UserRootError => "user root error",
            Self::KernelPppError => "kernel ppp error",
            Self::TerminatedBySignal => "terminated by signal",
            Self::SerialPortLockError => "serial port lock error",
            Self::SerialPortOpenError => "serial port open error",
            Self::ConnectScriptFailed => "connect script failed",
            Self::PtyCommandError => "pty command error",
            Self::PppNegotiationFailed => "ppp negotiation failed",
            Self::PppAuthenticationFailed => "ppp authentication failed",
            Self::TerminatedByIdle => "terminated by idle",
            Self::TerminatedByTimeout => "terminated by timeout",
            Self::Callback => "callback",
            Self::NoEcho => "no echo",
            Self::ModemHangUp => "modem hang up",
            Self::LoopbackDetected => "loopback detected",
            Self::InitScriptFailed => "init script failed",
            Self::AuthenticationFailed => "authentication failed",
        }
    }
}

/// Where the device's position fix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocationSource {
    Unknown,
    Gps,
    Satellite,
}

impl LocationSource {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Gps,
            2 => Self::Satellite,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Gps => "GPS",
            Self::Satellite => "satellite",
        }
    }
}

/// Typed device status; every field is optional because getStatus only
/// returns the sections that were requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
    pub pcb_version: Option<String>,
    pub terminal_firmware_version: Option<String>,
    pub unnotified_messages: Option<i64>,
    pub unnotified_voicemails: Option<i64>,
    pub unnotified_missed_calls: Option<i64>,
    pub connected_sip_users: Option<i64>,
    pub call_status: Option<String>,
    pub call_type: Option<String>,
    pub call_direction: Option<String>,
    pub call_duration: Option<f64>,
    pub active_call_number: Option<String>,
    pub internet_status: Option<InternetStatus>,
    pub internet_duration: Option<i64>,
    pub internet_termination_reason: Option<TerminationReason>,
    pub active_internet_call_number: Option<String>,
    pub transceiver_imei: Option<String>,
    pub satellite_registration: Option<String>,
    pub signal_strength: Option<i64>,
    pub transceiver_firmware_version: Option<String>,
    pub transceiver_hardware_version: Option<String>,
    pub sim_iccid: Option<String>,
    pub network_time: Option<String>,
    pub sim_pin_required: Option<String>,
    pub sim_lock_status: Option<String>,
    pub interval_tracking: Option<bool>,
    pub sos_active: Option<bool>,
    pub valid_location_data: Option<bool>,
    pub location_source: Option<LocationSource>,
    pub gps_fix: Option<bool>,
    pub gps_powered_on: Option<bool>,
    pub latitude: Option<f64>,
    pub latitude_accuracy: Option<i64>,
    pub longitude: Option<f64>,
    pub longitude_accuracy: Option<i64>,
    pub altitude: Option<i64>,
    pub altitude_accuracy: Option<i64>,
    pub battery_voltage: Option<f64>,
    pub battery_capacity: Option<i64>,
    pub charging: Option<bool>,
    pub battery_current: Option<f64>,
    pub battery_present: Option<bool>,
    pub battery_temperature: Option<f64>,
    pub board_temperature: Option<i64>,
    pub cpu_temperature: Option<i64>,
    pub antenna_raised: Option<bool>,
    pub wifi_enabled: Option<bool>,
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse().ok()
}

impl StatusReport {
    /// Builds a report from the wire's name/value pairs; labels outside
    /// the table are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut report = Self::default();
        for (name, value) in pairs {
            report.apply(name, value);
        }
        report
    }

    fn apply(&mut self, name: &str, value: &str) {
        match name {
            "Model name" => self.model_name = Some(value.to_owned()),
            "Serial number" => self.serial_number = Some(value.to_owned()),
            "PCB version" => self.pcb_version = Some(value.to_owned()),
            "Terminal firmware version" => {
                self.terminal_firmware_version = Some(value.to_owned())
            }
            "Unnotified messages" => self.unnotified_messages = parse_int(value),
            "Unnotified voicemails" => self.unnotified_voicemails = parse_int(value),
            "Unnotified missed calls" => self.unnotified_missed_calls = parse_int(value),
            "Connected SIP users" => self.connected_sip_users = parse_int(value),
            "Call status" => self.call_status = Some(value.to_owned()),
            "Call type" => self.call_type = Some(value.to_owned()),
            "Call direction" => self.call_direction = Some(value.to_owned()),
            "Call duration" => self.call_duration = parse_float(value),
            "Active call number" => self.active_call_number = Some(value.to_owned()),
            "Internet connection status" => {
                self.internet_status = parse_int(value).map(InternetStatus::from_code)
            }
            "Internet connection duration" => self.internet_duration = parse_int(value),
            "Internet termination reason" => {
                self.internet_termination_reason =
                    parse_int(value).map(TerminationReason::from_code)
            }
            "Active internet call number" => {
                self.active_internet_call_number = Some(value.to_owned())
            }
            "Transceiver IMEI" => self.transceiver_imei = Some(value.to_owned()),
            "Satellite registration" => self.satellite_registration = Some(value.to_owned()),
            "Satellite signal strength" => self.signal_strength = parse_int(value),
            "Transceiver firmware version" => {
                self.transceiver_firmware_version = Some(value.to_owned())
            }
            "Transceiver hardware version" => {
                self.transceiver_hardware_version = Some(value.to_owned())
            }
            "SIM ICCID" => self.sim_iccid = Some(value.to_owned()),
            "Network time" => self.network_time = Some(value.to_owned()),
            "SIM PIN required" => self.sim_pin_required = Some(value.to_owned()),
            "SIM lock status" => self.sim_lock_status = Some(value.to_owned()),
            "Interval tracking status" => self.interval_tracking = Some(parse_bool(value)),
            "SOS status" => self.sos_active = Some(parse_bool(value)),
            "Valid location data" => self.valid_location_data = Some(parse_bool(value)),
            "Location source" => {
                self.location_source = parse_int(value).map(LocationSource::from_code)
            }
            "GPS fix" => self.gps_fix = Some(parse_bool(value)),
            "Is GPS powered on" => self.gps_powered_on = Some(parse_bool(value)),
            "Latitude" => self.latitude = parse_float(value),
            "Latitude accuracy" => self.latitude_accuracy = parse_int(value),
            "Longitude" => self.longitude = parse_float(value),
            "Longitude accuracy" => self.longitude_accuracy = parse_int(value),
            "Altitude" => self.altitude = parse_int(value),
            "Altitude accuracy" => self.altitude_accuracy = parse_int(value),
            "Battery voltage" => self.battery_voltage = parse_float(value),
            "Battery capacity" => self.battery_capacity = parse_int(value),
            "Charging status" => self.charging = Some(parse_bool(value)),
            "Battery current" => self.battery_current = parse_float(value),
            "Battery present" => self.battery_present = Some(parse_bool(value)),
            "Battery temperature" => self.battery_temperature = parse_float(value),
            "Board temperature" => self.board_temperature = parse_int(value),
            "CPU temperature" => self.cpu_temperature = parse_int(value),
            "Antenna raised status" => self.antenna_raised = Some(parse_bool(value)),
            "Wi-fi status" => self.wifi_enabled = Some(parse_bool(value)),
            _ => {}
        }
    }

    /// Renders the populated fields as `Label: value` lines, in the
    /// device's label order.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut push = |label: &str, value: Option<String>| {
            if let Some(value) = value {
                out.push(format!("{label}: {value}"));
            }
        };
        push("Model name", self.model_name.clone());
        push("Serial number", self.serial_number.clone());
        push("PCB version", self.pcb_version.clone());
        push(
            "Terminal firmware version",
            self.terminal_firmware_version.clone(),
        );
        push(
            "Unnotified messages",
            self.unnotified_messages.map(|v| v.to_string()),
        );
        push(
            "Unnotified voicemails",
            self.unnotified_voicemails.map(|v| v.to_string()),
        );
        push(
            "Unnotified missed calls",
            self.unnotified_missed_calls.map(|v| v.to_string()),
        );
        push(
            "Connected SIP users",
            self.connected_sip_users.map(|v| v.to_string()),
        );
        push("Call status", self.call_status.clone());
        push("Call type", self.call_type.clone());
        push("Call direction", self.call_direction.clone());
        push("Call duration", self.call_duration.map(|v| v.to_string()));
        push("Active call number", self.active_call_number.clone());
        push(
            "Internet connection status",
            self.internet_status.map(|v| v.as_str().to_owned()),
        );
        push(
            "Internet connection duration",
            self.internet_duration.map(|v| v.to_string()),
        );
        push(
            "Internet termination reason",
            self.internet_termination_reason
                .map(|v| v.as_str().to_owned()),
        );
        push(
            "Active internet call number",
            self.active_internet_call_number.clone(),
        );
        push("Transceiver IMEI", self.transceiver_imei.clone());
        push(
            "Satellite registration",
            self.satellite_registration.clone(),
        );
        push(
            "Satellite signal strength",
            self.signal_strength.map(|v| v.to_string()),
        );
        push(
            "Transceiver firmware version",
            self.transceiver_firmware_version.clone(),
        );
        push(
            "Transceiver hardware version",
            self.transceiver_hardware_version.clone(),
        );
        push("SIM ICCID", self.sim_iccid.clone());
        push("Network time", self.network_time.clone());
        push("SIM PIN required", self.sim_pin_required.clone());
        push("SIM lock status", self.sim_lock_status.clone());
        push(
            "Interval tracking status",
            self.interval_tracking.map(|v| v.to_string()),
        );
        push("SOS status", self.sos_active.map(|v| v.to_string()));
        push(
            "Valid location data",
            self.valid_location_data.map(|v| v.to_string()),
        );
        push(
            "Location source",
            self.location_source.map(|v| v.as_str().to_owned()),
        );
        push("GPS fix", self.gps_fix.map(|v| v.to_string()));
        push(
            "Is GPS powered on",
            self.gps_powered_on.map(|v| v.to_string()),
        );
        push("Latitude", self.latitude.map(|v| v.to_string()));
        push(
            "Latitude accuracy",
            self.latitude_accuracy.map(|v| v.to_string()),
        );
        push("Longitude", self.longitude.map(|v| v.to_string()));
        push(
            "Longitude accuracy",
            self.longitude_accuracy.map(|v| v.to_string()),
        );
        push("Altitude", self.altitude.map(|v| v.to_string()));
        push(
            "Altitude accuracy",
            self.altitude_accuracy.map(|v| v.to_string()),
        );
        push(
            "Battery voltage",
            self.battery_voltage.map(|v| v.to_string()),
        );
        push(
            "Battery capacity",
            self.battery_capacity.map(|v| v.to_string()),
        );
        push("Charging status", self.charging.map(|v| v.to_string()));
        push(
            "Battery current",
            self.battery_current.map(|v| v.to_string()),
        );
        push(
            "Battery present",
            self.battery_present.map(|v| v.to_string()),
        );
        push(
            "Battery temperature",
            self.battery_temperature.map(|v| v.to_string()),
        );
        push(
            "Board temperature",
            self.board_temperature.map(|v| v.to_string()),
        );
        push(
            "CPU temperature",
            self.cpu_temperature.map(|v| v.to_string()),
        );
        push(
            "Antenna raised status",
            self.antenna_raised.map(|v| v.to_string()),
        );
        push("Wi-fi status", self.wifi_enabled.map(|v| v.to_string()));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_battery_section() {
        let report = StatusReport::from_pairs([
            ("Battery capacity", "83"),
            ("Battery temperature", "21.5"),
            ("Charging status", "true"),
        ]);
        assert_eq!(report.battery_capacity, Some(83));
        assert_eq!(report.battery_temperature, Some(21.5));
        assert_eq!(report.charging, Some(true));
        assert_eq!(report.model_name, None);
    }

    #[test]
    fn maps_enumerated_fields() {
        let report = StatusReport::from_pairs([
            ("Internet connection status", "4"),
            ("Internet termination reason", "14"),
            ("Location source", "1"),
        ]);
        assert_eq!(report.internet_status, Some(InternetStatus::Connected));
        assert_eq!(
            report.internet_termination_reason,
            Some(TerminationReason::TerminatedByIdle)
        );
        assert_eq!(report.location_source, Some(LocationSource::Gps));
    }

    #[test]
    fn ignores_unknown_labels() {
        let report = StatusReport::from_pairs([("Flux capacitance", "1.21")]);
        assert_eq!(report, StatusReport::default());
    }

    #[test]
    fn lines_render_only_populated_fields() {
        let report = StatusReport::from_pairs([
            ("Model name", "SG-100"),
            ("Satellite signal strength", "3"),
            ("SOS status", "false"),
        ]);
        let lines = report.lines();
        assert_eq!(
            lines,
            vec![
                "Model name: SG-100".to_owned(),
                "Satellite signal strength: 3".to_owned(),
                "SOS status: false".to_owned(),
            ]
        );
    }

    #[test]
    fn boolean_parsing_accepts_one() {
        let report = StatusReport::from_pairs([("GPS fix", "1"), ("Battery present", "no")]);
        assert_eq!(report.gps_fix, Some(true));
        assert_eq!(report.battery_present, Some(false));
    }
}
