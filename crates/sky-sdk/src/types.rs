use std::fmt;

use smol_str::SmolStr;

/// Task identifiers accepted by the management API's performTask call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Reboot,
    Emergency,
    InternetService,
    SendMessage,
    UnlockSim,
    SimPinRequirement,
    SetFactoryDefaults,
    ModifySimPin,
    SimSmsc,
    ActivateGps,
    PurgeMessages,
    UpgradeTransceiver,
}

impl TaskKind {
    /// Numeric task ID on the wire.
    pub fn id(self) -> i64 {
        match self {
            TaskKind::Reboot => 0,
            TaskKind::Emergency => 1,
            TaskKind::InternetService => 2,
            TaskKind::SendMessage => 3,
            TaskKind::UnlockSim => 4,
            TaskKind::SimPinRequirement => 5,
            TaskKind::SetFactoryDefaults => 6,
            TaskKind::ModifySimPin => 7,
            TaskKind::SimSmsc => 8,
            TaskKind::ActivateGps => 9,
            TaskKind::PurgeMessages => 10,
            TaskKind::UpgradeTransceiver => 21,
        }
    }
}

/// Wire data types accepted for task and setting values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Text,
    Bool,
    Int,
}

impl OptionType {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Text => "string",
            OptionType::Bool => "bool",
            OptionType::Int => "int",
        }
    }
}

/// One named key/value option attached to a task request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOption {
    pub name: SmolStr,
    pub value: String,
    pub data_type: OptionType,
}

impl TaskOption {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: SmolStr::new(name),
            value: value.into(),
            data_type: OptionType::Text,
        }
    }

    pub fn boolean(name: &str, value: bool) -> Self {
        Self {
            name: SmolStr::new(name),
            value: value.to_string(),
            data_type: OptionType::Bool,
        }
    }

    pub fn integer(name: &str, value: i64) -> Self {
        Self {
            name: SmolStr::new(name),
            value: value.to_string(),
            data_type: OptionType::Int,
        }
    }
}

/// One queued task submitted through performTask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub task: TaskKind,
    pub options: Vec<TaskOption>,
}

impl TaskRequest {
    pub fn new(task: TaskKind) -> Self {
        Self {
            task,
            options: Vec::new(),
        }
    }

    pub fn with_options(task: TaskKind, options: Vec<TaskOption>) -> Self {
        Self { task, options }
    }
}

/// Per-task result returned by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub task_id: i64,
    pub response_code: i64,
    pub message: String,
}

/// Optional knobs for initiating an internet data call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataCallOptions {
    pub allow_all_traffic: Option<bool>,
    pub firewall_exceptions: Vec<String>,
    pub dns_forwarding: Option<bool>,
    pub dial_number: Option<String>,
}

/// Phone-book entry stored on the device for the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceContact {
    pub id: i64,
    pub name: String,
    pub number: String,
    pub favourite: bool,
}

/// Account provisioned on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUser {
    pub username: String,
    pub password: Option<String>,
    pub outgoing_calls: bool,
    pub priority: i64,
    pub send_sms: bool,
    pub receive_sms: bool,
    pub social_posting: bool,
    pub tracking: bool,
    pub admin: bool,
}

/// One configuration entry read back from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub friendly_name: String,
    pub tag: String,
    pub data_type: String,
    pub value: String,
    pub min_value: String,
    pub max_value: String,
}

/// One configuration write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingWrite {
    pub tag: String,
    pub value: String,
}

/// Per-tag result of a configuration write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingWriteResult {
    pub tag: String,
    pub error: i64,
    pub message: String,
}

/// API and firmware versions reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkVersion {
    pub api_version: String,
    pub firmware_version: String,
}

/// Non-zero error returned inside a management API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkFault {
    pub code: i64,
    pub message: String,
}

impl SdkFault {
    /// Symbolic name for the error code, from the device's fixed table.
    pub fn name(&self) -> &'static str {
        match self.code {
            0 => "NoError",
            101 => "UnknownRequest",
            102 => "InvalidCredentials",
            103 => "AccessDenied",
            104 => "ErrorSavingValue",
            105 => "UnknownError",
            106 => "NotImplemented",
            201 => "InvalidTag",
            202 => "InvalidValue",
            205 => "PartialResult",
            301 => "UnknownUser",
            302 => "CannotRemoveSystemUser",
            303 => "InvalidValues",
            351 => "DuplicatePhoneNumber",
            352 => "NoContactFound",
            401 => "InvalidRestorePointOperation",
            402 => "InvalidRestorePointVersion",
            403 => "NoRestorePointOperationFound",
            404 => "RestorePointAlreadyExists",
            405 => "ErrorCreatingRestorePoint",
            406 => "ErrorRemovingRestorePoint",
            407 => "NoRestorePointFound",
            408 => "RestorePointNameRequired",
            409 => "RestorePointLimitReached",
            501 => "ErrorRestoring",
            1002 => "ConnectionTimeout",
            1003 => "InternalError",
            1004 => "InvalidRequest",
            _ => "Unrecognized",
        }
    }
}

impl fmt::Display for SdkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "management API returned error {} ({}): {}",
            self.code,
            self.name(),
            self.message
        )
    }
}

impl std::error::Error for SdkFault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_match_the_wire_table() {
        assert_eq!(TaskKind::Reboot.id(), 0);
        assert_eq!(TaskKind::InternetService.id(), 2);
        assert_eq!(TaskKind::PurgeMessages.id(), 10);
        assert_eq!(TaskKind::UpgradeTransceiver.id(), 21);
    }

    #[test]
    fn option_constructors_stringify_values() {
        let opt = TaskOption::boolean("set state", true);
        assert_eq!(opt.value, "true");
        assert_eq!(opt.data_type.as_str(), "bool");

        let opt = TaskOption::integer("priority", 3);
        assert_eq!(opt.value, "3");
        assert_eq!(opt.data_type.as_str(), "int");
    }

    #[test]
    fn fault_names_resolve() {
        let fault = SdkFault {
            code: 102,
            message: "bad login".into(),
        };
        assert_eq!(fault.name(), "InvalidCredentials");
        assert!(fault.to_string().contains("InvalidCredentials"));

        let fault = SdkFault {
            code: 9999,
            message: String::new(),
        };
        assert_eq!(fault.name(), "Unrecognized");
    }
}
