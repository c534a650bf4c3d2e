// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Client for the gateway's SOAP management API.
//!
//! Pure call/response marshalling: every operation is one HTTP POST to the
//! device's `sdk.php` endpoint carrying the user's credentials. Non-zero
//! device error codes become [`SdkFault`] values; the SIP side of the
//! system neither depends on nor blocks on this channel.

use anyhow::{anyhow, Context, Result};
use tracing::debug;

mod soap;
mod status;
mod types;

pub use soap::LeafMap;
pub use status::{LocationSource, StatusReport, TerminationReason};
pub use types::{
    DataCallOptions, DeviceContact, DeviceUser, OptionType, SdkFault, SdkVersion, Setting,
    SettingWrite, SettingWriteResult, TaskKind, TaskOption, TaskOutcome, TaskRequest,
};

use soap::{collect_groups, collect_leaves, envelope, escape};

/// Client bound to one device endpoint and one set of credentials.
pub struct SdkClient {
    http: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl SdkClient {
    /// Creates a client for `http://{server}/sdk/sdk.php`.
    pub fn new(server: &str, username: &str, password: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("http://{server}/sdk/sdk.php"),
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }

    fn credentials_xml(&self) -> String {
        format!(
            "<userCredentials><userName>{}</userName><password>{}</password></userCredentials>",
            escape(&self.username),
            escape(&self.password)
        )
    }

    /// Posts one SOAP operation and returns the raw response document
    /// after the device-level error check.
    async fn call(&self, operation: &str, inner: &str) -> Result<String> {
        let body = envelope(&format!("<{operation}>{inner}</{operation}>"));
        debug!(operation, endpoint = %self.endpoint, "management API call");

        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{operation}\""))
            .body(body)
            .send()
            .await
            .with_context(|| format!("management API call {operation} failed"))?;

        let http_status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("reading {operation} response failed"))?;
        if !http_status.is_success() {
            return Err(anyhow!(
                "management API call {operation} returned HTTP {http_status}"
            ));
        }

        let leaves = collect_leaves(&text);
        let code = leaves.int_field("error");
        if code != 0 {
            return Err(SdkFault {
                code,
                message: leaves.field("errorMessage").to_owned(),
            }
            .into());
        }
        Ok(text)
    }

    /// Performs a queue of tasks and returns the per-task outcomes.
    pub async fn perform_tasks(&self, requests: &[TaskRequest]) -> Result<Vec<TaskOutcome>> {
        let mut list = String::new();
        for request in requests {
            list.push_str("<requestList>");
            list.push_str(&format!("<taskID>{}</taskID>", request.task.id()));
            for option in &request.options {
                list.push_str(&format!(
                    "<options><name>{}</name><value>{}</value><dataType>{}</dataType></options>",
                    escape(&option.name),
                    escape(&option.value),
                    option.data_type.as_str()
                ));
            }
            list.push_str("</requestList>");
        }

        let inner = format!("{}<taskList>{list}</taskList>", self.credentials_xml());
        let text = self.call("performTask", &inner).await?;

        Ok(collect_groups(&text, "taskResults")
            .into_iter()
            .map(|group| TaskOutcome {
                task_id: group.int_field("taskID"),
                response_code: group.int_field("responseCode"),
                message: group.field("message").to_owned(),
            })
            .collect())
    }

    /// Performs a single task and returns its outcome.
    pub async fn perform_task(
        &self,
        task: TaskKind,
        options: Vec<TaskOption>,
    ) -> Result<TaskOutcome> {
        let outcomes = self
            .perform_tasks(&[TaskRequest::with_options(task, options)])
            .await?;
        outcomes
            .into_iter()
            .find(|outcome| outcome.task_id == task.id())
            .ok_or_else(|| anyhow!("device returned no result for task {}", task.id()))
    }

    /// Reboots the system module.
    pub async fn reboot(&self) -> Result<TaskOutcome> {
        self.perform_task(
            TaskKind::Reboot,
            vec![TaskOption::text("module", "system")],
        )
        .await
    }

    /// Sets the emergency SOS state. Use with extreme caution.
    pub async fn set_emergency(&self, active: bool) -> Result<TaskOutcome> {
        self.perform_task(
            TaskKind::Emergency,
            vec![TaskOption::boolean("set state", active)],
        )
        .await
    }

    /// Starts or stops an internet data call.
    pub async fn set_internet(
        &self,
        active: bool,
        options: &DataCallOptions,
    ) -> Result<TaskOutcome> {
        let mut task_options = vec![TaskOption::boolean("set state", active)];
        if let Some(allow) = options.allow_all_traffic {
            task_options.push(TaskOption::boolean("Firewall allow all traffic", allow));
        }
        for exception in &options.firewall_exceptions {
            task_options.push(TaskOption::text("Firewall exceptions", exception.clone()));
        }
        if let Some(forwarding) = options.dns_forwarding {
            task_options.push(TaskOption::boolean("Enable DNS forwarding", forwarding));
        }
        if let Some(number) = &options.dial_number {
            task_options.push(TaskOption::text("Dial number", number.clone()));
        }
        self.perform_task(TaskKind::InternetService, task_options)
            .await
    }

    /// Sends a quick GPS message of the given type.
    pub async fn send_quick_gps(&self, message_type: &str) -> Result<TaskOutcome> {
        self.perform_task(
            TaskKind::SendMessage,
            vec![TaskOption::text("message type", message_type)],
        )
        .await
    }

    /// Unlocks the SIM with its PIN code.
    pub async fn unlock_sim(&self, pin: &str) -> Result<TaskOutcome> {
        self.perform_task(TaskKind::UnlockSim, vec![TaskOption::text("SIM PIN", pin)])
            .await
    }

    /// Unlocks the SIM with the PUK code.
    pub async fn unlock_sim_with_puk(&self, puk: &str) -> Result<TaskOutcome> {
        self.perform_task(TaskKind::UnlockSim, vec![TaskOption::text("PUK code", puk)])
            .await
    }

    /// Enables or disables the SIM PIN requirement.
    pub async fn set_sim_pin_requirement(&self, required: bool, pin: &str) -> Result<TaskOutcome> {
        self.perform_task(
            TaskKind::SimPinRequirement,
            vec![
                TaskOption::boolean("set state", required),
                TaskOption::text("SIM PIN", pin),
            ],
        )
        .await
    }

    /// Changes the SIM PIN; requires both the new and the old PIN.
    pub async fn change_sim_pin(&self, new_pin: &str, old_pin: &str) -> Result<TaskOutcome> {
        self.perform_task(
            TaskKind::ModifySimPin,
            vec![
                TaskOption::text("SIM PIN", new_pin),
                TaskOption::text("SIM PIN", old_pin),
            ],
        )
        .await
    }

    /// Reads the SMSC number saved on the SIM.
    pub async fn sim_smsc(&self) -> Result<String> {
        let outcome = self.perform_task(TaskKind::SimSmsc, Vec::new()).await?;
        Ok(outcome.message)
    }

    /// Saves a new SMSC number to the SIM.
    pub async fn set_sim_smsc(&self, smsc: &str) -> Result<TaskOutcome> {
        self.perform_task(TaskKind::SimSmsc, vec![TaskOption::text("SMSC", smsc)])
            .await
    }

    /// Powers up the GPS receiver for a location fix.
    pub async fn activate_gps(&self) -> Result<TaskOutcome> {
        self.perform_task(TaskKind::ActivateGps, Vec::new()).await
    }

    /// Clears the message history on the device.
    pub async fn purge_messages(&self) -> Result<TaskOutcome> {
        self.perform_task(TaskKind::PurgeMessages, Vec::new()).await
    }

    /// Resets all settings to factory defaults.
    pub async fn factory_reset(&self) -> Result<TaskOutcome> {
        self.perform_task(TaskKind::SetFactoryDefaults, Vec::new())
            .await
    }

    /// Retrieves device status, optionally filtered by section names.
    pub async fn get_status(&self, sections: &[&str]) -> Result<StatusReport> {
        let mut request = String::from("<request>");
        for section in sections {
            request.push_str(&format!("<options><name>{}</name></options>", escape(section)));
        }
        request.push_str("</request>");

        let inner = format!("{}{request}", self.credentials_xml());
        let text = self.call("getStatus", &inner).await?;

        let pairs: Vec<(String, String)> = collect_groups(&text, "status")
            .into_iter()
            .map(|group| {
                (
                    group.field("name").to_owned(),
                    group.field("value").to_owned(),
                )
            })
            .collect();
        Ok(StatusReport::from_pairs(
            pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())),
        ))
    }

    /// Reads device settings, optionally restricted to the given tags.
    pub async fn get_settings(&self, tags: &[&str]) -> Result<Vec<Setting>> {
        let mut req_list = String::from("<reqList>");
        for tag in tags {
            req_list.push_str(&format!("<requestList><tag>{}</tag></requestList>", escape(tag)));
        }
        req_list.push_str("</reqList>");

        let inner = format!("{}{req_list}", self.credentials_xml());
        let text = self.call("getSettings", &inner).await?;

        Ok(collect_groups(&text, "configurations")
            .into_iter()
            .map(|group| Setting {
                friendly_name: group.field("friendlyName").to_owned(),
                tag: group.field("tag").to_owned(),
                data_type: group.field("dataType").to_owned(),
                value: group.field("value").to_owned(),
                min_value: group.field("minValue").to_owned(),
                max_value: group.field("maxValue").to_owned(),
            })
            .collect())
    }

    /// Writes device settings and returns the per-tag results.
    pub async fn set_settings(&self, writes: &[SettingWrite]) -> Result<Vec<SettingWriteResult>> {
        let mut set_list = String::from("<setList>");
        for write in writes {
            set_list.push_str(&format!(
                "<setRequests><tag>{}</tag><value>{}</value></setRequests>",
                escape(&write.tag),
                escape(&write.value)
            ));
        }
        set_list.push_str("</setList>");

        let inner = format!("{}{set_list}", self.credentials_xml());
        let text = self.call("setSettings", &inner).await?;

        Ok(collect_groups(&text, "setResults")
            .into_iter()
            .map(|group| SettingWriteResult {
                tag: group.field("tag").to_owned(),
                error: group.int_field("error"),
                message: group.field("message").to_owned(),
            })
            .collect())
    }

    /// Lists contacts for the current user.
    pub async fn get_contact_list(&self) -> Result<Vec<DeviceContact>> {
        let text = self.call("getContactList", &self.credentials_xml()).await?;
        Ok(collect_groups(&text, "contacts")
            .into_iter()
            .map(|group| DeviceContact {
                id: group.int_field("id"),
                name: group.field("name").to_owned(),
                number: group.field("number").to_owned(),
                favourite: group.bool_field("isFavourite"),
            })
            .collect())
    }

    /// Adds a new contact for the current user.
    pub async fn add_new_contact(&self, name: &str, number: &str, favourite: bool) -> Result<()> {
        let inner = format!(
            "{}<name>{}</name><number>{}</number><isFavourite>{favourite}</isFavourite>",
            self.credentials_xml(),
            escape(name),
            escape(number)
        );
        self.call("addNewContact", &inner).await.map(|_| ())
    }

    /// Updates an existing contact.
    pub async fn modify_contact(&self, contact: &DeviceContact) -> Result<()> {
        let inner = format!(
            "{}<contact><id>{}</id><name>{}</name><number>{}</number>\
<isFavourite>{}</isFavourite></contact>",
            self.credentials_xml(),
            contact.id,
            escape(&contact.name),
            escape(&contact.number),
            contact.favourite
        );
        self.call("modifyContact", &inner).await.map(|_| ())
    }

    /// Deletes a contact by its identifier.
    pub async fn remove_contact(&self, contact_id: i64) -> Result<()> {
        let inner = format!(
            "{}<contactID>{contact_id}</contactID>",
            self.credentials_xml()
        );
        self.call("removeContact", &inner).await.map(|_| ())
    }

    /// Lists the accounts provisioned on the device.
    pub async fn get_user_list(&self) -> Result<Vec<DeviceUser>> {
        let text = self.call("getUserList", &self.credentials_xml()).await?;
        Ok(collect_groups(&text, "users")
            .into_iter()
            .map(user_from_group)
            .collect())
    }

    /// Returns the account details for the current user.
    pub async fn get_user_details(&self) -> Result<DeviceUser> {
        let text = self.call("getUserDetails", &self.credentials_xml()).await?;
        collect_groups(&text, "user")
            .into_iter()
            .map(user_from_group)
            .next()
            .ok_or_else(|| anyhow!("device returned no user record"))
    }

    /// Creates or updates an account on the device.
    pub async fn add_modify_user(&self, user: &DeviceUser) -> Result<()> {
        let password = user.password.as_deref().unwrap_or("");
        let inner = format!(
            "{}<user><userName>{}</userName><password>{}</password>\
<outgoingCall>{}</outgoingCall><userPriority>{}</userPriority>\
<sendSms>{}</sendSms><receiveSms>{}</receiveSms>\
<canAccessTwitter>{}</canAccessTwitter><tracking>{}</tracking>\
<isAdmin>{}</isAdmin></user>",
            self.credentials_xml(),
            escape(&user.username),
            escape(password),
            user.outgoing_calls,
            user.priority,
            user.send_sms,
            user.receive_sms,
            user.social_posting,
            user.tracking,
            user.admin
        );
        self.call("addModifyUser", &inner).await.map(|_| ())
    }

    /// Deletes an account by username.
    pub async fn remove_user(&self, username: &str) -> Result<()> {
        let inner = format!(
            "{}<userName>{}</userName>",
            self.credentials_xml(),
            escape(username)
        );
        self.call("removeUser", &inner).await.map(|_| ())
    }

    /// Returns the API and firmware versions.
    pub async fn get_version(&self) -> Result<SdkVersion> {
        let text = self.call("getVersion", "").await?;
        let leaves = collect_leaves(&text);
        Ok(SdkVersion {
            api_version: leaves.field("apiVersion").to_owned(),
            firmware_version: leaves.field("firmwareVersion").to_owned(),
        })
    }

    /// Returns raw name/value pairs describing the satellite transceiver.
    pub async fn get_transceiver_info(&self) -> Result<Vec<(String, String)>> {
        let text = self.call("getTransceiverInfo", "").await?;
        Ok(collect_groups(&text, "status")
            .into_iter()
            .map(|group| {
                (
                    group.field("name").to_owned(),
                    group.field("value").to_owned(),
                )
            })
            .collect())
    }
}

fn user_from_group(group: std::collections::BTreeMap<smol_str::SmolStr, String>) -> DeviceUser {
    DeviceUser {
        username: group.field("userName").to_owned(),
        password: None,
        outgoing_calls: group.bool_field("outgoingCall"),
        priority: group.int_field("userPriority"),
        send_sms: group.bool_field("sendSms"),
        receive_sms: group.bool_field("receiveSms"),
        social_posting: group.bool_field("canAccessTwitter"),
        tracking: group.bool_field("tracking"),
        admin: group.bool_field("isAdmin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_targets_the_sdk_endpoint() {
        let client = SdkClient::new("gateway.lan", "guest", "guest");
        assert_eq!(client.endpoint, "http://gateway.lan/sdk/sdk.php");
    }

    #[test]
    fn credentials_are_escaped() {
        let client = SdkClient::new("gateway.lan", "gu<est", "p&ss");
        let xml = client.credentials_xml();
        assert!(xml.contains("<userName>gu&lt;est</userName>"));
        assert!(xml.contains("<password>p&amp;ss</password>"));
    }

    #[test]
    fn task_outcome_parsing_from_canned_response() {
        let canned = "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
<soap:Body><performTaskResponse><parameters><error>0</error><errorMessage></errorMessage>\
<taskResults><taskID>2</taskID><responseCode>1</responseCode><message>dialing</message></taskResults>\
<taskResults><taskID>0</taskID><responseCode>0</responseCode><message>ok</message></taskResults>\
</parameters></performTaskResponse></soap:Body></soap:Envelope>";
        let outcomes: Vec<TaskOutcome> = collect_groups(canned, "taskResults")
            .into_iter()
            .map(|group| TaskOutcome {
                task_id: group.int_field("taskID"),
                response_code: group.int_field("responseCode"),
                message: group.field("message").to_owned(),
            })
            .collect();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].task_id, 2);
        assert_eq!(outcomes[0].message, "dialing");
        assert_eq!(outcomes[1].response_code, 0);
    }

    #[test]
    fn device_error_detection_from_canned_response() {
        let canned = "<r><statusOutput><error>102</error>\
<errorMessage>invalid credentials</errorMessage></statusOutput></r>";
        let leaves = collect_leaves(canned);
        assert_eq!(leaves.int_field("error"), 102);
        assert_eq!(leaves.field("errorMessage"), "invalid credentials");
    }
}
