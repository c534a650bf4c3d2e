// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line surface for Skylink gateways.

use anyhow::{anyhow, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use sky_agent::{DecodedEvent, GatewayAgent, GatewayOptions};
use sky_sdk::{
    DataCallOptions, DeviceContact, DeviceUser, SdkClient, SettingWrite, StatusReport,
    TaskOutcome,
};
use tracing::level_filters::LevelFilter;

/// Controls satellite gateway devices over their SIP and management APIs.
#[derive(Parser, Debug)]
#[command(name = "skyctl", version, about)]
struct Cli {
    /// Username used to log into the device
    #[arg(short, long, global = true, default_value = "guest", env = "SKYLINK_USERNAME")]
    username: String,
    /// Password used to log into the device
    #[arg(short, long, global = true, default_value = "guest", env = "SKYLINK_PASSWORD")]
    password: String,
    /// Device hostname or IP address
    #[arg(short, long, global = true, default_value = "gateway.lan", env = "SKYLINK_SERVER")]
    server: String,
    /// Output format for data printed to stdout
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Increase verbosity (can be given twice)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Log outgoing SIP messages before transmission
    #[arg(long, global = true)]
    trace_sip: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Returns all status information for the device
    Status {
        /// Restrict to named status sections (e.g. satellite, battery)
        #[arg(long = "section")]
        sections: Vec<String>,
    },
    /// Connects via SIP and watches events from the device
    Watch,
    /// Sends an SMS using the provided number and content
    SendSms {
        /// Number to send to
        #[arg(short, long)]
        number: String,
        /// Message content
        #[arg(short, long)]
        message: String,
    },
    /// Samples signal quality every few seconds into signal.csv
    GraphSignal,
    /// Reports the device API and firmware versions
    Version,
    /// Reboots the device
    Reboot,
    /// Sets the emergency SOS state (use with extreme caution)
    Emergency {
        #[command(subcommand)]
        action: OnOff,
    },
    /// Starts or stops an internet data call
    Internet {
        #[command(subcommand)]
        action: InternetCommand,
    },
    /// SIM card operations
    Sim {
        #[command(subcommand)]
        action: SimCommand,
    },
    /// GPS operations
    Gps {
        #[command(subcommand)]
        action: GpsCommand,
    },
    /// Contact list operations for the current user
    Contacts {
        #[command(subcommand)]
        action: ContactCommand,
    },
    /// User management
    Users {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Device configuration
    Settings {
        #[command(subcommand)]
        action: SettingCommand,
    },
    /// Clears the message history on the device
    PurgeMessages,
    /// Resets all settings to factory defaults
    FactoryReset,
}

#[derive(Subcommand, Debug)]
enum OnOff {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum InternetCommand {
    /// Initiates a data call
    On {
        #[command(flatten)]
        options: InternetArgs,
    },
    /// Terminates the active data call
    Off,
}

#[derive(ClapArgs, Debug)]
struct InternetArgs {
    /// Permit all traffic through the firewall for this call
    #[arg(long)]
    allow_all_traffic: bool,
    /// Firewall exception entries (repeatable)
    #[arg(long = "firewall-exception")]
    firewall_exceptions: Vec<String>,
    /// Enable DNS forwarding
    #[arg(long)]
    dns_forwarding: bool,
    /// Override the dial number
    #[arg(long)]
    dial_number: Option<String>,
}

#[derive(Subcommand, Debug)]
enum SimCommand {
    /// Unlocks the SIM with its PIN
    Unlock {
        #[arg(long)]
        pin: String,
    },
    /// Unlocks the SIM with the PUK code
    UnlockPuk {
        #[arg(long)]
        puk: String,
    },
    /// Changes the SIM PIN
    ChangePin {
        #[arg(long)]
        new_pin: String,
        #[arg(long)]
        old_pin: String,
    },
    /// Enables or disables the SIM PIN requirement
    RequirePin {
        /// Require the PIN at power-on (omit to drop the requirement)
        #[arg(long)]
        enabled: bool,
        #[arg(long)]
        pin: String,
    },
    /// Reads or saves the SMSC number on the SIM
    Smsc {
        /// New SMSC to save; omit to read the current one
        #[arg(long)]
        set: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum GpsCommand {
    /// Powers up the GPS receiver for a location fix
    Activate,
    /// Sends a quick GPS message of the given type
    Quick {
        #[arg(long = "type")]
        message_type: String,
    },
}

#[derive(Subcommand, Debug)]
enum ContactCommand {
    /// Lists contacts
    List,
    /// Adds a contact
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        favourite: bool,
    },
    /// Updates a contact by ID
    Modify {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        favourite: bool,
    },
    /// Removes a contact by ID
    Remove {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Lists the accounts on the device
    List,
    /// Shows the current account's details
    Details,
    /// Creates or updates an account
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        user_password: String,
        #[arg(long, default_value_t = 1)]
        priority: i64,
        #[arg(long)]
        outgoing_calls: bool,
        #[arg(long)]
        send_sms: bool,
        #[arg(long)]
        receive_sms: bool,
        #[arg(long)]
        tracking: bool,
        #[arg(long)]
        admin: bool,
    },
    /// Removes an account by username
    Remove {
        #[arg(long)]
        username: String,
    },
}

#[derive(Subcommand, Debug)]
enum SettingCommand {
    /// Reads settings, optionally restricted to tags
    Get {
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Writes one setting
    Set {
        #[arg(long)]
        tag: String,
        #[arg(long)]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let sdk = SdkClient::new(&cli.server, &cli.username, &cli.password);

    match &cli.command {
        Command::Status { sections } => {
            let section_refs: Vec<&str> = sections.iter().map(String::as_str).collect();
            let report = sdk.get_status(&section_refs).await?;
            print_status(&cli, &report)?;
        }
        Command::Watch => watch(&cli).await?,
        Command::SendSms { number, message } => send_sms(&cli, number, message).await?,
        Command::GraphSignal => graph_signal(&sdk).await?,
        Command::Version => {
            let version = sdk.get_version().await?;
            println!("API version: {}", version.api_version);
            println!("Firmware version: {}", version.firmware_version);
        }
        Command::Reboot => report_outcome(sdk.reboot().await?),
        Command::Emergency { action } => {
            let active = matches!(*action, OnOff::On);
            report_outcome(sdk.set_emergency(active).await?);
        }
        Command::Internet { action } => match action {
            InternetCommand::On { options } => {
                let data_call = DataCallOptions {
                    allow_all_traffic: options.allow_all_traffic.then_some(true),
                    firewall_exceptions: options.firewall_exceptions.clone(),
                    dns_forwarding: options.dns_forwarding.then_some(true),
                    dial_number: options.dial_number.clone(),
                };
                report_outcome(sdk.set_internet(true, &data_call).await?);
            }
            InternetCommand::Off => {
                report_outcome(sdk.set_internet(false, &DataCallOptions::default()).await?);
            }
        },
        Command::Sim { action } => match action {
            SimCommand::Unlock { pin } => report_outcome(sdk.unlock_sim(pin).await?),
            SimCommand::UnlockPuk { puk } => report_outcome(sdk.unlock_sim_with_puk(puk).await?),
            SimCommand::ChangePin { new_pin, old_pin } => {
                report_outcome(sdk.change_sim_pin(new_pin, old_pin).await?)
            }
            SimCommand::RequirePin { enabled, pin } => {
                report_outcome(sdk.set_sim_pin_requirement(*enabled, pin).await?)
            }
            SimCommand::Smsc { set: Some(smsc) } => report_outcome(sdk.set_sim_smsc(smsc).await?),
            SimCommand::Smsc { set: None } => println!("SMSC: {}", sdk.sim_smsc().await?),
        },
        Command::Gps { action } => match action {
            GpsCommand::Activate => report_outcome(sdk.activate_gps().await?),
            GpsCommand::Quick { message_type } => {
                report_outcome(sdk.send_quick_gps(message_type).await?)
            }
        },
        Command::Contacts { action } => match action {
            ContactCommand::List => {
                for contact in sdk.get_contact_list().await? {
                    let marker = if contact.favourite { " *" } else { "" };
                    println!("{:>4}  {}  {}{marker}", contact.id, contact.name, contact.number);
                }
            }
            ContactCommand::Add {
                name,
                number,
                favourite,
            } => sdk.add_new_contact(name, number, *favourite).await?,
            ContactCommand::Modify {
                id,
                name,
                number,
                favourite,
            } => {
                sdk.modify_contact(&DeviceContact {
                    id: *id,
                    name: name.clone(),
                    number: number.clone(),
                    favourite: *favourite,
                })
                .await?
            }
            ContactCommand::Remove { id } => sdk.remove_contact(*id).await?,
        },
        Command::Users { action } => match action {
            UserCommand::List => {
                for user in sdk.get_user_list().await? {
                    let admin = if user.admin { " (admin)" } else { "" };
                    println!("{}{admin}  priority {}", user.username, user.priority);
                }
            }
            UserCommand::Details => {
                let user = sdk.get_user_details().await?;
                println!("Username: {}", user.username);
                println!("Priority: {}", user.priority);
                println!("Outgoing calls: {}", user.outgoing_calls);
                println!("Send SMS: {}", user.send_sms);
                println!("Receive SMS: {}", user.receive_sms);
                println!("Tracking: {}", user.tracking);
                println!("Admin: {}", user.admin);
            }
            UserCommand::Add {
                username,
                user_password,
                priority,
                outgoing_calls,
                send_sms,
                receive_sms,
                tracking,
                admin,
            } => {
                sdk.add_modify_user(&DeviceUser {
                    username: username.clone(),
                    password: Some(user_password.clone()),
                    outgoing_calls: *outgoing_calls,
                    priority: *priority,
                    send_sms: *send_sms,
                    receive_sms: *receive_sms,
                    social_posting: false,
                    tracking: *tracking,
                    admin: *admin,
                })
                .await?
            }
            UserCommand::Remove { username } => sdk.remove_user(username).await?,
        },
        Command::Settings { action } => match action {
            SettingCommand::Get { tags } => {
                let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
                for setting in sdk.get_settings(&tag_refs).await? {
                    println!(
                        "{} ({}) = {}",
                        setting.tag, setting.friendly_name, setting.value
                    );
                }
            }
            SettingCommand::Set { tag, value } => {
                for result in sdk
                    .set_settings(&[SettingWrite {
                        tag: tag.clone(),
                        value: value.clone(),
                    }])
                    .await?
                {
                    if result.error == 0 {
                        println!("{}: ok", result.tag);
                    } else {
                        println!("{}: error {} {}", result.tag, result.error, result.message);
                    }
                }
            }
        },
        Command::PurgeMessages => report_outcome(sdk.purge_messages().await?),
        Command::FactoryReset => report_outcome(sdk.factory_reset().await?),
    }

    Ok(())
}

fn print_status(cli: &Cli, report: &StatusReport) -> Result<()> {
    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
        Format::Text => {
            for line in report.lines() {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn report_outcome(outcome: TaskOutcome) {
    if outcome.message.is_empty() {
        println!("task {}: response {}", outcome.task_id, outcome.response_code);
    } else {
        println!(
            "task {}: response {} ({})",
            outcome.task_id, outcome.response_code, outcome.message
        );
    }
}

fn agent_options(cli: &Cli) -> GatewayOptions {
    let mut options = GatewayOptions::new(cli.server.clone(), cli.username.clone());
    options.trace_sip = cli.trace_sip;
    options
}

/// Connects the SIP side, subscribes to every event package, and prints
/// one line per notification until interrupted.
async fn watch(cli: &Cli) -> Result<()> {
    let handler = Box::new(|event: DecodedEvent| {
        println!("SIP Notification => {}", event.line);
    });
    let agent = GatewayAgent::connect(agent_options(cli), handler, sky_observe::tracing_sink())
        .await
        .map_err(|e| anyhow!("connecting to {} failed: {e}", cli.server))?;

    agent.start().await?;
    agent.subscribe_all().await?;

    tokio::signal::ctrl_c().await?;
    agent.stop().await;
    Ok(())
}

async fn send_sms(cli: &Cli, number: &str, message: &str) -> Result<()> {
    let agent = GatewayAgent::connect(
        agent_options(cli),
        Box::new(|_| {}),
        sky_observe::tracing_sink(),
    )
    .await?;
    agent.start().await?;
    agent.send_message(number, message).await?;
    // Give the datagram a moment to leave before tearing down.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    agent.stop().await;
    Ok(())
}

/// Polls signal strength every five seconds and writes the series to
/// signal.csv when interrupted.
async fn graph_signal(sdk: &SdkClient) -> Result<()> {
    println!("Press Ctrl-C to stop data collection");
    let mut samples: Vec<(String, i64)> = Vec::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
                match sdk.get_status(&["satellite"]).await {
                    Ok(report) => {
                        if let Some(signal) = report.signal_strength {
                            samples.push((chrono::Utc::now().to_rfc3339(), signal));
                        }
                    }
                    Err(e) => tracing::debug!(%e, "status poll failed"),
                }
            }
        }
    }

    if samples.is_empty() {
        println!("Collected 0 data points");
        return Ok(());
    }

    let sum: i64 = samples.iter().map(|(_, signal)| *signal).sum();
    println!("Collected {} data points", samples.len());
    println!(
        "Average signal strength: {:.2}",
        sum as f64 / samples.len() as f64
    );

    let mut csv = String::from("timestamp,signal\n");
    for (timestamp, signal) in &samples {
        csv.push_str(&format!("{timestamp},{signal}\n"));
    }
    tokio::fs::write("signal.csv", csv).await?;
    println!("Wrote signal.csv");
    Ok(())
}
