// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gateway user agent: owns the UDP socket and everything speaking SIP
//! through it.
//!
//! The agent is a deliberately thin shim at the dialog-engine boundary.
//! It composes REGISTER, SUBSCRIBE and MESSAGE requests, acknowledges
//! NOTIFY, and routes notification bodies through the event decoder.
//! Retransmission, registration refresh and authentication challenges are
//! out of scope here; they belong to a full transaction engine consuming
//! the same [`sky_transport::SignalingTransport`] capability.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use sky_core::{
    random_token, Contact, ContactConfig, ContactMode, Headers, Method, Request, RequestLine,
    SipUri,
};
use sky_events::WATCHABLE_PACKAGES;
use sky_observe::TransportTrace;
use sky_parse::serialize_request;
use sky_transport::{
    resolve_source_addr, SanityGuard, SignalingTransport, TransportConfig, UdpTransport,
};
use smol_str::SmolStr;
use tokio::net::UdpSocket;
use tracing::info;

mod pump;
pub mod sdp;

pub use pump::{InboundPump, NotifyHandler};
pub use sky_events::{DecodedEvent, EventPayload};

const USER_AGENT: &str = "skylink/0.1";
const SESSION_PREFIX_LENGTH: usize = 8;
const REGISTER_EXPIRES: u32 = 600;
const SUBSCRIBE_EXPIRES: u32 = 3600;

/// Identity and endpoint configuration for one agent instance.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Gateway hostname or IPv4 address.
    pub server: String,
    /// Gateway SIP port.
    pub port: u16,
    /// Account name used in From/To URIs.
    pub username: String,
    /// Log outgoing SIP text before transmission.
    pub trace_sip: bool,
}

impl GatewayOptions {
    pub fn new(server: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: 5060,
            username: username.into(),
            trace_sip: false,
        }
    }
}

/// SIP agent bound to one gateway device.
pub struct GatewayAgent {
    options: GatewayOptions,
    socket: Arc<UdpSocket>,
    transport: Arc<UdpTransport>,
    contact: Contact,
    session_prefix: SmolStr,
    via_host: SmolStr,
    via_port: u16,
    cseq: AtomicU32,
}

impl GatewayAgent {
    /// Resolves the route to the device, binds the socket, and assembles
    /// the transport chain. Fatal on resolution or bind failure.
    pub async fn connect(
        options: GatewayOptions,
        handler: NotifyHandler,
        trace: Arc<dyn TransportTrace>,
    ) -> Result<Self> {
        let source_ip = resolve_source_addr(&options.server).await?;
        let socket = UdpSocket::bind((source_ip, 0))
            .await
            .with_context(|| format!("binding UDP socket on {source_ip} failed"))?;
        socket
            .connect((options.server.as_str(), options.port))
            .await
            .with_context(|| {
                format!("connecting socket to {}:{} failed", options.server, options.port)
            })?;
        let socket = Arc::new(socket);

        let local = socket.local_addr().context("reading local address")?;
        let remote = socket.peer_addr().context("reading peer address")?;
        let via_host = SmolStr::new(source_ip.to_string());
        let via_port = local.port();

        // Immutable session identity, generated once and compared by value
        // in the guard's local-echo check.
        let session_prefix = random_token(SESSION_PREFIX_LENGTH);

        let contact = Contact::new(ContactConfig {
            name: None,
            transport_param: SmolStr::new("udp"),
            host: via_host.clone(),
            port: via_port,
            outbound: false,
            instance_id: None,
        });

        let guard = SanityGuard::new(
            via_host.clone(),
            via_port,
            session_prefix.clone(),
            Arc::clone(&trace),
        );
        let pump = Arc::new(InboundPump::new(
            guard,
            Arc::clone(&socket),
            Arc::clone(&trace),
            handler,
        ));

        let transport = Arc::new(UdpTransport::new(
            Arc::clone(&socket),
            TransportConfig {
                remote,
                local,
                trace_sip: options.trace_sip,
            },
            pump,
            trace,
        ));

        info!(%local, %remote, "gateway agent ready");
        Ok(Self {
            options,
            socket,
            transport,
            contact,
            session_prefix,
            via_host,
            via_port,
            cseq: AtomicU32::new(1),
        })
    }

    /// Connects the transport and registers with the gateway.
    pub async fn start(&self) -> Result<()> {
        self.transport.connect().await?;
        self.register().await
    }

    /// Detaches the transport. The socket closes when the agent is
    /// dropped; dropping twice is inherently a no-op.
    pub async fn stop(&self) {
        self.transport.disconnect().await;
    }

    /// Emits a single REGISTER claiming the concrete contact address.
    pub async fn register(&self) -> Result<()> {
        let aor = format!("sip:{}@{}", self.options.username, self.options.server);
        let message = self.compose(
            Method::Register,
            &format!("sip:{}", self.options.server),
            &format!("<{aor}>"),
            &format!("<{aor}>"),
            &[
                ("Contact", self.contact.render(ContactMode::Register)),
                ("Expires", REGISTER_EXPIRES.to_string()),
            ],
            None,
        )?;
        self.transport.send(&message).await
    }

    /// Subscribes to one event package on the device.
    pub async fn subscribe(&self, package: &str) -> Result<()> {
        let aor = format!("sip:{}@{}", self.options.username, self.options.server);
        let message = self.compose(
            Method::Subscribe,
            &aor,
            &format!("<{aor}>"),
            &format!("<{aor}>"),
            &[
                ("Contact", self.contact.render(ContactMode::Default)),
                ("Event", package.to_owned()),
                ("Expires", SUBSCRIBE_EXPIRES.to_string()),
                ("Accept", "application/xml".to_owned()),
            ],
            None,
        )?;
        self.transport.send(&message).await
    }

    /// Subscribes to every watchable event package.
    pub async fn subscribe_all(&self) -> Result<()> {
        for package in WATCHABLE_PACKAGES {
            self.subscribe(package).await?;
        }
        Ok(())
    }

    /// Sends an SMS through the gateway as a SIP MESSAGE.
    pub async fn send_message(&self, number: &str, content: &str) -> Result<()> {
        let target = format!("sip:{}@{}", number, self.options.server);
        let from = format!("sip:{}@{}", self.options.username, self.options.server);
        let message = self.compose(
            Method::Message,
            &target,
            &format!("<{from}>"),
            &format!("<{target}>"),
            &[("Content-Type", "text/plain".to_owned())],
            Some(content),
        )?;
        self.transport.send(&message).await
    }

    /// Local socket address the agent bound.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Returns the session-ID prefix carried by every outbound Call-ID.
    pub fn session_prefix(&self) -> &str {
        &self.session_prefix
    }

    /// Returns the advertised Via host.
    pub fn via_host(&self) -> &str {
        &self.via_host
    }

    /// Returns the advertised Via port.
    pub fn via_port(&self) -> u16 {
        self.via_port
    }

    /// Returns the contact synthesizer for this agent.
    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    /// Returns true while the transport is attached.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    fn next_cseq(&self) -> u32 {
        self.cseq.fetch_add(1, Ordering::Relaxed)
    }

    /// Builds the textual request. Every request is out-of-dialog: fresh
    /// Call-ID (session prefix first), fresh From tag, fresh branch.
    fn compose(
        &self,
        method: Method,
        target: &str,
        from: &str,
        to: &str,
        extra_headers: &[(&str, String)],
        body: Option<&str>,
    ) -> Result<String> {
        let uri =
            SipUri::parse(target).ok_or_else(|| anyhow!("invalid request URI {target}"))?;

        let mut headers = Headers::new();
        headers.push(
            "Via",
            format!(
                "SIP/2.0/UDP {}:{};branch=z9hG4bK{};rport",
                self.via_host,
                self.via_port,
                random_token(10)
            ),
        );
        headers.push("From", format!("{from};tag={}", random_token(10)));
        headers.push("To", to);
        headers.push(
            "Call-ID",
            format!("{}{}", self.session_prefix, random_token(10)),
        );
        headers.push("CSeq", format!("{} {}", self.next_cseq(), method.as_str()));
        headers.push("User-Agent", USER_AGENT);
        for (name, value) in extra_headers {
            headers.push(*name, value.as_str());
        }

        let request = Request::new(
            RequestLine::new(method, uri),
            headers,
            Bytes::from(body.unwrap_or("").to_owned()),
        );
        let bytes = serialize_request(&request);
        String::from_utf8(bytes.to_vec()).context("serialized request was not UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_prefix_has_expected_shape() {
        let prefix = random_token(SESSION_PREFIX_LENGTH);
        assert_eq!(prefix.len(), SESSION_PREFIX_LENGTH);
        assert!(prefix
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn gateway_options_default_to_sip_port() {
        let options = GatewayOptions::new("gateway.lan", "guest");
        assert_eq!(options.port, 5060);
        assert!(!options.trace_sip);
    }
}
