// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UDP transport adapter for the gateway's SIP channel.
//!
//! The gateway's SIP server only speaks plain UDP, while the dialog engine
//! above assumes a connection-oriented transport. This crate adapts the
//! two: one socket, one fixed remote peer, an explicit
//! `Disconnected → Connected → Disconnected` lifecycle, and a strictly
//! serialized inbound path. Everything a hostile or confused datagram
//! could do is screened out by [`guard::SanityGuard`] before the engine
//! sees it.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use sky_core::{Request, Response};
use sky_observe::TransportTrace;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub mod guard;
pub mod route;

pub use guard::{SanityGuard, Screened};
pub use route::{
    prefix_contains, prefix_contains_cidr, resolve_source_addr, select_source_addr,
    InterfaceBlock, RouteError,
};

/// Maximum datagram the receive loop will accept; matches the parser limit.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Connection state owned by the transport.
///
/// Transitions happen only through [`SignalingTransport::connect`] and
/// [`SignalingTransport::disconnect`]; an I/O error never changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connected,
}

/// Immutable configuration captured at transport construction.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// The single fixed remote peer (the gateway's SIP server).
    pub remote: std::net::SocketAddr,
    /// The locally bound address the socket was given.
    pub local: std::net::SocketAddr,
    /// Log every outgoing message before transmission.
    pub trace_sip: bool,
}

/// Capability interface the dialog engine consumes.
///
/// Supplied at engine construction together with a contact provider,
/// replacing the inheritance-based extension the transport grew out of.
#[async_trait]
pub trait SignalingTransport: Send + Sync + 'static {
    /// Attaches the inbound listener and transitions to `Connected`.
    ///
    /// Not idempotent: calling twice attaches a second listener. Callers
    /// own the obligation to call exactly once per lifecycle.
    async fn connect(&self) -> Result<()>;

    /// Removes all inbound listeners. The socket stays open; it belongs to
    /// the agent that created it and is closed on full shutdown.
    async fn disconnect(&self);

    /// Writes one complete datagram to the fixed peer.
    async fn send(&self, message: &str) -> Result<()>;

    /// Reflects the current lifecycle state; upper layers gate sends on it.
    fn is_connected(&self) -> bool;

    /// State-change notifications for the engine.
    fn state_changes(&self) -> watch::Receiver<TransportState>;
}

/// Receives each inbound datagram, one at a time, in arrival order.
///
/// The transport awaits the handler before reading the next datagram, so a
/// handler that processes to completion preserves per-peer ordering as
/// observed by the engine.
#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    async fn on_datagram(&self, payload: Bytes);
}

/// Engine-side inbound paths the sanity guard forwards into.
#[async_trait]
pub trait EngineSink: Send + Sync + 'static {
    async fn on_request(&self, request: Request);
    async fn on_response(&self, response: Response);
}

/// SIP transport bound to a single UDP peer.
///
/// The socket is bound (and connected to the peer) by the agent before the
/// transport is constructed, so no intermediate "connecting" state is ever
/// observable.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    config: TransportConfig,
    handler: Arc<dyn InboundHandler>,
    trace: Arc<dyn TransportTrace>,
    state_tx: watch::Sender<TransportState>,
    // Held to keep the watch channel's receiver count above zero, so state
    // sends are never dropped before an engine subscribes via state_changes().
    _state_rx: watch::Receiver<TransportState>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl UdpTransport {
    /// Creates the transport over an already-bound, already-connected socket.
    pub fn new(
        socket: Arc<UdpSocket>,
        config: TransportConfig,
        handler: Arc<dyn InboundHandler>,
        trace: Arc<dyn TransportTrace>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(TransportState::Disconnected);
        Self {
            socket,
            config,
            handler,
            trace,
            state_tx,
            _state_rx: state_rx,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Returns the immutable transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn spawn_listener(&self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let handler = Arc::clone(&self.handler);
        let trace = Arc::clone(&self.trace);
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv(&mut buf).await {
                    Ok(n) => {
                        trace.on_datagram_received(n);
                        let payload = Bytes::copy_from_slice(&buf[..n]);
                        // Serialized: the next datagram is not read until
                        // this one has been fully processed.
                        handler.on_datagram(payload).await;
                    }
                    Err(e) => {
                        tracing::warn!(%e, "udp recv error");
                        trace.on_error("recv");
                    }
                }
            }
        })
    }
}

#[async_trait]
impl SignalingTransport for UdpTransport {
    async fn connect(&self) -> Result<()> {
        let listener = self.spawn_listener();
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .push(listener);
        let _ = self.state_tx.send(TransportState::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        let mut listeners = self
            .listeners
            .lock()
            .expect("listener registry poisoned");
        for listener in listeners.drain(..) {
            listener.abort();
        }
        drop(listeners);
        let _ = self.state_tx.send(TransportState::Disconnected);
    }

    async fn send(&self, message: &str) -> Result<()> {
        if self.config.trace_sip {
            tracing::debug!(remote = %self.config.remote, "sending UDP message:\n{message}");
        }
        let sent = self
            .socket
            .send(message.as_bytes())
            .await
            .with_context(|| format!("udp send to {} failed", self.config.remote))?;
        self.trace.on_datagram_sent(sent);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.state_tx.borrow() == TransportState::Connected
    }

    fn state_changes(&self) -> watch::Receiver<TransportState> {
        self.state_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHandler;

    #[async_trait]
    impl InboundHandler for NullHandler {
        async fn on_datagram(&self, _payload: Bytes) {}
    }

    async fn paired_transport() -> (UdpTransport, UdpSocket) {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.connect(peer.local_addr().unwrap()).await.unwrap();

        let config = TransportConfig {
            remote: peer.local_addr().unwrap(),
            local: socket.local_addr().unwrap(),
            trace_sip: false,
        };
        let transport = UdpTransport::new(
            Arc::new(socket),
            config,
            Arc::new(NullHandler),
            sky_observe::noop_sink(),
        );
        (transport, peer)
    }

    #[tokio::test]
    async fn starts_disconnected_and_tracks_lifecycle() {
        let (transport, _peer) = paired_transport().await;
        assert!(!transport.is_connected());

        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        transport.disconnect().await;
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn state_changes_are_observable() {
        let (transport, _peer) = paired_transport().await;
        let mut rx = transport.state_changes();
        assert_eq!(*rx.borrow(), TransportState::Disconnected);

        transport.connect().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), TransportState::Connected);
    }

    #[tokio::test]
    async fn send_reaches_the_fixed_peer() {
        let (transport, peer) = paired_transport().await;
        transport.connect().await.unwrap();
        transport.send("OPTIONS sip:gw SIP/2.0\r\n\r\n").await.unwrap();

        let mut buf = [0u8; 256];
        let (n, _) = peer.recv_from(&mut buf).await.unwrap();
        assert!(std::str::from_utf8(&buf[..n]).unwrap().starts_with("OPTIONS"));
    }
}
