use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sky_transport::{InboundHandler, SignalingTransport, TransportConfig, UdpTransport};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

struct ChannelHandler {
    tx: mpsc::Sender<Bytes>,
}

#[async_trait]
impl InboundHandler for ChannelHandler {
    async fn on_datagram(&self, payload: Bytes) {
        let _ = self.tx.send(payload).await;
    }
}

async fn build_pair() -> (Arc<UdpTransport>, UdpSocket, mpsc::Receiver<Bytes>) {
    let peer = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind local");
    socket
        .connect(peer.local_addr().unwrap())
        .await
        .expect("connect");
    peer.connect(socket.local_addr().unwrap())
        .await
        .expect("peer connect");

    let (tx, rx) = mpsc::channel(16);
    let config = TransportConfig {
        remote: peer.local_addr().unwrap(),
        local: socket.local_addr().unwrap(),
        trace_sip: false,
    };
    let transport = Arc::new(UdpTransport::new(
        Arc::new(socket),
        config,
        Arc::new(ChannelHandler { tx }),
        sky_observe::noop_sink(),
    ));
    (transport, peer, rx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn inbound_datagrams_reach_the_handler_after_connect() {
    let (transport, peer, mut rx) = build_pair().await;
    transport.connect().await.expect("connect");

    let payload = b"NOTIFY sip:guest@gateway.lan SIP/2.0\r\n\r\n";
    peer.send(payload).await.expect("peer send");

    let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("recv timeout")
        .expect("recv");
    assert_eq!(received.as_ref(), payload);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn inbound_order_is_preserved() {
    let (transport, peer, mut rx) = build_pair().await;
    transport.connect().await.expect("connect");

    for i in 0..5u8 {
        peer.send(format!("MESSAGE {i}").as_bytes())
            .await
            .expect("peer send");
    }

    for i in 0..5u8 {
        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("recv timeout")
            .expect("recv");
        assert_eq!(received.as_ref(), format!("MESSAGE {i}").as_bytes());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disconnect_detaches_the_listener_without_closing_the_socket() {
    let (transport, peer, mut rx) = build_pair().await;
    transport.connect().await.expect("connect");
    transport.disconnect().await;

    peer.send(b"late datagram").await.expect("peer send");
    let outcome = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(outcome.is_err(), "no delivery after disconnect");

    // The socket itself still belongs to the agent and keeps working.
    transport.send("still sendable").await.expect("send");
    let mut buf = [0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(2), peer.recv(&mut buf))
        .await
        .expect("recv timeout")
        .expect("recv");
    assert_eq!(&buf[..n], b"still sendable");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_sends_emit_complete_datagrams() {
    let (transport, peer, _rx) = build_pair().await;
    transport.connect().await.expect("connect");

    let mut tasks = Vec::new();
    for i in 0..8u8 {
        let transport = Arc::clone(&transport);
        tasks.push(tokio::spawn(async move {
            transport
                .send(&format!("REGISTER payload {i}"))
                .await
                .expect("send");
        }));
    }
    for task in tasks {
        task.await.expect("join");
    }

    let mut seen = Vec::new();
    let mut buf = [0u8; 128];
    for _ in 0..8 {
        let n = tokio::time::timeout(Duration::from_secs(2), peer.recv(&mut buf))
            .await
            .expect("recv timeout")
            .expect("recv");
        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
        assert!(text.starts_with("REGISTER payload "), "mangled datagram: {text}");
        seen.push(text);
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 8, "each send is an independent datagram");
}
