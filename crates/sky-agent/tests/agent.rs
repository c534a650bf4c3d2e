use std::sync::Arc;
use std::time::Duration;

use sky_agent::{DecodedEvent, GatewayAgent, GatewayOptions};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

async fn fake_gateway() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind gateway");
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

async fn recv_text(socket: &UdpSocket) -> (String, std::net::SocketAddr) {
    let mut buf = vec![0u8; 65_535];
    let (n, from) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("recv timeout")
        .expect("recv");
    (String::from_utf8_lossy(&buf[..n]).into_owned(), from)
}

fn options(port: u16) -> GatewayOptions {
    let mut options = GatewayOptions::new("127.0.0.1", "guest");
    options.port = port;
    options
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_registers_with_the_concrete_contact() {
    let (gateway, port) = fake_gateway().await;
    let agent = GatewayAgent::connect(options(port), Box::new(|_| {}), sky_observe::noop_sink())
        .await
        .expect("agent");

    agent.start().await.expect("start");
    assert!(agent.is_connected());

    let (text, _) = recv_text(&gateway).await;
    assert!(text.starts_with("REGISTER sip:127.0.0.1 SIP/2.0\r\n"), "{text}");
    assert!(text.contains("From: <sip:guest@127.0.0.1>;tag="));
    assert!(text.contains(&format!("Call-ID: {}", agent.session_prefix())));
    assert!(text.contains("Expires: 600\r\n"));
    // Register mode claims the genuine address, never a GRUU.
    assert!(text.contains(&format!(
        "Contact: <sip:{}@127.0.0.1:{};transport=udp>",
        agent.contact().token(),
        agent.via_port()
    )));

    agent.stop().await;
    assert!(!agent.is_connected());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscribe_names_the_event_package() {
    let (gateway, port) = fake_gateway().await;
    let agent = GatewayAgent::connect(options(port), Box::new(|_| {}), sky_observe::noop_sink())
        .await
        .expect("agent");
    agent.start().await.expect("start");
    let _ = recv_text(&gateway).await; // REGISTER

    agent.subscribe("battery").await.expect("subscribe");
    let (text, _) = recv_text(&gateway).await;
    assert!(text.starts_with("SUBSCRIBE sip:guest@127.0.0.1 SIP/2.0\r\n"), "{text}");
    assert!(text.contains("Event: battery\r\n"));
    assert!(text.contains("Accept: application/xml\r\n"));
    assert!(text.contains("Expires: 3600\r\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn message_carries_the_sms_body() {
    let (gateway, port) = fake_gateway().await;
    let agent = GatewayAgent::connect(options(port), Box::new(|_| {}), sky_observe::noop_sink())
        .await
        .expect("agent");
    agent.start().await.expect("start");
    let _ = recv_text(&gateway).await; // REGISTER

    agent
        .send_message("0015551234", "hello from orbit")
        .await
        .expect("send sms");
    let (text, _) = recv_text(&gateway).await;
    assert!(text.starts_with("MESSAGE sip:0015551234@127.0.0.1 SIP/2.0\r\n"), "{text}");
    assert!(text.contains("Content-Type: text/plain\r\n"));
    assert!(text.contains("Content-Length: 16\r\n"));
    assert!(text.ends_with("\r\n\r\nhello from orbit"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn notify_is_acknowledged_and_decoded() {
    let (gateway, port) = fake_gateway().await;
    let (tx, mut rx) = mpsc::channel::<DecodedEvent>(4);
    let handler = Box::new(move |event: DecodedEvent| {
        let _ = tx.try_send(event);
    });

    let agent = GatewayAgent::connect(options(port), handler, sky_observe::noop_sink())
        .await
        .expect("agent");
    agent.start().await.expect("start");
    let (_, agent_addr) = recv_text(&gateway).await; // REGISTER

    let notify = format!(
        "NOTIFY sip:guest@127.0.0.1:{agent_port} SIP/2.0\r\n\
Via: SIP/2.0/UDP 127.0.0.1:{gw_port};branch=z9hG4bKsrv1\r\n\
From: <sip:127.0.0.1>;tag=srv\r\n\
To: <sip:guest@127.0.0.1>\r\n\
Call-ID: device-42@127.0.0.1\r\n\
CSeq: 1 NOTIFY\r\n\
Event: battery\r\n\
Content-Type: application/xml\r\n\
Content-Length: 121\r\n\r\n\
<battery><capacity>83</capacity><temperature>21.5</temperature><present>true</present><charging>true</charging></battery>",
        agent_port = agent_addr.port(),
        gw_port = port,
    );
    gateway
        .send_to(notify.as_bytes(), agent_addr)
        .await
        .expect("send notify");

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event timeout")
        .expect("event");
    assert_eq!(event.line, "Battery: 83%, charging, at 21.5\u{b0}C");

    let (ack, _) = recv_text(&gateway).await;
    assert!(ack.starts_with("SIP/2.0 200 OK\r\n"), "{ack}");
    assert!(ack.contains("Call-ID: device-42@127.0.0.1\r\n"));
    assert!(ack.contains("CSeq: 1 NOTIFY\r\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn own_echoed_request_draws_a_482() {
    let (gateway, port) = fake_gateway().await;
    let agent = GatewayAgent::connect(options(port), Box::new(|_| {}), sky_observe::noop_sink())
        .await
        .expect("agent");
    agent.start().await.expect("start");
    let (register, agent_addr) = recv_text(&gateway).await;

    // Reflect the agent's own REGISTER back at it, as a broadcast-looped
    // datagram would.
    gateway
        .send_to(register.as_bytes(), agent_addr)
        .await
        .expect("reflect");

    let (reply, _) = recv_text(&gateway).await;
    assert!(reply.starts_with("SIP/2.0 482 Loop Detected\r\n"), "{reply}");
    assert!(reply.contains(&format!("Call-ID: {}", agent.session_prefix())));
}
