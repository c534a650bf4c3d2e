use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sky_core::{random_token, Headers, Request, Response, StatusLine};
use sky_events::{decode, DecodedEvent};
use sky_observe::TransportTrace;
use sky_parse::serialize_response;
use sky_transport::{EngineSink, InboundHandler, SanityGuard, Screened};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Callback invoked for each decoded notification.
pub type NotifyHandler = Box<dyn Fn(DecodedEvent) + Send + Sync>;

/// Inbound side of the agent: screens each datagram, acknowledges
/// notifications, and hands decoded events to the registered handler.
///
/// Replies go straight out the agent's socket rather than through the
/// transport facade; they are protocol-level reflexes, not engine sends.
pub struct InboundPump {
    guard: SanityGuard,
    socket: Arc<UdpSocket>,
    trace: Arc<dyn TransportTrace>,
    handler: NotifyHandler,
}

impl InboundPump {
    pub fn new(
        guard: SanityGuard,
        socket: Arc<UdpSocket>,
        trace: Arc<dyn TransportTrace>,
        handler: NotifyHandler,
    ) -> Self {
        Self {
            guard,
            socket,
            trace,
            handler,
        }
    }

    async fn send_reply(&self, reply: Response) {
        let bytes = serialize_response(&reply);
        match self.socket.send(&bytes).await {
            Ok(sent) => self.trace.on_datagram_sent(sent),
            Err(e) => {
                warn!(%e, code = reply.start.code, "failed to send stateless reply");
                self.trace.on_error("reply");
            }
        }
    }

    /// Builds the 200 OK acknowledging a NOTIFY, echoing its routing
    /// headers and tagging the To if the server left it bare.
    fn ack_for(request: &Request) -> Response {
        let mut headers = Headers::new();
        for name in ["Via", "From", "To", "Call-ID", "CSeq"] {
            for value in request.headers.get_all(name) {
                if name == "To" && !value.contains(";tag=") {
                    headers.push(name, format!("{};tag={}", value, random_token(8)).as_str());
                } else {
                    headers.push(name, value.clone());
                }
            }
        }
        Response::new(StatusLine::new(200, "OK"), headers, Bytes::new())
    }
}

#[async_trait]
impl InboundHandler for InboundPump {
    async fn on_datagram(&self, payload: Bytes) {
        match self.guard.screen(&payload) {
            Screened::Request(request) => self.on_request(request).await,
            Screened::Response(response) => self.on_response(response).await,
            Screened::Reply(reply) => self.send_reply(reply).await,
            Screened::Drop => {}
        }
    }
}

#[async_trait]
impl EngineSink for InboundPump {
    async fn on_request(&self, request: Request) {
        match request.start.method {
            sky_core::Method::Notify => {
                // Acknowledge before dispatch so the device can pace its
                // notifications against our replies.
                self.send_reply(Self::ack_for(&request)).await;
                let body = String::from_utf8_lossy(request.body.as_ref());
                let event = decode(&body);
                info!(
                    package = event.payload.package().unwrap_or("unrecognized"),
                    "notification"
                );
                (self.handler)(event);
            }
            ref method => {
                debug!(method = %method, "ignoring unsupported inbound request");
            }
        }
    }

    async fn on_response(&self, response: Response) {
        let cseq = response
            .headers
            .get("CSeq")
            .map(|v| v.as_str().to_owned())
            .unwrap_or_default();
        if response.is_success() {
            info!(code = response.code(), %cseq, "request accepted");
        } else {
            warn!(
                code = response.code(),
                reason = response.start.reason.as_str(),
                %cseq,
                "request rejected"
            );
        }
    }
}
