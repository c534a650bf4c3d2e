// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observability sink for the gateway transport.
//!
//! The sink is an injected capability: the agent creates one at
//! construction and hands it to each component, so its lifetime is tied to
//! the agent rather than to the process. There is no global registry.

use std::sync::Arc;

/// Sink used by the transport and guard to emit observability events.
///
/// Implementations should treat `stage` as a low-cardinality identifier
/// (e.g. "recv", "send", "screen") and avoid propagating untrusted data
/// into metrics or logs.
pub trait TransportTrace: Send + Sync + 'static {
    fn on_datagram_received(&self, bytes: usize);
    fn on_datagram_sent(&self, bytes: usize);
    fn on_dropped(&self, stage: &str, reason: &str);
    fn on_error(&self, stage: &str);
}

/// Sink that discards every event.
#[derive(Debug, Default)]
pub struct NoopTrace;

impl TransportTrace for NoopTrace {
    fn on_datagram_received(&self, _bytes: usize) {}
    fn on_datagram_sent(&self, _bytes: usize) {}
    fn on_dropped(&self, _stage: &str, _reason: &str) {}
    fn on_error(&self, _stage: &str) {}
}

/// Sink that logs via `tracing`.
#[derive(Debug, Default)]
pub struct TracingTrace;

impl TransportTrace for TracingTrace {
    fn on_datagram_received(&self, bytes: usize) {
        tracing::debug!(bytes, "datagram received");
    }

    fn on_datagram_sent(&self, bytes: usize) {
        tracing::debug!(bytes, "datagram sent");
    }

    fn on_dropped(&self, stage: &str, reason: &str) {
        tracing::warn!(stage, reason, "message dropped");
    }

    fn on_error(&self, stage: &str) {
        tracing::warn!(stage, "transport error");
    }
}

/// Convenience constructor for the default tracing-backed sink.
pub fn tracing_sink() -> Arc<dyn TransportTrace> {
    Arc::new(TracingTrace)
}

/// Convenience constructor for a sink that discards everything.
pub fn noop_sink() -> Arc<dyn TransportTrace> {
    Arc::new(NoopTrace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinks_are_object_safe() {
        let sinks: Vec<Arc<dyn TransportTrace>> = vec![tracing_sink(), noop_sink()];
        for sink in sinks {
            sink.on_datagram_received(12);
            sink.on_datagram_sent(34);
            sink.on_dropped("screen", "missing-header");
            sink.on_error("send");
        }
    }
}
