//! The narrow "outbound sink" abstractions from spec.md §9.
//!
//! Two layers:
//! - [`SocketSink`] is bound to one already-open client socket; it only
//!   knows how to write JSON text to that one connection.
//! - [`OutboundSink`] is the capability injected into both C7 (signaling)
//!   and C8 (the delivery router): "send this to a receiver, local-or-relay,
//!   I don't care which." The delivery router implements it; the signaling
//!   engine only depends on the trait, breaking the cyclic dependency the
//!   source has between those two components.

use async_trait::async_trait;
use gateway_protocol::{Envelope, SignalForward};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Queued,
    Dropped,
}

/// Something that can be handed to a receiver's socket, wherever it lives.
#[derive(Debug, Clone)]
pub enum Deliverable {
    Chat(Envelope),
    Signal(SignalForward),
}

impl Deliverable {
    #[must_use]
    pub fn receiver_id(&self) -> &str {
        match self {
            Deliverable::Chat(envelope) => &envelope.receiver_id,
            Deliverable::Signal(forward) => &forward.to,
        }
    }

    /// # Panics
    /// Never, in practice: both variants are plain serde structs with no
    /// types that can fail to serialize (no maps with non-string keys,
    /// no floats).
    #[must_use]
    pub fn to_json(&self) -> String {
        match self {
            Deliverable::Chat(envelope) => {
                serde_json::to_string(envelope).expect("envelope always serializes")
            }
            Deliverable::Signal(forward) => {
                serde_json::to_string(forward).expect("signal forward always serializes")
            }
        }
    }

    /// Same content as [`Deliverable::to_json`], as a `serde_json::Value` —
    /// used when building a [`gateway_protocol::RelayPayload`], which wants a
    /// `Value` rather than a pre-serialized string.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Deliverable::Chat(envelope) => {
                serde_json::to_value(envelope).expect("envelope always serializes")
            }
            Deliverable::Signal(forward) => {
                serde_json::to_value(forward).expect("signal forward always serializes")
            }
        }
    }

    #[must_use]
    pub fn sender_id(&self) -> &str {
        match self {
            Deliverable::Chat(envelope) => &envelope.sender_id,
            Deliverable::Signal(forward) => &forward.from,
        }
    }
}

#[async_trait]
pub trait SocketSink: Send + Sync {
    /// Writes `json` to this socket. Returns `false` if the write failed
    /// (closed socket, transport error) — callers treat that as the session
    /// being gone, they do not retry.
    async fn send_text(&self, json: String) -> bool;

    /// Closes this socket with a WebSocket close code and reason (spec.md
    /// §3/§6: `1000`/`1008`/`1009`/`1011` etc.). Default no-op — test doubles
    /// with no real transport behind them have nothing to close.
    async fn close(&self, _code: u16, _reason: &str) {}
}

#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn send(&self, deliverable: Deliverable) -> DeliveryOutcome;
}
