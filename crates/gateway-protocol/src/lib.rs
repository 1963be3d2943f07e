//! gateway-protocol: wire types for the cross-pod messaging gateway.
//!
//! WebSocket frames are plain JSON objects; unlike a single internally-tagged
//! enum, inbound frames are discriminated by the *presence* of a field
//! (`signal` for call-signaling, absence of it for chat) rather than by a
//! shared `kind` tag — see [`SignalFrame`] and [`ChatFrame`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Inbound: heartbeat
// ---------------------------------------------------------------------------

/// `{"type":"ping"}` — answered locally with `{"type":"pong"}`, never forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    #[serde(rename = "type")]
    pub kind: String,
}

/// `{"type":"pong"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Pong {
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: "pong".to_owned(),
        }
    }
}

impl Default for Pong {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Inbound: call signaling
// ---------------------------------------------------------------------------

/// The call-signal discriminator. Arrives as the `signal` field of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    CallOffer,
    CallRinging,
    CallAnswer,
    CallConnected,
    CallRenegotiate,
    CallReject,
    CallEnd,
    CallBusy,
    CallTimeout,
    CallParticipantAdd,
    CallParticipantRemove,
    IceCandidate,
}

impl SignalKind {
    /// Terminal signals schedule the call session for removal after 5s.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SignalKind::CallReject
                | SignalKind::CallEnd
                | SignalKind::CallBusy
                | SignalKind::CallTimeout
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Audio,
    Video,
}

/// `{"signal":"CALL_OFFER","from":"...","to":"...","sessionId":"...","callType":"audio","payload":{...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalFrame {
    pub signal: SignalKind,
    pub from: String,
    pub to: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<CallType>,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Present on `CALL_PARTICIPANT_ADD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_participant: Option<String>,
    /// Present on `CALL_PARTICIPANT_REMOVE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// The envelope forwarded to the `to` participant for every non-terminal
/// (and terminal, before removal) signaling transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalForward {
    pub signal: SignalKind,
    pub from: String,
    pub to: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<CallType>,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renegotiate: Option<bool>,
}

// ---------------------------------------------------------------------------
// Inbound: chat
// ---------------------------------------------------------------------------

/// `{"senderId","receiverId","messageId","actualMessage","sampleMessage","files":{...},"timestamp"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFrame {
    pub sender_id: String,
    pub receiver_id: String,
    pub message_id: String,
    #[serde(default)]
    pub actual_message: String,
    #[serde(default)]
    pub sample_message: String,
    #[serde(default)]
    pub files: HashMap<String, String>,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Outbound envelope (chat and file notifications)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    Chat,
    FileNotification,
}

/// The serialized outbound JSON object handed to a client socket, relayed
/// between pods, or stored in the undelivered-message hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_display_name: Option<String>,
    pub receiver_id: String,
    pub message_id: String,
    #[serde(default)]
    pub payload_text: String,
    #[serde(default)]
    pub files: HashMap<String, String>,
    pub message_type: MessageType,
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    pub read: bool,
    pub timestamp: i64,
}

impl Envelope {
    /// A message with neither text nor files is invalid (spec.md §3).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload_text.is_empty() && self.files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Cross-pod relay payload (C3)
// ---------------------------------------------------------------------------

/// Published on the shared relay channel by the pod holding the sender's
/// socket; consumed by every other pod's relay subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPayload {
    pub from_user_id: String,
    pub target_user_id: String,
    /// Either a serialized [`Envelope`] or a raw forwarded signal/body.
    pub message: serde_json::Value,
}

// ---------------------------------------------------------------------------
// HTTP contracts
// ---------------------------------------------------------------------------

/// Frozen HTTP error envelope used by all non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// `GET /v1/websocket/user-status/{userId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatusResponse {
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
}

/// `POST /v1/websocket/send-message` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// `"delivered"` (local send) or `"relayed"` (cross-pod).
    pub status: String,
}

/// `GET /v1/messages/undelivered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndeliveredMessagesResponse {
    pub messages: Vec<Envelope>,
    pub total_count: usize,
    pub has_messages: bool,
}

/// `GET /v1/messages/undelivered/check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasMessagesResponse {
    pub has_messages: bool,
    pub receiver_id: String,
}
