//! Inbound dispatcher (C10): classifies and routes one parsed text frame
//! (spec.md §4.2). Grounded on the teacher's `WsMessage` tagged-enum match
//! in `ws_forwarder.rs`, adapted to this protocol's discriminate-by-field-
//! presence shape (`gateway-protocol`'s doc comment explains why there is no
//! shared `kind` tag here).

use crate::state::AppState;
use gateway_protocol::{ChatFrame, Pong, SignalFrame};
use gateway_core::signaling::IncomingSignal;
use tracing::warn;

/// Parses and routes one inbound text frame. Never closes the socket —
/// unparseable JSON and missing sender/receiver are logged and dropped
/// (spec.md §7); the only thing that closes a connection is frame size,
/// enforced by the transport before this function ever runs.
pub async fn route_frame(state: &AppState, user_id: &str, text: &str) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(err) => {
            warn!(user_id, error = %err, "dropping frame: not valid JSON");
            return;
        }
    };

    if value.get("type").and_then(|t| t.as_str()) == Some("ping") {
        let pong = serde_json::to_string(&Pong::new()).expect("pong always serializes");
        let _ = state.sessions.send_local(user_id, pong).await;
        return;
    }

    if value.get("signal").is_some() {
        route_signal(state, value, text).await;
        return;
    }

    route_chat(state, value, text).await;
}

/// Awaited inline, like `route_chat`: the reader loop processes one frame
/// at a time, so this is what keeps ICE candidates (and any other signal
/// sequence) on one call session forwarded in arrival order (spec.md §5) —
/// spawning a task per signal would let the runtime reorder concurrent
/// writers racing for the call registry's lock.
async fn route_signal(state: &AppState, _value: serde_json::Value, text: &str) {
    let frame: SignalFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(err) => {
            warn!(error = %err, "dropping call-signal frame: malformed");
            return;
        }
    };
    if frame.from.is_empty() || frame.to.is_empty() {
        warn!("dropping call-signal frame: missing from/to");
        return;
    }

    let signal = IncomingSignal {
        signal: frame.signal,
        from: frame.from,
        to: frame.to,
        session_id: frame.session_id,
        call_type: frame.call_type,
        payload: frame.payload,
        new_participant: frame.new_participant,
        remove_participant: frame.user_id,
    };
    state.calls.handle(signal).await;
}

async fn route_chat(state: &AppState, _value: serde_json::Value, text: &str) {
    let frame: ChatFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(err) => {
            warn!(error = %err, "dropping chat frame: malformed");
            return;
        }
    };
    if frame.sender_id.is_empty() || frame.receiver_id.is_empty() {
        warn!("dropping chat frame: missing sender or receiver");
        return;
    }

    let outcome = state.router.route(frame).await;
    tracing::debug!(?outcome, "chat frame routed");
}
