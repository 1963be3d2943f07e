//! `POST /v1/websocket/send-message`: out-of-band send that bypasses the
//! WebSocket dispatcher, used by other services to push a chat message
//! without holding a socket themselves (spec.md §4.3, §6).
//!
//! Unlike the WebSocket path, an offline receiver is a hard 404 here rather
//! than a store-and-notify — the asymmetry is intentional (spec.md §9).

use crate::http::authenticate;
use crate::http::response::{conflict, not_found, unauthorized, HttpResult};
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use gateway_core::sink::DeliveryOutcome;
use gateway_protocol::{Envelope, MessageType, SendMessageResponse};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub receiver_id: String,
    pub message_id: String,
    #[serde(default)]
    pub actual_message: String,
    #[serde(default)]
    pub files: HashMap<String, String>,
    pub timestamp: i64,
}

pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SendMessageRequest>,
) -> HttpResult<Json<SendMessageResponse>> {
    if authenticate(&state, &headers).is_none() {
        return Err(unauthorized("missing or invalid bearer token"));
    }

    let online = state.sessions.is_local(&request.receiver_id).await || state.presence.has(&request.receiver_id).await;
    if !online {
        return Err(not_found("receiver is not connected"));
    }

    let message_type = if !request.files.is_empty() && request.actual_message.is_empty() {
        MessageType::FileNotification
    } else {
        MessageType::Chat
    };

    let envelope = Envelope {
        sender_id: request.sender_id,
        sender_mobile: None,
        sender_display_name: None,
        receiver_id: request.receiver_id,
        message_id: request.message_id,
        payload_text: request.actual_message,
        files: request.files,
        message_type,
        delivered: false,
        delivered_at: None,
        read: false,
        timestamp: request.timestamp,
    };

    match state.router.route_http(envelope).await {
        DeliveryOutcome::Delivered => Ok(Json(SendMessageResponse {
            status: "delivered".to_owned(),
        })),
        DeliveryOutcome::Queued => Ok(Json(SendMessageResponse {
            status: "relayed".to_owned(),
        })),
        DeliveryOutcome::Dropped => Err(conflict("delivery failed")),
    }
}
