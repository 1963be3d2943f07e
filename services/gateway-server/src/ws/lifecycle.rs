//! Connection lifecycle (C9): handshake, registration, and the per-socket
//! read loop. Grounded on the teacher's `ws_forwarder::handle_socket` split
//! pattern (separate reader/writer halves joined by a channel), adapted from
//! a header-carried timer token to this protocol's `?token=` query param —
//! browsers cannot set a custom `Authorization` header on a WebSocket
//! handshake (spec.md §6).

use crate::state::AppState;
use crate::ws::dispatch::route_frame;
use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use gateway_core::auth::verify_token;
use gateway_core::sessions::Session;
use gateway_core::sink::SocketSink;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    token: Option<String>,
}

/// What the writer task actually pushes onto the wire: either a text frame
/// or a close frame. Close always ends the writer loop.
enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// axum's own `max_frame_size`/`max_message_size` are set to this, a
/// generous hard ceiling independent of the configured application-level
/// limit — it exists only to bound memory, never to produce the spec's
/// `1009` close itself. The actual `frame_size_limit_bytes` check happens
/// once a frame has been fully read, so the close code we send back is
/// always the one spec.md §6 names rather than whatever tungstenite's
/// capacity error happens to look like.
const HARD_FRAME_CEILING_BYTES: usize = 16 * 1024 * 1024;

struct ChannelSink {
    tx: mpsc::Sender<Outbound>,
}

#[async_trait]
impl SocketSink for ChannelSink {
    async fn send_text(&self, json: String) -> bool {
        self.tx.send(Outbound::Text(json)).await.is_ok()
    }

    async fn close(&self, code: u16, reason: &str) {
        let _ = self
            .tx
            .send(Outbound::Close {
                code,
                reason: reason.to_owned(),
            })
            .await;
    }
}

pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
) -> Response {
    let claims = query
        .token
        .as_deref()
        .and_then(|token| verify_token(&state.config.jwt_secret, token));

    let Some(claims) = claims else {
        warn!("rejecting handshake: missing or invalid token");
        return (StatusCode::UNAUTHORIZED, "invalid or missing token").into_response();
    };

    ws.max_frame_size(HARD_FRAME_CEILING_BYTES)
        .max_message_size(HARD_FRAME_CEILING_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state, claims.user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Outbound>(64);

    let displaced = state
        .sessions
        .register(Session {
            user_id: user_id.clone(),
            sink: Arc::new(ChannelSink { tx: tx.clone() }),
            opened_at: Utc::now(),
        })
        .await;
    if let Some(displaced) = displaced {
        info!(user_id = %user_id, "replacing an existing session for this user");
        displaced.sink.close(1000, "replaced by a new connection").await;
    }
    state.presence.register(&user_id, &state.config.pod_name).await;
    info!(user_id = %user_id, "connection opened");

    let writer = tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            match item {
                Outbound::Text(json) => {
                    if ws_sink.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close { code, reason } => {
                    let _ = ws_sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    loop {
        match ws_stream.next().await {
            Some(Ok(Message::Text(text))) => {
                if text.len() > state.config.frame_size_limit_bytes {
                    warn!(user_id = %user_id, len = text.len(), "closing connection: frame exceeds size limit");
                    let _ = tx
                        .send(Outbound::Close {
                            code: 1009,
                            reason: "frame too large".to_owned(),
                        })
                        .await;
                    break;
                }
                route_frame(&state, &user_id, text.as_str()).await;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Binary(_))) => {
                warn!(user_id = %user_id, "closing connection: binary frames are not supported by this protocol");
                let _ = tx
                    .send(Outbound::Close {
                        code: 1008,
                        reason: "binary frames unsupported".to_owned(),
                    })
                    .await;
                break;
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(err)) => {
                warn!(user_id = %user_id, error = %err, "closing connection after read error");
                let _ = tx
                    .send(Outbound::Close {
                        code: 1011,
                        reason: "internal error".to_owned(),
                    })
                    .await;
                break;
            }
        }
    }

    drop(tx);
    let _ = writer.await;
    state.sessions.unregister(&user_id).await;
    state.presence.unregister(&user_id).await;
    info!(user_id = %user_id, "connection closed");
}
