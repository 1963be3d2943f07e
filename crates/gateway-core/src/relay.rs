//! Cross-pod relay bus (C3): a pub/sub channel carrying delivery payloads
//! between pods. Publishing is used by the delivery router (C8); consuming
//! is a dedicated long-lived subscriber task per pod (spec.md §4.4, §5).

use crate::sessions::SessionTable;
use futures_util::StreamExt;
use gateway_protocol::RelayPayload;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_CHANNEL: &str = "websocket:messages";

#[derive(Clone)]
pub struct RelayBus {
    conn: ConnectionManager,
    client: redis::Client,
    channel: String,
    timeout: Duration,
}

impl RelayBus {
    #[must_use]
    pub fn new(conn: ConnectionManager, client: redis::Client, channel: impl Into<String>, timeout: Duration) -> Self {
        Self {
            conn,
            client,
            channel: channel.into(),
            timeout,
        }
    }

    pub async fn publish(&self, payload: &RelayPayload) {
        let Ok(json) = serde_json::to_string(payload) else {
            warn!("failed to serialize relay payload");
            return;
        };
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("PUBLISH");
        cmd.arg(&self.channel).arg(json);
        match tokio::time::timeout(self.timeout, cmd.query_async::<()>(&mut conn)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "relay publish failed"),
            Err(_) => warn!("relay publish timed out"),
        }
    }

    /// Subscribes to the relay channel and writes every payload targeting a
    /// locally-connected receiver directly to that socket. Payloads for
    /// receivers not local to this pod are dropped silently — another pod
    /// may or may not be holding that socket; there is no coordination
    /// (spec.md §4.4). This is the long-lived "dedicated subscriber worker"
    /// of spec.md §5.
    pub async fn run(self, sessions: SessionTable) {
        loop {
            match self.client.get_async_pubsub().await {
                Ok(mut pubsub) => {
                    if let Err(err) = pubsub.subscribe(&self.channel).await {
                        warn!(error = %err, "relay subscribe failed, retrying");
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                        continue;
                    }
                    info!(channel = %self.channel, "relay consumer subscribed");
                    let mut stream = pubsub.on_message();
                    while let Some(msg) = stream.next().await {
                        let payload: String = match msg.get_payload() {
                            Ok(p) => p,
                            Err(err) => {
                                warn!(error = %err, "relay message payload decode failed");
                                continue;
                            }
                        };
                        Self::deliver(&sessions, &payload).await;
                    }
                    warn!("relay subscription stream ended, reconnecting");
                }
                Err(err) => {
                    warn!(error = %err, "relay connection failed, retrying");
                }
            }
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
    }

    async fn deliver(sessions: &SessionTable, raw: &str) {
        let payload: RelayPayload = match serde_json::from_str(raw) {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "relay payload was not valid JSON, dropping");
                return;
            }
        };
        if !sessions.is_local(&payload.target_user_id).await {
            return;
        }
        let message_json = payload.message.to_string();
        let _ = sessions.send_local(&payload.target_user_id, message_json).await;
    }
}
