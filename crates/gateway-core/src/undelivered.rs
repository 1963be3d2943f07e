//! Undelivered message store (C5): per-receiver Redis hash with TTL and
//! one-time-delivery semantics (spec.md §3, §4.6).
//!
//! `fetch` sorts by envelope `timestamp` ascending rather than relying on
//! Redis hash field order, per spec.md §4.6's fallback-ordering rule.
//! Deserialization failures are logged and skipped per-entry so one bad
//! record never loses the rest of the receiver's mailbox.

use crate::error::CoreError;
use gateway_protocol::Envelope;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::warn;

fn undelivered_key(receiver_id: &str) -> String {
    format!("undelivered:{receiver_id}")
}

#[derive(Clone)]
pub struct UndeliveredStore {
    conn: ConnectionManager,
    ttl_seconds: i64,
    timeout: Duration,
}

impl UndeliveredStore {
    #[must_use]
    pub fn new(conn: ConnectionManager, ttl_seconds: i64, timeout: Duration) -> Self {
        Self { conn, ttl_seconds, timeout }
    }

    /// Requires a non-empty receiver and populated `messageId`. TTL is
    /// applied (not extended) on every store — activity refreshes the
    /// retention window.
    pub async fn store(&self, receiver_id: &str, envelope: &Envelope) -> Result<(), CoreError> {
        if receiver_id.is_empty() || envelope.message_id.is_empty() {
            warn!("undelivered store called with empty receiver or messageId, dropping");
            return Ok(());
        }
        let json = serde_json::to_string(envelope)?;
        let key = undelivered_key(receiver_id);
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HSET")
            .arg(&key)
            .arg(&envelope.message_id)
            .arg(&json)
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.ttl_seconds)
            .ignore();
        tokio::time::timeout(self.timeout, pipe.query_async::<()>(&mut conn))
            .await
            .map_err(|_| CoreError::Timeout(self.timeout))??;
        Ok(())
    }

    /// Returns all stored envelopes for `receiver_id`, ordered by
    /// `timestamp` ascending. Per-entry parse failures are logged and
    /// skipped.
    pub async fn fetch(&self, receiver_id: &str) -> Result<Vec<Envelope>, CoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HGETALL");
        cmd.arg(undelivered_key(receiver_id));
        let raw = tokio::time::timeout(
            self.timeout,
            cmd.query_async::<std::collections::HashMap<String, String>>(&mut conn),
        )
        .await
        .map_err(|_| CoreError::Timeout(self.timeout))??;

        let mut envelopes: Vec<Envelope> = raw
            .into_iter()
            .filter_map(|(message_id, json)| match serde_json::from_str::<Envelope>(&json) {
                Ok(envelope) => Some(envelope),
                Err(err) => {
                    warn!(receiver_id, message_id, error = %err, "skipping corrupt undelivered record");
                    None
                }
            })
            .collect();
        envelopes.sort_by_key(|e| e.timestamp);
        Ok(envelopes)
    }

    pub async fn delete_all(&self, receiver_id: &str) -> Result<(), CoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("DEL");
        cmd.arg(undelivered_key(receiver_id));
        tokio::time::timeout(self.timeout, cmd.query_async::<()>(&mut conn))
            .await
            .map_err(|_| CoreError::Timeout(self.timeout))??;
        Ok(())
    }

    pub async fn delete_one(&self, receiver_id: &str, message_id: &str) -> Result<(), CoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HDEL");
        cmd.arg(undelivered_key(receiver_id)).arg(message_id);
        tokio::time::timeout(self.timeout, cmd.query_async::<()>(&mut conn))
            .await
            .map_err(|_| CoreError::Timeout(self.timeout))??;
        Ok(())
    }

    pub async fn has(&self, receiver_id: &str) -> Result<bool, CoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(undelivered_key(receiver_id));
        let exists = tokio::time::timeout(self.timeout, cmd.query_async::<bool>(&mut conn))
            .await
            .map_err(|_| CoreError::Timeout(self.timeout))??;
        Ok(exists)
    }
}
