//! Local session table (C2): in-memory `{user -> open socket}` map on this
//! pod. Grounded on `services/server/src/state.rs`'s
//! `ReceiverSessionRegistry` / `register_forwarder` shape.

use crate::sink::SocketSink;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A single local session. Cheaply cloneable — `sink` is an `Arc`.
#[derive(Clone)]
pub struct Session {
    pub user_id: String,
    pub sink: Arc<dyn SocketSink>,
    pub opened_at: DateTime<Utc>,
}

/// Concurrent map keyed by user ID (spec.md §3 invariant: at most one
/// session per user on a given pod).
#[derive(Clone, Default)]
pub struct SessionTable {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session, replacing any existing one for the same user.
    /// Returns the displaced session, if any — the caller is responsible
    /// for calling [`SocketSink::close`] on it (spec.md §3: "the older
    /// session is closed and replaced").
    pub async fn register(&self, session: Session) -> Option<Session> {
        self.sessions
            .write()
            .await
            .insert(session.user_id.clone(), session)
    }

    pub async fn unregister(&self, user_id: &str) {
        self.sessions.write().await.remove(user_id);
    }

    pub async fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.read().await.get(user_id).cloned()
    }

    pub async fn is_local(&self, user_id: &str) -> bool {
        self.sessions.read().await.contains_key(user_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Writes `json` to the receiver's local socket if present. Returns
    /// `None` when the receiver has no local session at all.
    pub async fn send_local(&self, user_id: &str, json: String) -> Option<bool> {
        let session = self.get(user_id).await?;
        Some(session.sink.send_text(json).await)
    }

    /// O(n) reverse lookup used only on disconnect (spec.md §4.9).
    pub async fn user_for_sink(&self, predicate: impl Fn(&Session) -> bool) -> Option<String> {
        self.sessions
            .read()
            .await
            .values()
            .find(|s| predicate(s))
            .map(|s| s.user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct RecordingSink {
        received: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                received: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SocketSink for RecordingSink {
        async fn send_text(&self, json: String) -> bool {
            self.received.lock().await.push(json);
            true
        }
    }

    #[tokio::test]
    async fn register_replaces_existing_session_for_same_user() {
        let table = SessionTable::new();
        let first = Session {
            user_id: "u1".to_owned(),
            sink: Arc::new(RecordingSink::new()),
            opened_at: Utc::now(),
        };
        let second = Session {
            user_id: "u1".to_owned(),
            sink: Arc::new(RecordingSink::new()),
            opened_at: Utc::now(),
        };

        assert!(table.register(first).await.is_none());
        let displaced = table.register(second).await;
        assert!(displaced.is_some());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn send_local_delivers_to_registered_session_only() {
        let table = SessionTable::new();
        let sink = Arc::new(RecordingSink::new());
        table
            .register(Session {
                user_id: "u1".to_owned(),
                sink: sink.clone(),
                opened_at: Utc::now(),
            })
            .await;

        let outcome = table.send_local("u1", "{\"hello\":true}".to_owned()).await;
        assert_eq!(outcome, Some(true));
        assert_eq!(sink.received.lock().await.as_slice(), ["{\"hello\":true}"]);

        assert_eq!(table.send_local("u2", "{}".to_owned()).await, None);
    }

    #[tokio::test]
    async fn unregister_removes_session() {
        let table = SessionTable::new();
        table
            .register(Session {
                user_id: "u1".to_owned(),
                sink: Arc::new(RecordingSink::new()),
                opened_at: Utc::now(),
            })
            .await;
        assert!(table.is_local("u1").await);
        table.unregister("u1").await;
        assert!(!table.is_local("u1").await);
    }
}
