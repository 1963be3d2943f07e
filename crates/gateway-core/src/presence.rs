//! Presence directory (C1): shared `{user -> pod}` view across all pods.
//!
//! Key format is `presence:{userId}` (spec.md §3/§6), a plain Redis string
//! with no TTL — the persistent-until-unregister design is the authoritative
//! one (see DESIGN.md, Open Question 1). All operations are best-effort:
//! a temporary Redis outage must not close client sockets (spec.md §4.9), so
//! every failure here is logged and treated as "absent" rather than
//! propagated.
//!
//! NOTE: an earlier source mode bounded this entry with a one-hour TTL and
//! relied on the connection-lifecycle sweep (spec.md §4.1) to refresh it.
//! That mode is not implemented; the sweep is still safe to call (it is a
//! no-op against the persistent form).

use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::warn;

fn presence_key(user_id: &str) -> String {
    format!("presence:{user_id}")
}

#[derive(Clone)]
pub struct PresenceDirectory {
    conn: ConnectionManager,
    timeout: Duration,
}

impl PresenceDirectory {
    #[must_use]
    pub fn new(conn: ConnectionManager, timeout: Duration) -> Self {
        Self { conn, timeout }
    }

    pub async fn register(&self, user_id: &str, pod_name: &str) {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(presence_key(user_id)).arg(pod_name);
        match tokio::time::timeout(self.timeout, cmd.query_async::<()>(&mut conn)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(user_id, pod_name, error = %err, "presence directory register failed"),
            Err(_) => warn!(user_id, pod_name, "presence directory register timed out"),
        }
    }

    pub async fn unregister(&self, user_id: &str) {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("DEL");
        cmd.arg(presence_key(user_id));
        match tokio::time::timeout(self.timeout, cmd.query_async::<()>(&mut conn)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(user_id, error = %err, "presence directory unregister failed"),
            Err(_) => warn!(user_id, "presence directory unregister timed out"),
        }
    }

    /// A presence-directory outage (including a timeout) is treated as
    /// "absent", never propagated — a degraded store must not close client
    /// sockets (spec.md §4.9, §7).
    pub async fn lookup(&self, user_id: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(presence_key(user_id));
        match tokio::time::timeout(self.timeout, cmd.query_async::<Option<String>>(&mut conn)).await {
            Ok(Ok(pod)) => pod,
            Ok(Err(err)) => {
                warn!(user_id, error = %err, "presence directory lookup failed");
                None
            }
            Err(_) => {
                warn!(user_id, "presence directory lookup timed out");
                None
            }
        }
    }

    pub async fn has(&self, user_id: &str) -> bool {
        self.lookup(user_id).await.is_some()
    }

    /// Refreshes this pod's presence entries. With persistent (non-TTL)
    /// presence this is a no-op for already-registered users, but it must
    /// remain safe to call on a schedule (spec.md §4.1).
    pub async fn refresh(&self, user_id: &str, pod_name: &str) {
        self.register(user_id, pod_name).await;
    }
}
