//! Notification publisher (C6): durable-bus producer for "push this to
//! user" events (spec.md §4.7). Publisher failures are logged and never
//! propagated — storing a message succeeds even if the push bus is down.

use gateway_protocol::{ChatFrame, MessageType};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::warn;

pub const SAMPLE_TOPIC: &str = "sample-message-topic";
pub const OFFLINE_TOPIC: &str = "undelivered.notification.message";

/// One notification-kind identifier used for every offline-store
/// notification, per spec.md §4.7 ("a fixed notification-kind identifier").
pub const OFFLINE_NOTIFICATION_KIND: &str = "UNDELIVERED_MESSAGE";

#[derive(Clone)]
pub struct NotificationPublisher {
    producer: FutureProducer,
    channel: String,
    timeout: Duration,
}

impl NotificationPublisher {
    pub fn new(
        brokers: &str,
        channel: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;
        Ok(Self {
            producer,
            channel: channel.into(),
            timeout,
        })
    }

    /// Legacy in-app/OTP topic — unordered, no partition key.
    pub async fn publish_sample(&self, receiver_id: &str, sample_message: &str, message_id: &str, sender_id: &str) {
        let payload = serde_json::json!({
            "receiverId": receiver_id,
            "sampleMessage": sample_message,
            "messageId": message_id,
            "senderId": sender_id,
        })
        .to_string();
        self.send(SAMPLE_TOPIC, None, &payload).await;
    }

    /// Offline-notification topic, partitioned by receiver ID so all events
    /// for one receiver share a partition (spec.md §4.7). The map's field
    /// names follow spec.md §8 scenario 3's literal payload
    /// (`sampleMessage`, `messageId`, `senderId`) rather than just the
    /// looser "sender mobile / sender customer ID / actual text" prose.
    pub async fn publish_offline(
        &self,
        receiver_id: &str,
        frame: &ChatFrame,
        message_type: MessageType,
        sender_mobile: Option<&str>,
    ) {
        let customer_id: i64 = receiver_id.parse().unwrap_or(0);
        let mut map = serde_json::Map::new();
        map.insert("senderMobile".to_owned(), serde_json::json!(sender_mobile));
        map.insert("senderId".to_owned(), serde_json::json!(frame.sender_id));
        map.insert("messageId".to_owned(), serde_json::json!(frame.message_id));
        if !frame.sample_message.is_empty() {
            map.insert("sampleMessage".to_owned(), serde_json::json!(frame.sample_message));
        }
        match message_type {
            MessageType::Chat => {
                map.insert("actualMessage".to_owned(), serde_json::json!(frame.actual_message));
            }
            MessageType::FileNotification => {
                map.insert("actualMessage".to_owned(), serde_json::json!("sent a file"));
            }
        }

        let payload = serde_json::json!({
            "customerId": customer_id,
            "notificationKind": OFFLINE_NOTIFICATION_KIND,
            "channel": self.channel,
            "map": map,
        })
        .to_string();

        let key = format!("undelivered:{receiver_id}");
        self.send(OFFLINE_TOPIC, Some(key), &payload).await;
    }

    async fn send(&self, topic: &str, key: Option<String>, payload: &str) {
        let mut record = FutureRecord::to(topic).payload(payload);
        if let Some(ref key) = key {
            record = record.key(key);
        }
        match tokio::time::timeout(self.timeout, self.producer.send(record, Duration::from_secs(0))).await {
            Ok(Ok(_)) => {}
            Ok(Err((err, _msg))) => warn!(topic, error = %err, "notification publish failed"),
            Err(_) => warn!(topic, "notification publish timed out"),
        }
    }
}
