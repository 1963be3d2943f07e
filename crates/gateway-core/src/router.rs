//! Delivery router (C8): local-vs-relay-vs-offline-store decision for every
//! outbound chat envelope, plus the shared [`OutboundSink`] implementation
//! that the call-signaling engine (C7) forwards through (spec.md §4.3, §9).
//!
//! [`OutboundSink::send`] only ever does the "local or relay" half of the
//! algorithm — it has no notion of offline storage. Offline store-and-notify
//! is specific to chat delivery and lives in [`DeliveryRouter::route`] and
//! [`DeliveryRouter::route_http`], which call `send` first and handle a
//! `Dropped` result (meaning: truly offline, no session anywhere) themselves.
//! This keeps the trait the narrow capability spec.md §9 calls for.

use crate::notify::NotificationPublisher;
use crate::presence::PresenceDirectory;
use crate::profile::ProfileCache;
use crate::relay::RelayBus;
use crate::sessions::SessionTable;
use crate::sink::{Deliverable, DeliveryOutcome, OutboundSink};
use crate::undelivered::UndeliveredStore;
use async_trait::async_trait;
use gateway_protocol::{ChatFrame, Envelope, MessageType, RelayPayload};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct DeliveryRouter {
    sessions: SessionTable,
    presence: PresenceDirectory,
    relay: RelayBus,
    undelivered: UndeliveredStore,
    notify: NotificationPublisher,
    profile: Arc<ProfileCache>,
    offline_messaging_enabled: bool,
    offline_message_storage_enabled: bool,
    offline_kafka_notifications_enabled: bool,
}

impl DeliveryRouter {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: SessionTable,
        presence: PresenceDirectory,
        relay: RelayBus,
        undelivered: UndeliveredStore,
        notify: NotificationPublisher,
        profile: Arc<ProfileCache>,
        offline_messaging_enabled: bool,
        offline_message_storage_enabled: bool,
        offline_kafka_notifications_enabled: bool,
    ) -> Self {
        Self {
            sessions,
            presence,
            relay,
            undelivered,
            notify,
            profile,
            offline_messaging_enabled,
            offline_message_storage_enabled,
            offline_kafka_notifications_enabled,
        }
    }

    /// The WebSocket-originated path: full algorithm, steps 1-4 of spec.md
    /// §4.3.
    pub async fn route(&self, frame: ChatFrame) -> DeliveryOutcome {
        // Step 1: enrich with sender profile. A load failure degrades
        // gracefully rather than dropping the message (REDESIGN FLAG,
        // SPEC_FULL.md §11) — the envelope is forwarded with the sender
        // fields left absent.
        let profile = self.profile.get(&frame.sender_id).await;
        if profile.is_none() {
            warn!(sender_id = %frame.sender_id, "sender profile unavailable, forwarding without enrichment");
        }

        // Step 2: legacy sample notification, independent of steps 3-4.
        if !frame.sample_message.is_empty() {
            self.notify
                .publish_sample(&frame.receiver_id, &frame.sample_message, &frame.message_id, &frame.sender_id)
                .await;
        }

        let message_type = if !frame.files.is_empty() && frame.actual_message.is_empty() {
            MessageType::FileNotification
        } else {
            MessageType::Chat
        };

        let envelope = Envelope {
            sender_id: frame.sender_id.clone(),
            sender_mobile: profile.as_ref().map(|p| p.mobile.clone()),
            sender_display_name: profile.as_ref().map(|p| p.display_name.clone()),
            receiver_id: frame.receiver_id.clone(),
            message_id: frame.message_id.clone(),
            payload_text: frame.actual_message.clone(),
            files: frame.files.clone(),
            message_type,
            delivered: false,
            delivered_at: None,
            read: false,
            timestamp: frame.timestamp,
        };

        // Step 3: neither text nor files present.
        if envelope.is_empty() {
            return DeliveryOutcome::Dropped;
        }

        let outcome = self.send(Deliverable::Chat(envelope)).await;
        if outcome != DeliveryOutcome::Dropped {
            return outcome;
        }

        // Neither local nor relayable: truly offline.
        if !self.offline_messaging_enabled {
            return DeliveryOutcome::Dropped;
        }

        if self.offline_message_storage_enabled {
            let stored_envelope = Envelope {
                sender_id: frame.sender_id.clone(),
                sender_mobile: None,
                sender_display_name: None,
                receiver_id: frame.receiver_id.clone(),
                message_id: frame.message_id.clone(),
                payload_text: frame.actual_message.clone(),
                files: frame.files.clone(),
                message_type,
                delivered: false,
                delivered_at: None,
                read: false,
                timestamp: frame.timestamp,
            };
            if let Err(err) = self.undelivered.store(&frame.receiver_id, &stored_envelope).await {
                warn!(receiver_id = %frame.receiver_id, error = %err, "failed to store undelivered message");
            }
        }
        if self.offline_kafka_notifications_enabled {
            self.notify
                .publish_offline(&frame.receiver_id, &frame, message_type, profile.as_ref().map(|p| p.mobile.as_str()))
                .await;
        }

        DeliveryOutcome::Queued
    }

    /// The HTTP-originated path (`POST /v1/websocket/send-message`): the
    /// caller supplies a pre-formed envelope, so steps 1-2 are skipped; the
    /// offline branch returns `Dropped` rather than storing (spec.md §4.3).
    /// `send` already returns `Dropped` in exactly that case, so no extra
    /// branching is needed here.
    pub async fn route_http(&self, envelope: Envelope) -> DeliveryOutcome {
        if envelope.is_empty() {
            return DeliveryOutcome::Dropped;
        }
        self.send(Deliverable::Chat(envelope)).await
    }
}

#[async_trait]
impl OutboundSink for DeliveryRouter {
    async fn send(&self, deliverable: Deliverable) -> DeliveryOutcome {
        let receiver_id = deliverable.receiver_id().to_owned();

        if self.sessions.is_local(&receiver_id).await {
            // A locally-delivered chat envelope is marked delivered before
            // it reaches the socket (spec.md §3/§8 scenario 1); relayed and
            // stored copies are left as the router built them.
            let local_deliverable = match deliverable {
                Deliverable::Chat(mut envelope) => {
                    envelope.delivered = true;
                    envelope.delivered_at = Some(chrono::Utc::now().timestamp_millis());
                    Deliverable::Chat(envelope)
                }
                signal => signal,
            };
            return match self.sessions.send_local(&receiver_id, local_deliverable.to_json()).await {
                Some(true) => DeliveryOutcome::Delivered,
                _ => DeliveryOutcome::Dropped,
            };
        }

        if self.presence.has(&receiver_id).await {
            let payload = RelayPayload {
                from_user_id: deliverable.sender_id().to_owned(),
                target_user_id: receiver_id,
                message: deliverable.to_value(),
            };
            self.relay.publish(&payload).await;
            return DeliveryOutcome::Queued;
        }

        DeliveryOutcome::Dropped
    }
}
