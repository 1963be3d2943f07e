//! Wires every gateway-core component into one shared, `Clone`-able state,
//! the same explicitly-constructed-service shape as the teacher's
//! `AppState` in `services/server/src/state.rs` (no static singletons, so
//! tests can build two independent pods in one process — spec.md §9).

use gateway_core::notify::NotificationPublisher;
use gateway_core::presence::PresenceDirectory;
use gateway_core::profile::{ProfileCache, ProfileLoader};
use gateway_core::relay::RelayBus;
use gateway_core::router::DeliveryRouter;
use gateway_core::sessions::SessionTable;
use gateway_core::signaling::CallRegistry;
use gateway_core::sink::OutboundSink;
use gateway_core::undelivered::UndeliveredStore;
use gateway_core::GatewayConfig;
use redis::aio::ConnectionManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub sessions: SessionTable,
    pub presence: PresenceDirectory,
    pub relay: RelayBus,
    pub router: DeliveryRouter,
    pub calls: CallRegistry,
    pub undelivered: UndeliveredStore,
}

impl AppState {
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let conn = ConnectionManager::new(redis_client.clone()).await?;

        let io_timeout = config.io_timeout();

        let sessions = SessionTable::new();
        let presence = PresenceDirectory::new(conn.clone(), io_timeout);
        let relay = RelayBus::new(conn.clone(), redis_client, gateway_core::relay::DEFAULT_CHANNEL, io_timeout);
        let undelivered = UndeliveredStore::new(conn, config.ttl_seconds(), io_timeout);
        let undelivered_for_handlers = undelivered.clone();

        let notify = NotificationPublisher::new(
            &config.kafka_brokers,
            config.offline_notification_channel.clone(),
            io_timeout,
        )?;

        let loader = ProfileLoader::new(config.profile_service_url.clone(), io_timeout);
        let profile = Arc::new(ProfileCache::new(loader, config.profile_cache_capacity));

        let router = DeliveryRouter::new(
            sessions.clone(),
            presence.clone(),
            relay.clone(),
            undelivered,
            notify,
            profile,
            config.offline_messaging_enabled,
            config.offline_message_storage_enabled,
            config.offline_kafka_notifications_enabled,
        );

        let sink: Arc<dyn OutboundSink> = Arc::new(router.clone());
        let calls = CallRegistry::new(sink);

        Ok(Self {
            config: Arc::new(config),
            sessions,
            presence,
            relay,
            router,
            calls,
            undelivered: undelivered_for_handlers,
        })
    }
}
