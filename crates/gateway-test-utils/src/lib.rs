//! Shared test harness for the gateway crates: a thin WebSocket test client
//! and testcontainers-backed Redis/Kafka fixtures. The `rt-test-utils` crate
//! is the teacher's equivalent for the timer protocol; this crate
//! generalizes the same idea to this system's wire format and backends.

pub mod containers;
pub mod ws_client;

pub use containers::{start_kafka, start_redis, KafkaFixture, RedisFixture};
pub use ws_client::GatewayWsClient;
