//! Container-backed test fixtures, grounded on the teacher's
//! `testcontainers_modules::postgres::Postgres` usage in
//! `services/server/tests/admin.rs`: this crate's durable stores are Redis
//! and Kafka instead, so the same `AsyncRunner::start` shape is used against
//! `testcontainers-modules`' `redis` and `kafka` images.

use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::kafka::Kafka;
use testcontainers_modules::redis::Redis;

pub struct RedisFixture {
    _container: ContainerAsync<Redis>,
    pub url: String,
}

/// Starts a disposable Redis container and returns its connection URL.
/// Used by two-pod cross-pod-relay scenarios (spec.md §8 scenario 2) as
/// well as single-pod presence/undelivered-store tests.
pub async fn start_redis() -> RedisFixture {
    let container = Redis::default().start().await.expect("start redis container");
    let port = container.get_host_port_ipv4(6379).await.expect("redis port");
    RedisFixture {
        url: format!("redis://127.0.0.1:{port}"),
        _container: container,
    }
}

pub struct KafkaFixture {
    _container: ContainerAsync<Kafka>,
    pub brokers: String,
}

/// Starts a disposable Kafka broker and returns its bootstrap address.
pub async fn start_kafka() -> KafkaFixture {
    let container = Kafka::default().start().await.expect("start kafka container");
    let port = container.get_host_port_ipv4(9092).await.expect("kafka port");
    KafkaFixture {
        brokers: format!("127.0.0.1:{port}"),
        _container: container,
    }
}

impl KafkaFixture {
    /// Consumes the next message published to `topic` and parses it as
    /// JSON. A fresh consumer group reading from the earliest offset, so it
    /// sees a message published before this call was even made — tests can
    /// trigger the publish first and assert on it afterward (spec.md §8
    /// scenario 3).
    pub async fn consume_one(&self, topic: &str) -> serde_json::Value {
        use rdkafka::consumer::{Consumer, StreamConsumer};
        use rdkafka::{ClientConfig, Message};

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", format!("gateway-test-utils-{topic}"))
            .set("auto.offset.reset", "earliest")
            .create()
            .expect("build test kafka consumer");
        consumer.subscribe(&[topic]).expect("subscribe to topic");

        let message = tokio::time::timeout(std::time::Duration::from_secs(15), consumer.recv())
            .await
            .expect("kafka message arrived before timeout")
            .expect("kafka consumer recv succeeded");
        let payload = message.payload().expect("message has a payload");
        serde_json::from_slice(payload).expect("message payload is valid JSON")
    }
}
