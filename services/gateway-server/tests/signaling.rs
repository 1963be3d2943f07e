//! Integration tests for call-signaling ICE buffering order and terminal
//! cleanup timing (spec.md §8 scenarios 5-6).

use gateway_core::GatewayConfig;
use gateway_server::AppState;
use gateway_test_utils::{start_kafka, start_redis, GatewayWsClient};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

const JWT_SECRET: &str = "signaling-test-secret";

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: u64,
}

fn sign(user_id: &str) -> String {
    encode(
        &Header::new(jsonwebtoken::Algorithm::HS256),
        &Claims {
            sub: user_id.to_owned(),
            exp: 9_999_999_999,
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("sign test token")
}

async fn spawn_pod(redis_url: &str, kafka_brokers: &str) -> std::net::SocketAddr {
    let config: GatewayConfig = toml::from_str(&format!(
        r#"
            redis_url = "{redis_url}"
            kafka_brokers = "{kafka_brokers}"
            profile_service_url = "http://127.0.0.1:1"
            jwt_secret = "{JWT_SECRET}"
        "#
    ))
    .expect("parse test config");
    let state = AppState::new(config).await.expect("build app state");
    tokio::spawn(state.relay.clone().run(state.sessions.clone()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, gateway_server::build_router(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn ice_candidates_buffer_until_offer_and_answer_then_flush_in_order() {
    let redis = start_redis().await;
    let kafka = start_kafka().await;
    let addr = spawn_pod(&redis.url, &kafka.brokers).await;

    let mut caller = GatewayWsClient::connect_with_token(&format!("ws://{addr}"), &sign("1")).await.unwrap();
    let mut callee = GatewayWsClient::connect_with_token(&format!("ws://{addr}"), &sign("2")).await.unwrap();

    caller
        .send_json(&serde_json::json!({"signal":"CALL_OFFER","from":"1","to":"2","sessionId":"s1","callType":"audio","payload":{}}))
        .await
        .unwrap();
    let offer = callee.recv_json().await.unwrap();
    assert_eq!(offer["signal"], "CALL_OFFER");

    caller
        .send_json(&serde_json::json!({"signal":"ICE_CANDIDATE","from":"1","to":"2","sessionId":"s1","payload":{"candidate":"c1"}}))
        .await
        .unwrap();
    caller
        .send_json(&serde_json::json!({"signal":"ICE_CANDIDATE","from":"1","to":"2","sessionId":"s1","payload":{"candidate":"c2"}}))
        .await
        .unwrap();

    callee
        .send_json(&serde_json::json!({"signal":"CALL_ANSWER","from":"2","to":"1","sessionId":"s1","payload":{}}))
        .await
        .unwrap();
    let answer = caller.recv_json().await.unwrap();
    assert_eq!(answer["signal"], "CALL_ANSWER");

    // The buffered candidates flush to the caller in arrival order.
    let first = caller.recv_json().await.unwrap();
    let second = caller.recv_json().await.unwrap();
    assert_eq!(first["payload"]["candidate"], "c1");
    assert_eq!(second["payload"]["candidate"], "c2");

    caller
        .send_json(&serde_json::json!({"signal":"ICE_CANDIDATE","from":"1","to":"2","sessionId":"s1","payload":{"candidate":"c3"}}))
        .await
        .unwrap();
    let third = callee.recv_json().await.unwrap();
    assert_eq!(third["payload"]["candidate"], "c3");
}

#[tokio::test]
async fn terminal_signal_drops_late_references_after_cleanup_delay() {
    let redis = start_redis().await;
    let kafka = start_kafka().await;
    let addr = spawn_pod(&redis.url, &kafka.brokers).await;

    let mut caller = GatewayWsClient::connect_with_token(&format!("ws://{addr}"), &sign("1")).await.unwrap();
    let mut callee = GatewayWsClient::connect_with_token(&format!("ws://{addr}"), &sign("2")).await.unwrap();

    caller
        .send_json(&serde_json::json!({"signal":"CALL_OFFER","from":"1","to":"2","sessionId":"s2","callType":"audio","payload":{}}))
        .await
        .unwrap();
    callee.recv_json().await.unwrap();

    caller
        .send_json(&serde_json::json!({"signal":"CALL_END","from":"1","to":"2","sessionId":"s2","payload":{}}))
        .await
        .unwrap();
    callee.recv_json().await.unwrap();

    // Past the 5s cleanup delay, the session is gone: a stray candidate for
    // it is dropped and never forwarded.
    tokio::time::sleep(std::time::Duration::from_millis(5_200)).await;
    caller
        .send_json(&serde_json::json!({"signal":"ICE_CANDIDATE","from":"1","to":"2","sessionId":"s2","payload":{"candidate":"late"}}))
        .await
        .unwrap();

    caller
        .send_json(&serde_json::json!({"signal":"CALL_OFFER","from":"1","to":"2","sessionId":"s3","callType":"audio","payload":{}}))
        .await
        .unwrap();
    let next = callee.recv_json().await.unwrap();
    assert_eq!(next["sessionId"], "s3");
}
