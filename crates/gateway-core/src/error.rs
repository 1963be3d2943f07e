//! Shared error type for gateway-core component boundaries.
//!
//! Request-scoped code never panics (spec.md §7: "Fatal: none at request
//! scope"); every fallible path returns a `CoreError` or degrades to a
//! `Dropped`/`false`/`None` result and logs instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("auth: {0}")]
    Auth(String),
    #[error("redis backend: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("kafka backend: {0}")]
    Kafka(String),
    #[error("profile service: {0}")]
    Profile(#[from] reqwest::Error),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}
