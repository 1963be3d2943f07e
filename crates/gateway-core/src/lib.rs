//! Core cross-pod messaging gateway components (C1-C8): presence directory,
//! local session table, relay bus, profile cache, undelivered store,
//! notification publisher, call-signaling engine, and delivery router.
//! Framework-agnostic — nothing here depends on axum or any transport.

pub mod auth;
pub mod config;
pub mod digest;
pub mod error;
pub mod notify;
pub mod presence;
pub mod profile;
pub mod relay;
pub mod router;
pub mod sessions;
pub mod signaling;
pub mod sink;
pub mod undelivered;

pub use config::GatewayConfig;
pub use error::CoreError;
pub use router::DeliveryRouter;
pub use sessions::{Session, SessionTable};
pub use sink::{Deliverable, DeliveryOutcome, OutboundSink, SocketSink};
