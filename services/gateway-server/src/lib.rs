pub mod http;
pub mod state;
pub mod ws;

pub use state::AppState;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{http::StatusCode, Router};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws::upgrade))
        .route("/v1/websocket/user-status/:user_id", get(http::user_status::user_status))
        .route("/v1/websocket/send-message", post(http::send_message::send_message))
        .route(
            "/v1/messages/undelivered",
            get(http::undelivered::fetch_undelivered).delete(http::undelivered::delete_undelivered),
        )
        .route("/v1/messages/undelivered/check", get(http::undelivered::check_undelivered))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .fallback(fallback_404)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

mod health {
    use axum::response::IntoResponse;
    pub async fn healthz() -> impl IntoResponse {
        "ok"
    }
    pub async fn readyz() -> impl IntoResponse {
        "ok"
    }
}
