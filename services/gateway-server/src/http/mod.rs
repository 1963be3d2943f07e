pub mod response;
pub mod send_message;
pub mod undelivered;
pub mod user_status;

/// Extracts and verifies the bearer token carried in `Authorization`,
/// returning the caller's user ID. Shared by every `/v1/messages/*`
/// handler; each calls this itself rather than going through middleware,
/// mirroring the teacher's per-handler `extract_bearer` discipline in
/// `ws_forwarder.rs`/`ws_receiver.rs`.
fn authenticate(state: &crate::state::AppState, headers: &axum::http::HeaderMap) -> Option<String> {
    let raw = headers.get("authorization")?.to_str().ok()?;
    let token = gateway_core::auth::extract_bearer(raw)?;
    gateway_core::auth::verify_token(&state.config.jwt_secret, token).map(|claims| claims.user_id)
}
