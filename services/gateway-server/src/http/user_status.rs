//! `GET /v1/websocket/user-status/{userId}`: presence lookup, no auth
//! (spec.md §6).

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use gateway_protocol::UserStatusResponse;

pub async fn user_status(State(state): State<AppState>, Path(user_id): Path<String>) -> Json<UserStatusResponse> {
    let pod = state.presence.lookup(&user_id).await;
    Json(UserStatusResponse {
        online: pod.is_some(),
        pod,
    })
}
