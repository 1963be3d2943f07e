//! `/v1/messages/undelivered*`: fetch-then-delete, explicit delete, and an
//! availability probe over C5 (spec.md §4.6, §6). All three authenticate
//! via bearer token and operate on the caller's own mailbox.

use crate::http::authenticate;
use crate::http::response::{internal_error, unauthorized, HttpResult};
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use gateway_protocol::{HasMessagesResponse, UndeliveredMessagesResponse};

/// `GET /v1/messages/undelivered`: returns every stored message for the
/// caller and atomically clears the mailbox (spec.md §3: "deletion is
/// atomic across all messages of a receiver when a bulk fetch acknowledges
/// retrieval").
pub async fn fetch_undelivered(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HttpResult<Json<UndeliveredMessagesResponse>> {
    let Some(user_id) = authenticate(&state, &headers) else {
        return Err(unauthorized("missing or invalid bearer token"));
    };

    let messages = state
        .undelivered
        .fetch(&user_id)
        .await
        .map_err(internal_error)?;
    state
        .undelivered
        .delete_all(&user_id)
        .await
        .map_err(internal_error)?;

    Ok(Json(UndeliveredMessagesResponse {
        total_count: messages.len(),
        has_messages: !messages.is_empty(),
        messages,
    }))
}

/// `DELETE /v1/messages/undelivered`: explicit clear, independent of fetch.
pub async fn delete_undelivered(State(state): State<AppState>, headers: HeaderMap) -> HttpResult<()> {
    let Some(user_id) = authenticate(&state, &headers) else {
        return Err(unauthorized("missing or invalid bearer token"));
    };

    state
        .undelivered
        .delete_all(&user_id)
        .await
        .map_err(internal_error)?;
    Ok(())
}

/// `GET /v1/messages/undelivered/check`: probes without consuming the
/// mailbox.
pub async fn check_undelivered(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HttpResult<Json<HasMessagesResponse>> {
    let Some(user_id) = authenticate(&state, &headers) else {
        return Err(unauthorized("missing or invalid bearer token"));
    };

    let has_messages = state.undelivered.has(&user_id).await.map_err(internal_error)?;
    Ok(Json(HasMessagesResponse {
        has_messages,
        receiver_id: user_id,
    }))
}
