//! REST endpoints for professional code entry.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::manager::LinkingManager;
use super::protocol::LinkOutcome;

/// Shared state for linking routes.
#[derive(Clone)]
pub struct LinkingRouteState {
    pub manager: Arc<LinkingManager>,
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    /// Replaces the current entry when present.
    #[serde(default)]
    code: Option<String>,
}

/// One edit to the code entry.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum EntryEdit {
    Type { index: usize, ch: char },
    Backspace { index: usize },
    Paste { text: String },
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    #[serde(flatten)]
    outcome: LinkOutcome,
    message: &'static str,
}

fn not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": format!("Linking session {id} not found")})),
    )
        .into_response()
}

/// POST /api/linking
async fn open(State(state): State<LinkingRouteState>) -> impl IntoResponse {
    let (id, session) = state.manager.open().await;
    let status = session.status().await;
    (
        StatusCode::CREATED,
        Json(serde_json::json!({"id": id, "status": status})),
    )
}

/// GET /api/linking/{id}
async fn get_status(State(state): State<LinkingRouteState>, Path(id): Path<Uuid>) -> Response {
    match state.manager.get(id).await {
        Some(session) => Json(session.status().await).into_response(),
        None => not_found(id),
    }
}

/// POST /api/linking/{id}/entry
///
/// Body: `{"action": "type", "index": 0, "ch": "D"}`,
/// `{"action": "backspace", "index": 0}` or `{"action": "paste", "text": "DYN12345"}`.
/// Refused with 409 while a verify is running.
async fn edit_entry(
    State(state): State<LinkingRouteState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<EntryEdit>,
) -> Response {
    let Some(session) = state.manager.get(id).await else {
        return not_found(id);
    };
    let applied = match edit {
        EntryEdit::Type { index, ch } => session.type_char(index, ch).await,
        EntryEdit::Backspace { index } => session.backspace(index).await,
        EntryEdit::Paste { text } => session.paste(&text).await,
    };
    if !applied {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": LinkOutcome::Busy.user_message()})),
        )
            .into_response();
    }
    Json(session.status().await).into_response()
}

/// POST /api/linking/{id}/verify
///
/// Body: `{"code": "DYN12345"}` or `{}` to verify the current entry.
async fn verify(
    State(state): State<LinkingRouteState>,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyRequest>,
) -> Response {
    let Some(session) = state.manager.get(id).await else {
        return not_found(id);
    };
    let outcome = match req.code.as_deref() {
        Some(code) => session.verify_code(code).await,
        None => session.verify().await,
    };
    let message = outcome.user_message();
    Json(VerifyResponse { outcome, message }).into_response()
}

/// DELETE /api/linking/{id}
async fn close(State(state): State<LinkingRouteState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.manager.close(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Build the linking REST routes.
pub fn linking_routes(state: LinkingRouteState) -> Router {
    Router::new()
        .route("/api/linking", post(open))
        .route("/api/linking/{id}", get(get_status).delete(close))
        .route("/api/linking/{id}/entry", post(edit_entry))
        .route("/api/linking/{id}/verify", post(verify))
        .with_state(state)
}
