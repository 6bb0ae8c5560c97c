//! REST endpoints driving registration wizards.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use super::manager::{WizardError, WizardManager};
use super::model::FieldEdit;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<WizardManager>,
}

fn error_response(err: WizardError) -> Response {
    let status = match err {
        WizardError::NotFound(_) => StatusCode::NOT_FOUND,
        WizardError::Edit(_) => StatusCode::CONFLICT,
    };
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

/// POST /api/onboarding
///
/// Starts a new wizard on the identity step.
async fn start(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let (id, status) = state.manager.start().await;
    (
        StatusCode::CREATED,
        Json(serde_json::json!({"id": id, "status": status})),
    )
}

/// GET /api/onboarding/{id}
async fn get_status(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.manager.status(id).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/{id}/fields
///
/// Body: `{"field": "age", "value": "29"}`.
async fn edit_field(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<FieldEdit>,
) -> Response {
    match state.manager.edit(id, edit).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/{id}/advance
///
/// Always 200 when the wizard exists; the outcome says what happened.
async fn advance(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.manager.advance(id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/onboarding/{id}
async fn abandon(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.manager.abandon(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding", post(start))
        .route("/api/onboarding/{id}", get(get_status).delete(abandon))
        .route("/api/onboarding/{id}/fields", post(edit_field))
        .route("/api/onboarding/{id}/advance", post(advance))
        .with_state(state)
}
