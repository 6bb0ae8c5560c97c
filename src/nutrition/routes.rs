//! REST endpoints for meal plans.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;

use crate::store::MealPlanStore;
use crate::tracking::routes::tracking_error_response;

use super::model::MealPlanUpdate;

/// Header a professional client may send instead of `updated_by`.
pub const PROFESSIONAL_HEADER: &str = "x-professional-id";

/// Shared state for meal plan routes.
#[derive(Clone)]
pub struct NutritionRouteState {
    pub store: Arc<dyn MealPlanStore>,
}

/// GET /api/clients/{id}/meal-plan
async fn get_plan(
    State(state): State<NutritionRouteState>,
    Path(client_id): Path<String>,
) -> Response {
    match state.store.get_meal_plan(&client_id).await {
        Ok(Some(plan)) => Json(plan).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("No meal plan for client {client_id}")})),
        )
            .into_response(),
        Err(e) => tracking_error_response(e.into()),
    }
}

/// PUT /api/clients/{id}/meal-plan
async fn put_plan(
    State(state): State<NutritionRouteState>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
    Json(mut update): Json<MealPlanUpdate>,
) -> Response {
    if let Err(e) = update.validate() {
        return tracking_error_response(e);
    }
    if update.updated_by.is_none() {
        update.updated_by = headers
            .get(PROFESSIONAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }

    let plan = update.into_plan(client_id, Utc::now());
    if let Err(e) = state.store.put_meal_plan(&plan).await {
        return tracking_error_response(e.into());
    }
    info!(
        client_id = %plan.client_id,
        meals = plan.meals.len(),
        updated_by = plan.updated_by.as_deref().unwrap_or("-"),
        "Meal plan replaced"
    );
    Json(plan).into_response()
}

/// Build the meal plan REST routes.
pub fn nutrition_routes(state: NutritionRouteState) -> Router {
    Router::new()
        .route("/api/clients/{id}/meal-plan", get(get_plan).put(put_plan))
        .with_state(state)
}
