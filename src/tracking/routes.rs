//! REST endpoints for daily logs and charts.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::TrackingError;
use crate::store::TrackingStore;

use super::chart::{ChartPoint, ChartWindow, MacroSummary, macro_summary, weight_series};
use super::model::LogEntry;

/// Shared state for tracking routes.
#[derive(Clone)]
pub struct TrackingRouteState {
    pub store: Arc<dyn TrackingStore>,
}

#[derive(Debug, Deserialize)]
struct ChartQuery {
    window: Option<String>,
    /// Defaults to the current UTC date.
    today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct ChartResponse {
    client_id: String,
    window: ChartWindow,
    weight: Vec<ChartPoint>,
    macros: MacroSummary,
}

pub(crate) fn tracking_error_response(err: TrackingError) -> Response {
    let status = match &err {
        TrackingError::InvalidValue { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TrackingError::UnknownWindow(_) => StatusCode::BAD_REQUEST,
        TrackingError::Database(e) => {
            error!(error = %e, "Tracking store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

/// PUT /api/clients/{id}/logs
///
/// Records the day in the body, replacing any earlier log for that date.
async fn record_log(
    State(state): State<TrackingRouteState>,
    Path(client_id): Path<String>,
    Json(entry): Json<LogEntry>,
) -> Response {
    let log = entry.into_log(client_id);
    if let Err(e) = log.validate() {
        return tracking_error_response(e);
    }
    if let Err(e) = state.store.upsert_daily_log(&log).await {
        return tracking_error_response(e.into());
    }
    info!(client_id = %log.client_id, date = %log.date, "Daily log recorded");
    Json(log).into_response()
}

/// GET /api/clients/{id}/charts?window=month
async fn charts(
    State(state): State<TrackingRouteState>,
    Path(client_id): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Response {
    let window = match query.window.as_deref() {
        Some(raw) => match raw.parse::<ChartWindow>() {
            Ok(w) => w,
            Err(e) => return tracking_error_response(e),
        },
        None => ChartWindow::default(),
    };
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());

    let logs = match state
        .store
        .list_daily_logs(&client_id, window.start(today))
        .await
    {
        Ok(logs) => logs,
        Err(e) => return tracking_error_response(e.into()),
    };

    Json(ChartResponse {
        weight: weight_series(&logs, window, today),
        macros: macro_summary(&logs, window, today),
        client_id,
        window,
    })
    .into_response()
}

/// Build the tracking REST routes.
pub fn tracking_routes(state: TrackingRouteState) -> Router {
    Router::new()
        .route("/api/clients/{id}/logs", put(record_log))
        .route("/api/clients/{id}/charts", get(charts))
        .with_state(state)
}
