//! HTTP surface: merges the per-module routers behind one CORS layer.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::linking::{LinkingManager, LinkingRouteState, linking_routes};
use crate::nutrition::{NutritionRouteState, nutrition_routes};
use crate::onboarding::{OnboardingRouteState, WizardManager, onboarding_routes};
use crate::session::SessionHub;
use crate::store::LibSqlBackend;
use crate::tracking::{TrackingRouteState, tracking_routes};

/// Long-lived services behind the router.
#[derive(Clone)]
pub struct AppServices {
    pub backend: Arc<LibSqlBackend>,
    pub sessions: Arc<SessionHub>,
    pub wizards: Arc<WizardManager>,
    pub linking: Arc<LinkingManager>,
}

impl AppServices {
    pub fn new(backend: Arc<LibSqlBackend>, config: &AppConfig) -> Self {
        let sessions = SessionHub::new();
        let wizards = Arc::new(WizardManager::new(
            backend.clone(),
            Arc::clone(&sessions),
        ));
        let linking = Arc::new(LinkingManager::new(
            backend.clone(),
            config.handoff_delay,
        ));
        Self {
            backend,
            sessions,
            wizards,
            linking,
        }
    }
}

/// How often idle wizards and linking sessions are swept.
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a background task that periodically drops idle wizards and
/// linking sessions.
pub fn spawn_expiry_task(services: &AppServices, ttl: Duration) -> tokio::task::JoinHandle<()> {
    let wizards = Arc::clone(&services.wizards);
    let linking = Arc::clone(&services.linking);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            wizards.expire_idle(ttl).await;
            linking.expire_idle(ttl).await;
        }
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/session
async fn current_session(State(sessions): State<Arc<SessionHub>>) -> Response {
    match sessions.current().await {
        Some(info) => Json(info).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// DELETE /api/session
async fn sign_out(State(sessions): State<Arc<SessionHub>>) -> StatusCode {
    sessions.signed_out().await;
    StatusCode::NO_CONTENT
}

/// Build the full application router.
pub fn router(services: &AppServices) -> Router {
    let session_routes = Router::new()
        .route("/api/session", get(current_session).delete(sign_out))
        .with_state(Arc::clone(&services.sessions));

    Router::new()
        .route("/health", get(health))
        .merge(session_routes)
        .merge(onboarding_routes(OnboardingRouteState {
            manager: Arc::clone(&services.wizards),
        }))
        .merge(linking_routes(LinkingRouteState {
            manager: Arc::clone(&services.linking),
        }))
        .merge(tracking_routes(TrackingRouteState {
            store: services.backend.clone(),
        }))
        .merge(nutrition_routes(NutritionRouteState {
            store: services.backend.clone(),
        }))
        .layer(CorsLayer::permissive())
}
