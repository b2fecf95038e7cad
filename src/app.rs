//! Router assembly and shared application state.

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::auth::AuthService;
use crate::onboarding::OnboardingManager;
use crate::speech::SpeechService;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub onboarding: Arc<OnboardingManager>,
    pub speech: Arc<SpeechService>,
}

/// Build the full application router, CORS-restricted to the frontend.
pub fn router(state: AppState, frontend_origin: &str) -> Router {
    let origin = frontend_origin.parse::<HeaderValue>().unwrap_or_else(|_| {
        tracing::warn!(
            %frontend_origin,
            "Frontend origin is not a valid header value; falling back to http://localhost:3000"
        );
        HeaderValue::from_static("http://localhost:3000")
    });
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health))
        .merge(crate::auth::routes::router())
        .merge(crate::onboarding::routes::router())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
