pub mod analytics;
pub mod auth;
pub mod editor;
pub mod monitor;
pub mod strategies;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::SharedState;

/// GET /health
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let open_editors = state.editors.read().await.len();
    Json(json!({
        "ok":           true,
        "status":       "healthy",
        "environment":  state.config.environment.to_string(),
        "store":        state.store.backend_name(),
        "mock_auth":    state.auth.is_mock(),
        "open_editors": open_editors,
    }))
}
