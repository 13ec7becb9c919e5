//! # routes::strategies
//!
//! CRUD over the signed-in user's strategies.  Every call goes through the
//! configured [`StrategyStore`](crate::store::StrategyStore).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::Session,
    error::AppError,
    events::FlowEvent,
    models::{NewStrategy, StrategyUpdate},
    state::SharedState,
};

/// GET /api/strategies — newest first
pub async fn list_strategies(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let strategies = state.store.list(&session).await?;
    Ok(Json(json!({
        "ok":         true,
        "count":      strategies.len(),
        "strategies": strategies,
    })))
}

/// POST /api/strategies
pub async fn create_strategy(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Json(new):          Json<NewStrategy>,
) -> Result<impl IntoResponse, AppError> {
    if new.name.trim().is_empty() {
        return Err(AppError::BadRequest("Strategy name is required".into()));
    }
    let strategy = state.store.create(&session, new).await?;
    info!(strategy_id = %strategy.id, name = %strategy.name, "📄 strategy created");
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "strategy": strategy }))))
}

/// GET /api/strategies/:id
pub async fn get_strategy(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let strategy = state
        .store
        .get(&session, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Strategy {id}")))?;
    Ok(Json(json!({ "ok": true, "strategy": strategy })))
}

/// PUT /api/strategies/:id
pub async fn update_strategy(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
    Json(update):       Json<StrategyUpdate>,
) -> Result<impl IntoResponse, AppError> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("Strategy name cannot be empty".into()));
    }
    let strategy = state
        .store
        .update(&session, id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Strategy {id}")))?;
    Ok(Json(json!({ "ok": true, "strategy": strategy })))
}

/// DELETE /api/strategies/:id — also closes its editor session.
pub async fn delete_strategy(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.delete(&session, id).await? {
        return Err(AppError::NotFound(format!("Strategy {id}")));
    }
    state.close_editor(&session, id).await;
    state.broadcast(&FlowEvent::StrategyDeleted { strategy_id: id });
    info!(strategy_id = %id, "🗑️ strategy deleted");
    Ok(Json(json!({ "ok": true, "deleted": id })))
}
