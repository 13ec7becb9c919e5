//! # routes::analytics
//!
//! POST /api/strategies/:id/analytics — mock performance report for a saved
//! strategy.  The body is optional (`{ "days": 90, "seed": 7 }`).

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    analytics::{mock_report, AnalyticsRequest},
    auth::Session,
    error::AppError,
    state::SharedState,
};

pub async fn strategy_analytics(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
    body:               Option<Json<AnalyticsRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let strategy = state
        .store
        .get(&session, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Strategy {id}")))?;

    let request = body.map(|Json(r)| r).unwrap_or_default();
    let report = mock_report(&strategy, &request, Utc::now());

    tracing::debug!(strategy_id = %id, trades = report.total_trades, seed = report.seed, "📊 mock analytics");
    Ok(Json(json!({ "ok": true, "report": report })))
}
