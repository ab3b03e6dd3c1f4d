use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use shipgate_core::orchestrator::HISTORY_LIMIT;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// GET /api/history/{app}?limit=N: most recent audit records first.
pub async fn get_history(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = query.limit.unwrap_or(HISTORY_LIMIT);
    let entries = app.orchestrator.audit().get_history(&name, limit).await?;
    Ok(Json(serde_json::json!({ "app": name, "entries": entries })))
}
