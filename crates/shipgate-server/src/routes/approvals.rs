use axum::extract::{Path, State};
use axum::Json;
use shipgate_core::approval::PendingApproval;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/approvals: approvals still waiting for a decision.
pub async fn list_approvals(State(app): State<AppState>) -> Json<Vec<PendingApproval>> {
    Json(app.orchestrator.approvals().pending().await)
}

/// GET /api/approvals/{id}
pub async fn get_approval(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PendingApproval>, AppError> {
    app.orchestrator
        .approvals()
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no pending approval '{id}'")))
}
