use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use shipgate_core::approval::ResponseOutcome;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InteractionBody {
    pub action: String,
    pub approval_id: String,
    pub user: String,
    #[serde(default)]
    pub reply_url: Option<String>,
}

/// POST /api/interactions: an approver pressed approve or reject on a card.
pub async fn post_interaction(
    State(app): State<AppState>,
    Json(body): Json<InteractionBody>,
) -> Result<Json<ResponseOutcome>, AppError> {
    let approved = match body.action.as_str() {
        "approve" => true,
        "reject" => false,
        other => {
            return Err(AppError::bad_request(format!(
                "unsupported action '{other}': expected approve or reject"
            )))
        }
    };
    let user = body.user.trim();
    if user.is_empty() {
        return Err(AppError::bad_request("user is required"));
    }

    let channel = app.reply_channel(body.reply_url.as_deref(), user);
    let outcome = app
        .orchestrator
        .approvals()
        .handle_response(&body.approval_id, approved, user, channel.as_ref())
        .await;
    Ok(Json(outcome))
}
