use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use shipgate_core::orchestrator::Dispatch;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub text: String,
    pub user: String,
    /// Where replies for this conversation are posted.
    #[serde(default)]
    pub reply_url: Option<String>,
}

/// POST /api/messages: parse and dispatch one chat command.
pub async fn post_message(
    State(app): State<AppState>,
    Json(body): Json<MessageBody>,
) -> Result<Json<Dispatch>, AppError> {
    let user = body.user.trim();
    if user.is_empty() {
        return Err(AppError::bad_request("user is required"));
    }
    let channel = app.reply_channel(body.reply_url.as_deref(), user);
    let dispatch = app
        .orchestrator
        .handle_message(&body.text, user, channel)
        .await;
    Ok(Json(dispatch))
}
