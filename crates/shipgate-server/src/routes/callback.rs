use axum::Json;
use serde::Deserialize;

/// Completion notice posted by the build server.
#[derive(Debug, Deserialize)]
pub struct BuildNotification {
    #[serde(default)]
    pub app: Option<String>,
    /// Build servers send this as either a number or a string.
    #[serde(default)]
    pub build_number: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// POST /api/callback: build completion. Logged only.
pub async fn build_callback(Json(body): Json<BuildNotification>) -> Json<serde_json::Value> {
    tracing::info!(
        app = body.app.as_deref().unwrap_or("?"),
        build_number = %body.build_number.unwrap_or_default(),
        status = body.status.as_deref().unwrap_or("?"),
        url = body.url.as_deref().unwrap_or(""),
        "build callback"
    );
    Json(serde_json::json!({ "received": true }))
}
