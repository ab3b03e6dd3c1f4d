use serde::{Deserialize, Serialize};

// ─── Release system resources ─────────────────────────────────────────────

/// Paged collection envelope: `{"Items": [...], ...}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Release {
    pub id: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deployment {
    pub id: String,
    #[serde(default = "unknown")]
    pub environment_id: String,
    #[serde(default = "unknown_release")]
    pub release_id: String,
    /// Not every server version reports a state on the deployment resource.
    #[serde(default = "unknown_state")]
    pub state: String,
    #[serde(default)]
    pub created: String,
}

fn unknown() -> String {
    "unknown".to_string()
}

fn unknown_release() -> String {
    "?".to_string()
}

fn unknown_state() -> String {
    "Unknown".to_string()
}

/// Body of `POST /deployments`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDeployment {
    pub release_id: String,
    pub environment_id: String,
    pub comments: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatedDeployment {
    pub id: String,
}

// ─── Build system resources ───────────────────────────────────────────────

/// Parameters passed to the parameterised build job.
#[derive(Debug, Clone, Serialize)]
pub struct BuildParameters {
    #[serde(rename = "APP_NAME")]
    pub app_name: String,
    #[serde(rename = "BRANCH")]
    pub branch: String,
    #[serde(rename = "CALLBACK_URL", skip_serializing_if = "String::is_empty")]
    pub callback_url: String,
}

/// A build request accepted into the build queue.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueuedBuild {
    pub job: String,
    pub queue_item: Option<u64>,
}
