//! Narrow contracts for the two external collaborators.
//!
//! The release system is queried by name and driven by id; the build system
//! only accepts trigger requests. Concrete HTTP implementations live outside
//! the core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Release system
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRef {
    pub id: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub id: String,
    pub environment_id: String,
    pub release_id: String,
    pub state: String,
    pub created: String,
}

#[async_trait]
pub trait ReleaseSystem: Send + Sync {
    /// Projects whose name equals `name`.
    async fn find_projects(&self, name: &str) -> Result<Vec<ProjectRef>, CollaboratorError>;

    /// Environments whose name equals `name`.
    async fn find_environments(
        &self,
        name: &str,
    ) -> Result<Vec<EnvironmentRef>, CollaboratorError>;

    /// Up to `take` releases of a project, most recent first.
    async fn list_releases(
        &self,
        project_id: &str,
        take: u32,
    ) -> Result<Vec<ReleaseRef>, CollaboratorError>;

    /// Up to `take` deployments of a project, most recent first.
    async fn list_deployments(
        &self,
        project_id: &str,
        take: u32,
    ) -> Result<Vec<DeploymentRef>, CollaboratorError>;

    /// Submit a deployment and return its id.
    async fn create_deployment(
        &self,
        release_id: &str,
        environment_id: &str,
        comment: &str,
    ) -> Result<String, CollaboratorError>;

    /// Web link an operator can open to follow a deployment.
    fn deployment_url(&self, deployment_id: &str) -> String;
}

// ---------------------------------------------------------------------------
// Build system
// ---------------------------------------------------------------------------

/// Acknowledgement returned when a build has been queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueReceipt {
    pub job: String,
    pub queue_item: Option<u64>,
}

#[async_trait]
pub trait BuildSystem: Send + Sync {
    async fn trigger_build(&self, app: &str, branch: &str)
        -> Result<QueueReceipt, CollaboratorError>;
}

pub type SharedReleaseSystem = Arc<dyn ReleaseSystem>;
pub type SharedBuildSystem = Arc<dyn BuildSystem>;
