//! `ReleaseSystem` / `BuildSystem` implementations over the HTTP clients.

use async_trait::async_trait;
use release_client::{BuildClient, BuildParameters, ClientError, CreateDeployment, ReleaseClient};
use shipgate_core::systems::{
    BuildSystem, CollaboratorError, DeploymentRef, EnvironmentRef, ProjectRef, QueueReceipt,
    ReleaseRef, ReleaseSystem,
};

fn collaborator_error(e: ClientError) -> CollaboratorError {
    match e {
        ClientError::Status { status, body, .. } => CollaboratorError::Status { status, body },
        ClientError::Decode { .. } => CollaboratorError::Decode(e.to_string()),
        other => CollaboratorError::Transport(other.to_string()),
    }
}

pub struct ReleaseApi(pub ReleaseClient);

#[async_trait]
impl ReleaseSystem for ReleaseApi {
    async fn find_projects(&self, name: &str) -> Result<Vec<ProjectRef>, CollaboratorError> {
        let projects = self.0.find_projects(name).await.map_err(collaborator_error)?;
        Ok(projects
            .into_iter()
            .map(|p| ProjectRef {
                id: p.id,
                name: p.name,
            })
            .collect())
    }

    async fn find_environments(
        &self,
        name: &str,
    ) -> Result<Vec<EnvironmentRef>, CollaboratorError> {
        let envs = self
            .0
            .find_environments(name)
            .await
            .map_err(collaborator_error)?;
        Ok(envs
            .into_iter()
            .map(|e| EnvironmentRef {
                id: e.id,
                name: e.name,
            })
            .collect())
    }

    async fn list_releases(
        &self,
        project_id: &str,
        take: u32,
    ) -> Result<Vec<ReleaseRef>, CollaboratorError> {
        let releases = self
            .0
            .list_releases(project_id, take)
            .await
            .map_err(collaborator_error)?;
        Ok(releases
            .into_iter()
            .map(|r| ReleaseRef {
                id: r.id,
                version: r.version,
            })
            .collect())
    }

    async fn list_deployments(
        &self,
        project_id: &str,
        take: u32,
    ) -> Result<Vec<DeploymentRef>, CollaboratorError> {
        let deployments = self
            .0
            .list_deployments(project_id, take)
            .await
            .map_err(collaborator_error)?;
        Ok(deployments
            .into_iter()
            .map(|d| DeploymentRef {
                id: d.id,
                environment_id: d.environment_id,
                release_id: d.release_id,
                state: d.state,
                created: d.created,
            })
            .collect())
    }

    async fn create_deployment(
        &self,
        release_id: &str,
        environment_id: &str,
        comment: &str,
    ) -> Result<String, CollaboratorError> {
        let created = self
            .0
            .create_deployment(&CreateDeployment {
                release_id: release_id.to_string(),
                environment_id: environment_id.to_string(),
                comments: comment.to_string(),
            })
            .await
            .map_err(collaborator_error)?;
        Ok(created.id)
    }

    fn deployment_url(&self, deployment_id: &str) -> String {
        self.0.deployment_url(deployment_id)
    }
}

pub struct BuildApi {
    pub client: BuildClient,
    /// Passed to every build so the build server can report completion.
    pub callback_url: String,
}

#[async_trait]
impl BuildSystem for BuildApi {
    async fn trigger_build(
        &self,
        app: &str,
        branch: &str,
    ) -> Result<QueueReceipt, CollaboratorError> {
        let queued = self
            .client
            .trigger(&BuildParameters {
                app_name: app.to_string(),
                branch: branch.to_string(),
                callback_url: self.callback_url.clone(),
            })
            .await
            .map_err(collaborator_error)?;
        Ok(QueueReceipt {
            job: queued.job,
            queue_item: queued.queue_item,
        })
    }
}
