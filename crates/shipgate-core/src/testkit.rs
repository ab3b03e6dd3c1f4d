//! In-memory collaborators for unit tests.

use crate::systems::{
    BuildSystem, CollaboratorError, DeploymentRef, EnvironmentRef, ProjectRef, QueueReceipt,
    ReleaseRef, ReleaseSystem,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedDeployment {
    pub release_id: String,
    pub environment_id: String,
    pub comment: String,
}

#[derive(Default)]
pub struct FakeReleaseSystem {
    pub projects: Vec<ProjectRef>,
    pub environments: Vec<EnvironmentRef>,
    pub releases: Vec<ReleaseRef>,
    pub deployments: Vec<DeploymentRef>,
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
    pub created: Mutex<Vec<CreatedDeployment>>,
}

impl FakeReleaseSystem {
    /// One project `myapp`, the three standard environments and releases
    /// 1.0.43, 1.0.42, 1.0.41 (most recent first).
    pub fn standard() -> Self {
        Self {
            projects: vec![ProjectRef {
                id: "Projects-1".into(),
                name: "myapp".into(),
            }],
            environments: [("Environments-1", "QA"), ("Environments-2", "UAT"), ("Environments-3", "Production")]
                .into_iter()
                .map(|(id, name)| EnvironmentRef {
                    id: id.into(),
                    name: name.into(),
                })
                .collect(),
            releases: [("Releases-3", "1.0.43"), ("Releases-2", "1.0.42"), ("Releases-1", "1.0.41")]
                .into_iter()
                .map(|(id, version)| ReleaseRef {
                    id: id.into(),
                    version: version.into(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::standard()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<CreatedDeployment> {
        self.created.lock().unwrap().clone()
    }

    fn enter(&self) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(msg) => Err(CollaboratorError::Transport(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReleaseSystem for FakeReleaseSystem {
    async fn find_projects(&self, name: &str) -> Result<Vec<ProjectRef>, CollaboratorError> {
        self.enter()?;
        Ok(self.projects.iter().filter(|p| p.name == name).cloned().collect())
    }

    async fn find_environments(
        &self,
        name: &str,
    ) -> Result<Vec<EnvironmentRef>, CollaboratorError> {
        self.enter()?;
        Ok(self
            .environments
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect())
    }

    async fn list_releases(
        &self,
        _project_id: &str,
        take: u32,
    ) -> Result<Vec<ReleaseRef>, CollaboratorError> {
        self.enter()?;
        Ok(self.releases.iter().take(take as usize).cloned().collect())
    }

    async fn list_deployments(
        &self,
        _project_id: &str,
        take: u32,
    ) -> Result<Vec<DeploymentRef>, CollaboratorError> {
        self.enter()?;
        Ok(self.deployments.iter().take(take as usize).cloned().collect())
    }

    async fn create_deployment(
        &self,
        release_id: &str,
        environment_id: &str,
        comment: &str,
    ) -> Result<String, CollaboratorError> {
        self.enter()?;
        let mut created = self.created.lock().unwrap();
        created.push(CreatedDeployment {
            release_id: release_id.to_string(),
            environment_id: environment_id.to_string(),
            comment: comment.to_string(),
        });
        Ok(format!("Deployments-{}", created.len()))
    }

    fn deployment_url(&self, deployment_id: &str) -> String {
        format!("https://deploy.test/app#/Spaces-1/deployments/{deployment_id}")
    }
}

#[derive(Default)]
pub struct FakeBuildSystem {
    pub fail: bool,
    pub triggered: Mutex<Vec<(String, String)>>,
}

impl FakeBuildSystem {
    pub fn triggered(&self) -> Vec<(String, String)> {
        self.triggered.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildSystem for FakeBuildSystem {
    async fn trigger_build(
        &self,
        app: &str,
        branch: &str,
    ) -> Result<QueueReceipt, CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Status {
                status: 503,
                body: "build system unavailable".into(),
            });
        }
        self.triggered
            .lock()
            .unwrap()
            .push((app.to_string(), branch.to_string()));
        Ok(QueueReceipt {
            job: "build-pipeline".into(),
            queue_item: Some(7),
        })
    }
}
