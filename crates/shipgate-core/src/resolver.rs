//! Name-to-id resolution and the deploy / rollback / status operations.
//!
//! Every public operation returns a tagged result instead of an error: a
//! lookup miss or a transport failure becomes `{status: error, message}` at
//! this boundary. Nothing is cached between calls.

use crate::config::ReleaseConfig;
use crate::error::ShipgateError;
use crate::outcome::{DeployResult, EnvironmentStatus, RollbackResult, StatusResult};
use crate::systems::{CollaboratorError, SharedReleaseSystem};
use crate::types::canonical_environment_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ReleaseMatch
// ---------------------------------------------------------------------------

/// How a build number is matched against release versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseMatch {
    /// The version contains the build number anywhere.
    #[default]
    Substring,
    /// One `.`, `-` or `+` separated component of the version equals it.
    Component,
}

impl ReleaseMatch {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseMatch::Substring => "substring",
            ReleaseMatch::Component => "component",
        }
    }

    pub fn matches(self, version: &str, build_number: &str) -> bool {
        match self {
            ReleaseMatch::Substring => version.contains(build_number),
            ReleaseMatch::Component => version
                .split(['.', '-', '+'])
                .any(|part| part == build_number),
        }
    }
}

impl fmt::Display for ReleaseMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReleaseMatch {
    type Err = ShipgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "substring" => Ok(ReleaseMatch::Substring),
            "component" => Ok(ReleaseMatch::Component),
            _ => Err(ShipgateError::InvalidMatchStrategy(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    NotFound(String),

    #[error("release system error: {0}")]
    Transport(#[from] CollaboratorError),
}

/// Concrete ids for one deployment, produced per call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub project_id: String,
    pub environment_id: String,
    pub release_id: String,
}

// ---------------------------------------------------------------------------
// ReleaseResolver
// ---------------------------------------------------------------------------

pub struct ReleaseResolver {
    system: SharedReleaseSystem,
    release_match: ReleaseMatch,
    release_page_size: u32,
    deployment_page_size: u32,
}

impl ReleaseResolver {
    pub fn new(system: SharedReleaseSystem) -> Self {
        Self::from_config(system, &ReleaseConfig::default())
    }

    pub fn from_config(system: SharedReleaseSystem, cfg: &ReleaseConfig) -> Self {
        Self {
            system,
            release_match: cfg.release_match,
            release_page_size: cfg.release_page_size,
            deployment_page_size: cfg.deployment_page_size,
        }
    }

    pub fn with_match(mut self, release_match: ReleaseMatch) -> Self {
        self.release_match = release_match;
        self
    }

    pub async fn resolve_project(&self, app: &str) -> Result<String, ResolveError> {
        let projects = self.system.find_projects(app).await?;
        projects
            .into_iter()
            .next()
            .map(|p| p.id)
            .ok_or_else(|| ResolveError::NotFound(format!("Project '{app}' not found")))
    }

    pub async fn resolve_environment(&self, env_token: &str) -> Result<String, ResolveError> {
        let name = canonical_environment_name(env_token);
        let environments = self.system.find_environments(&name).await?;
        environments
            .into_iter()
            .next()
            .map(|e| e.id)
            .ok_or_else(|| ResolveError::NotFound(format!("Environment '{name}' not found")))
    }

    pub async fn resolve_release(
        &self,
        project_id: &str,
        build_number: &str,
    ) -> Result<String, ResolveError> {
        let releases = self
            .system
            .list_releases(project_id, self.release_page_size)
            .await?;
        let mut matching = releases
            .iter()
            .filter(|r| self.release_match.matches(&r.version, build_number));

        let Some(first) = matching.next() else {
            return Err(ResolveError::NotFound(format!(
                "Release with build #{build_number} not found for project"
            )));
        };
        let others: Vec<&str> = matching.map(|r| r.version.as_str()).collect();
        if !others.is_empty() {
            tracing::warn!(
                project_id,
                build_number,
                chosen = %first.version,
                also_matched = ?others,
                strategy = %self.release_match,
                "ambiguous release match, using most recent"
            );
        }
        Ok(first.id.clone())
    }

    pub async fn resolve_target(
        &self,
        app: &str,
        build_number: &str,
        env_token: &str,
    ) -> Result<ResolvedTarget, ResolveError> {
        let project_id = self.resolve_project(app).await?;
        let environment_id = self.resolve_environment(env_token).await?;
        let release_id = self.resolve_release(&project_id, build_number).await?;
        Ok(ResolvedTarget {
            project_id,
            environment_id,
            release_id,
        })
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub async fn deploy(&self, app: &str, build_number: &str, env_token: &str) -> DeployResult {
        match self.try_deploy(app, build_number, env_token).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(app, build_number, environment = env_token, error = %e, "deploy failed");
                DeployResult::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn try_deploy(
        &self,
        app: &str,
        build_number: &str,
        env_token: &str,
    ) -> Result<DeployResult, ResolveError> {
        let target = self.resolve_target(app, build_number, env_token).await?;
        let comment = format!("Triggered via chat command, build #{build_number}");
        let deployment_id = self
            .system
            .create_deployment(&target.release_id, &target.environment_id, &comment)
            .await?;
        tracing::info!(app, build_number, environment = env_token, deployment_id = %deployment_id, "deployment created");
        Ok(DeployResult::Triggered {
            url: self.system.deployment_url(&deployment_id),
            deployment_id,
        })
    }

    pub async fn rollback(&self, app: &str, env_token: &str) -> RollbackResult {
        match self.try_rollback(app, env_token).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(app, environment = env_token, error = %e, "rollback failed");
                RollbackResult::Error {
                    message: format!("Rollback error: {e}"),
                }
            }
        }
    }

    async fn try_rollback(&self, app: &str, env_token: &str) -> Result<RollbackResult, ResolveError> {
        let project_id = self.resolve_project(app).await?;
        let environment_id = self.resolve_environment(env_token).await?;
        let releases = self.system.list_releases(&project_id, 2).await?;
        let Some(previous) = releases.get(1) else {
            return Ok(RollbackResult::Error {
                message: "no previous release".to_string(),
            });
        };
        let comment = format!("Rollback via chat command, reverting to {}", previous.version);
        let deployment_id = self
            .system
            .create_deployment(&previous.id, &environment_id, &comment)
            .await?;
        tracing::info!(app, environment = env_token, rollback_to = %previous.version, "rollback created");
        Ok(RollbackResult::Triggered {
            rollback_to: previous.version.clone(),
            deployment_id,
        })
    }

    /// Latest deployment per environment, keyed by environment id.
    pub async fn get_status(&self, app: &str) -> StatusResult {
        match self.try_status(app).await {
            Ok(environments) => StatusResult::Ok { environments },
            Err(e) => StatusResult::Error {
                message: e.to_string(),
            },
        }
    }

    async fn try_status(
        &self,
        app: &str,
    ) -> Result<BTreeMap<String, EnvironmentStatus>, ResolveError> {
        let project_id = self.resolve_project(app).await?;
        let deployments = self
            .system
            .list_deployments(&project_id, self.deployment_page_size)
            .await?;
        let mut environments = BTreeMap::new();
        for d in deployments {
            environments
                .entry(d.environment_id)
                .or_insert(EnvironmentStatus {
                    release: d.release_id,
                    state: d.state,
                    created: d.created,
                });
        }
        Ok(environments)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::{DeploymentRef, ReleaseRef};
    use crate::testkit::FakeReleaseSystem;
    use std::sync::Arc;

    fn resolver(fake: &Arc<FakeReleaseSystem>) -> ReleaseResolver {
        ReleaseResolver::new(fake.clone())
    }

    #[tokio::test]
    async fn deploy_resolves_and_submits() {
        let fake = Arc::new(FakeReleaseSystem::standard());
        let result = resolver(&fake).deploy("myapp", "42", "qa").await;
        match result {
            DeployResult::Triggered { deployment_id, url } => {
                assert_eq!(deployment_id, "Deployments-1");
                assert!(url.ends_with("/deployments/Deployments-1"));
            }
            other => panic!("expected triggered, got {other:?}"),
        }
        let created = fake.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].release_id, "Releases-2");
        assert_eq!(created[0].environment_id, "Environments-1");
        assert!(created[0].comment.contains("#42"));
    }

    #[tokio::test]
    async fn prod_maps_to_production() {
        let fake = Arc::new(FakeReleaseSystem::standard());
        let id = resolver(&fake).resolve_environment("prod").await.unwrap();
        assert_eq!(id, "Environments-3");
    }

    #[tokio::test]
    async fn unknown_project_short_circuits() {
        let fake = Arc::new(FakeReleaseSystem::standard());
        let result = resolver(&fake).deploy("ghost", "42", "qa").await;
        assert_eq!(
            result,
            DeployResult::Error {
                message: "Project 'ghost' not found".into()
            }
        );
        assert_eq!(fake.call_count(), 1);
        assert!(fake.created().is_empty());
    }

    #[tokio::test]
    async fn missing_environment_names_canonical_name() {
        let mut fake = FakeReleaseSystem::standard();
        fake.environments.retain(|e| e.name != "Production");
        let fake = Arc::new(fake);
        let result = resolver(&fake).deploy("myapp", "42", "prod").await;
        assert_eq!(
            result,
            DeployResult::Error {
                message: "Environment 'Production' not found".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_release_is_not_found() {
        let fake = Arc::new(FakeReleaseSystem::standard());
        let err = resolver(&fake)
            .resolve_release("Projects-1", "99")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));
        assert!(err.to_string().contains("#99"));
    }

    #[tokio::test]
    async fn substring_match_takes_most_recent() {
        let mut fake = FakeReleaseSystem::standard();
        fake.releases.insert(
            0,
            ReleaseRef {
                id: "Releases-9".into(),
                version: "1.0.142".into(),
            },
        );
        let fake = Arc::new(fake);
        let id = resolver(&fake)
            .resolve_release("Projects-1", "42")
            .await
            .unwrap();
        assert_eq!(id, "Releases-9");
    }

    #[tokio::test]
    async fn component_match_requires_whole_component() {
        let mut fake = FakeReleaseSystem::standard();
        fake.releases.insert(
            0,
            ReleaseRef {
                id: "Releases-9".into(),
                version: "1.0.142".into(),
            },
        );
        let fake = Arc::new(fake);
        let id = resolver(&fake)
            .with_match(ReleaseMatch::Component)
            .resolve_release("Projects-1", "42")
            .await
            .unwrap();
        assert_eq!(id, "Releases-2");
    }

    #[test]
    fn component_split_covers_prerelease_and_metadata() {
        assert!(ReleaseMatch::Component.matches("2.1.0-42+sha", "42"));
        assert!(ReleaseMatch::Component.matches("2.1.0-rc+42", "42"));
        assert!(!ReleaseMatch::Component.matches("2.1.420", "42"));
        assert!("bogus".parse::<ReleaseMatch>().is_err());
    }

    #[tokio::test]
    async fn rollback_redeploys_second_most_recent() {
        let fake = Arc::new(FakeReleaseSystem::standard());
        let result = resolver(&fake).rollback("myapp", "prod").await;
        assert_eq!(
            result,
            RollbackResult::Triggered {
                rollback_to: "1.0.42".into(),
                deployment_id: "Deployments-1".into(),
            }
        );
        assert_eq!(fake.created()[0].release_id, "Releases-2");
        assert_eq!(fake.created()[0].environment_id, "Environments-3");
    }

    #[tokio::test]
    async fn rollback_without_previous_release_makes_no_deployment() {
        let mut fake = FakeReleaseSystem::standard();
        fake.releases.truncate(1);
        let fake = Arc::new(fake);
        let result = resolver(&fake).rollback("myapp", "uat").await;
        assert_eq!(
            result,
            RollbackResult::Error {
                message: "no previous release".into()
            }
        );
        assert!(fake.created().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_result() {
        let fake = Arc::new(FakeReleaseSystem::unreachable("connection refused"));
        let deploy = resolver(&fake).deploy("myapp", "42", "qa").await;
        match deploy {
            DeployResult::Error { message } => assert!(message.contains("connection refused")),
            other => panic!("expected error, got {other:?}"),
        }
        let rollback = resolver(&fake).rollback("myapp", "qa").await;
        match rollback {
            RollbackResult::Error { message } => assert!(message.starts_with("Rollback error:")),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(matches!(
            resolver(&fake).get_status("myapp").await,
            StatusResult::Error { .. }
        ));
    }

    #[tokio::test]
    async fn status_keeps_first_deployment_per_environment() {
        let mut fake = FakeReleaseSystem::standard();
        let dep = |id: &str, env: &str, rel: &str| DeploymentRef {
            id: id.into(),
            environment_id: env.into(),
            release_id: rel.into(),
            state: "Success".into(),
            created: format!("2026-01-0{}T00:00:00Z", &id[id.len() - 1..]),
        };
        fake.deployments = vec![
            dep("Deployments-3", "Environments-1", "Releases-3"),
            dep("Deployments-2", "Environments-3", "Releases-2"),
            dep("Deployments-1", "Environments-1", "Releases-1"),
        ];
        let fake = Arc::new(fake);
        let StatusResult::Ok { environments } = resolver(&fake).get_status("myapp").await else {
            panic!("expected ok status");
        };
        assert_eq!(environments.len(), 2);
        assert_eq!(environments["Environments-1"].release, "Releases-3");
        assert_eq!(environments["Environments-3"].release, "Releases-2");
    }

    #[tokio::test]
    async fn status_of_unknown_app_is_error() {
        let fake = Arc::new(FakeReleaseSystem::standard());
        assert_eq!(
            resolver(&fake).get_status("ghost").await,
            StatusResult::Error {
                message: "Project 'ghost' not found".into()
            }
        );
    }
}
