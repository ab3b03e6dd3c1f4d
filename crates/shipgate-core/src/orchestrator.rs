//! Command dispatch: run now, or gate behind an approval.
//!
//! Builds, status and history run immediately. Deploys to an environment in
//! the approval-required set and every rollback go through the
//! [`ApprovalRegistry`]; everything else executes on the spot.
//!
//! Replies are sent on the request's channel. The returned [`Dispatch`]
//! summarises what happened for the caller (HTTP response body, CLI output).

use crate::approval::{ApprovalRegistry, ApprovalRequest, PendingApproval};
use crate::audit::{AuditLog, HistoryEntry};
use crate::command::{parse, Command};
use crate::config::Config;
use crate::outcome::{BuildResult, DeployResult, StatusResult};
use crate::reply::{deliver, Reply, ReviewRequest, SharedChannel};
use crate::resolver::ReleaseResolver;
use crate::systems::{SharedBuildSystem, SharedReleaseSystem};
use crate::types::{ActionKind, Environment};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

pub const HISTORY_LIMIT: u32 = 10;

/// Build number recorded for rollback approvals.
pub const ROLLBACK_BUILD: &str = "previous";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dispatch", rename_all = "snake_case")]
pub enum Dispatch {
    Help,
    Invalid { message: String },
    BuildTriggered { app: String, result: BuildResult },
    Deployed { app: String, result: DeployResult },
    AwaitingApproval { approval: PendingApproval },
    Status { app: String, result: StatusResult },
    History { app: String, entries: Vec<HistoryEntry> },
    Failed { message: String },
}

pub struct Orchestrator {
    environments: Vec<Environment>,
    required_environments: Vec<Environment>,
    resolver: Arc<ReleaseResolver>,
    builds: SharedBuildSystem,
    approvals: ApprovalRegistry,
    audit: AuditLog,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        release: SharedReleaseSystem,
        builds: SharedBuildSystem,
        audit: AuditLog,
    ) -> Self {
        let resolver = Arc::new(ReleaseResolver::from_config(release, &config.release));
        let approvals =
            ApprovalRegistry::new(config.approval.timeout(), resolver.clone(), audit.clone());
        Self {
            environments: config.environments.clone(),
            required_environments: config.approval.required_environments.clone(),
            resolver,
            builds,
            approvals,
            audit,
        }
    }

    pub fn approvals(&self) -> &ApprovalRegistry {
        &self.approvals
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn requires_approval(&self, env: Environment) -> bool {
        self.required_environments.contains(&env)
    }

    /// Parse `text` and dispatch it on behalf of `user`.
    pub async fn handle_message(&self, text: &str, user: &str, channel: SharedChannel) -> Dispatch {
        let command = parse(text);
        tracing::debug!(user, action = %command.action, raw = %command.raw, "command parsed");
        self.dispatch(command, user, channel).await
    }

    pub async fn dispatch(&self, command: Command, user: &str, channel: SharedChannel) -> Dispatch {
        if let Some(message) = command.error {
            deliver(channel.as_ref(), Reply::Error { message: message.clone() }).await;
            return Dispatch::Invalid { message };
        }

        match (command.action, command.app, command.environment) {
            (ActionKind::Help, _, _) | (ActionKind::Unknown, _, _) => {
                deliver(
                    channel.as_ref(),
                    Reply::Help {
                        approval_environments: self.required_environments.clone(),
                    },
                )
                .await;
                Dispatch::Help
            }
            (ActionKind::Build, Some(app), _) => {
                let branch = command.branch.unwrap_or_default();
                self.build(app, branch, user, &channel).await
            }
            (ActionKind::Deploy, Some(app), Some(env)) => {
                let build = command.build_number.unwrap_or_default();
                self.deploy(app, build, env, user, &channel).await
            }
            (ActionKind::Rollback, Some(app), Some(env)) => {
                self.rollback(app, env, user, &channel).await
            }
            (ActionKind::Status, Some(app), _) => self.status(app, &channel).await,
            (ActionKind::History, Some(app), _) => self.history(app, &channel).await,
            (action, _, _) => {
                let message = format!("Incomplete `{action}` command.");
                deliver(channel.as_ref(), Reply::Error { message: message.clone() }).await;
                Dispatch::Invalid { message }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    async fn build(&self, app: String, branch: String, user: &str, channel: &SharedChannel) -> Dispatch {
        let result = match self.builds.trigger_build(&app, &branch).await {
            Ok(receipt) => BuildResult::Triggered {
                job: receipt.job,
                queue_item: receipt.queue_item,
            },
            Err(e) => {
                tracing::warn!(app = %app, branch = %branch, error = %e, "build trigger failed");
                BuildResult::Error {
                    message: format!("Build system error: {e}"),
                }
            }
        };
        self.audit
            .log(user, "build", &app, json!({ "branch": branch }), &result)
            .await;

        let reply = match &result {
            BuildResult::Triggered { .. } => Reply::BuildTriggered {
                app: app.clone(),
                branch,
                user: user.to_string(),
            },
            BuildResult::Error { message } => Reply::Error {
                message: message.clone(),
            },
        };
        deliver(channel.as_ref(), reply).await;
        Dispatch::BuildTriggered { app, result }
    }

    async fn deploy(
        &self,
        app: String,
        build: String,
        env: Environment,
        user: &str,
        channel: &SharedChannel,
    ) -> Dispatch {
        if let Some(dispatch) = self.reject_disabled(env, channel).await {
            return dispatch;
        }

        if self.requires_approval(env) {
            let request = ApprovalRequest {
                app,
                build_number: build,
                environment: env,
                requested_by: user.to_string(),
                is_rollback: false,
            };
            return self.gate(request, channel).await;
        }

        let result = self.resolver.deploy(&app, &build, env.as_str()).await;
        // A failed attempt without a granted approval leaves no record.
        if result.is_triggered() {
            self.audit
                .log(
                    user,
                    "deploy",
                    &app,
                    json!({ "build": build, "env": env.as_str() }),
                    &result,
                )
                .await;
        }

        let reply = match &result {
            DeployResult::Triggered { url, .. } => Reply::DeployTriggered {
                app: app.clone(),
                build,
                environment: env,
                user: user.to_string(),
                url: url.clone(),
            },
            DeployResult::Error { message } => Reply::DeploymentFailed {
                message: message.clone(),
            },
        };
        deliver(channel.as_ref(), reply).await;
        Dispatch::Deployed { app, result }
    }

    async fn rollback(
        &self,
        app: String,
        env: Environment,
        user: &str,
        channel: &SharedChannel,
    ) -> Dispatch {
        if let Some(dispatch) = self.reject_disabled(env, channel).await {
            return dispatch;
        }
        let request = ApprovalRequest {
            app,
            build_number: ROLLBACK_BUILD.to_string(),
            environment: env,
            requested_by: user.to_string(),
            is_rollback: true,
        };
        self.gate(request, channel).await
    }

    async fn gate(&self, request: ApprovalRequest, channel: &SharedChannel) -> Dispatch {
        let approval = self.approvals.create(request, channel.clone()).await;
        let review = ReviewRequest {
            approval_id: approval.id.clone(),
            app: approval.app.clone(),
            build: approval.build_number.clone(),
            environment: approval.environment,
            requested_by: approval.requested_by.clone(),
            is_rollback: approval.is_rollback,
            expires_in_minutes: self.approvals.timeout().as_secs() / 60,
        };
        deliver(channel.as_ref(), Reply::ReviewRequest(review)).await;
        Dispatch::AwaitingApproval { approval }
    }

    async fn status(&self, app: String, channel: &SharedChannel) -> Dispatch {
        let result = self.resolver.get_status(&app).await;
        let reply = match &result {
            StatusResult::Ok { environments } => Reply::Status {
                app: app.clone(),
                environments: environments.clone(),
            },
            StatusResult::Error { message } => Reply::Error {
                message: message.clone(),
            },
        };
        deliver(channel.as_ref(), reply).await;
        Dispatch::Status { app, result }
    }

    async fn history(&self, app: String, channel: &SharedChannel) -> Dispatch {
        match self.audit.get_history(&app, HISTORY_LIMIT).await {
            Ok(entries) => {
                deliver(
                    channel.as_ref(),
                    Reply::History {
                        app: app.clone(),
                        entries: entries.clone(),
                    },
                )
                .await;
                Dispatch::History { app, entries }
            }
            Err(e) => {
                tracing::error!(app = %app, error = %e, "history query failed");
                let message = format!("Could not read history for `{app}`");
                deliver(channel.as_ref(), Reply::Error { message: message.clone() }).await;
                Dispatch::Failed { message }
            }
        }
    }

    async fn reject_disabled(&self, env: Environment, channel: &SharedChannel) -> Option<Dispatch> {
        if self.environments.contains(&env) {
            return None;
        }
        let enabled: Vec<&str> = self.environments.iter().map(|e| e.as_str()).collect();
        let message = format!(
            "Environment `{env}` is not enabled. Choose from: {}",
            enabled.join(", ")
        );
        deliver(channel.as_ref(), Reply::Error { message: message.clone() }).await;
        Some(Dispatch::Invalid { message })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
