//! Outbound messages and the channels that carry them.
//!
//! Each [`Reply`] variant is one kind of message or card. Rendering rich
//! cards is the transport's job; [`Reply::text`] gives the plain-text form.
//!
//! Delivery is best-effort: [`deliver`] logs and discards channel failures so
//! that an unreachable conversation can never fail the operation that
//! produced the message. Callers rely on this and do not check the result.

use crate::audit::HistoryEntry;
use crate::outcome::EnvironmentStatus;
use crate::types::Environment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Data handed to the card renderer when an action needs approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub approval_id: String,
    pub app: String,
    pub build: String,
    pub environment: Environment,
    pub requested_by: String,
    pub is_rollback: bool,
    pub expires_in_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Help {
        approval_environments: Vec<Environment>,
    },
    Error {
        message: String,
    },
    BuildTriggered {
        app: String,
        branch: String,
        user: String,
    },
    DeployTriggered {
        app: String,
        build: String,
        environment: Environment,
        user: String,
        url: String,
    },
    ReviewRequest(ReviewRequest),
    Status {
        app: String,
        environments: BTreeMap<String, EnvironmentStatus>,
    },
    History {
        app: String,
        entries: Vec<HistoryEntry>,
    },
    ApprovalAccepted {
        approver: String,
        app: String,
        build: String,
        environment: Environment,
        is_rollback: bool,
    },
    ApprovalRejected {
        approver: String,
        app: String,
        build: String,
        environment: Environment,
        is_rollback: bool,
    },
    ApprovalExpired {
        app: String,
        environment: Environment,
    },
    AlreadyHandled,
    DeploymentStarted {
        url: String,
    },
    RollbackStarted {
        rollback_to: String,
    },
    DeploymentFailed {
        message: String,
    },
}

fn action_label(is_rollback: bool) -> &'static str {
    if is_rollback {
        "rollback"
    } else {
        "deployment"
    }
}

impl Reply {
    /// Plain-text rendering for transports without card support.
    pub fn text(&self) -> String {
        match self {
            Reply::Help {
                approval_environments,
            } => {
                let mut lines = vec![
                    "Commands:".to_string(),
                    "  build <app> <branch>          trigger a build".to_string(),
                    "  deploy <app> <build#> <env>   deploy to qa / uat / prod".to_string(),
                    "  status <app>                  latest deployment per environment"
                        .to_string(),
                    "  rollback <app> <env>          roll back to the previous release"
                        .to_string(),
                    "  history <app>                 last 10 actions for an app".to_string(),
                ];
                if !approval_environments.is_empty() {
                    let envs: Vec<String> =
                        approval_environments.iter().map(|e| e.upper()).collect();
                    lines.push(format!(
                        "{} deployments and all rollbacks require approval.",
                        envs.join(" and ")
                    ));
                }
                lines.join("\n")
            }
            Reply::Error { message } => {
                format!("Error: {message}\nType `help` to see all available commands.")
            }
            Reply::BuildTriggered { app, branch, user } => {
                format!("Build triggered for `{app}` on `{branch}` by {user}.")
            }
            Reply::DeployTriggered {
                app,
                build,
                environment,
                user,
                url,
            } => format!(
                "Deploying `{app}` build #{build} to {} (triggered by {user}). {url}",
                environment.upper()
            ),
            Reply::ReviewRequest(r) => {
                let (label, action) = if r.is_rollback {
                    (
                        "Rollback",
                        format!(
                            "roll back `{}` in {} to the previous release",
                            r.app,
                            r.environment.upper()
                        ),
                    )
                } else {
                    (
                        "Deployment",
                        format!(
                            "deploy `{}` build #{} to {}",
                            r.app,
                            r.build,
                            r.environment.upper()
                        ),
                    )
                };
                format!(
                    "{label} approval required: {} wants to {action}. \
                     Approval id {} expires in {} minutes.",
                    r.requested_by, r.approval_id, r.expires_in_minutes
                )
            }
            Reply::Status { app, environments } => {
                if environments.is_empty() {
                    return format!("Status: {app}\nNo deployments found for this app.");
                }
                let mut lines = vec![format!("Status: {app}")];
                for (env, info) in environments {
                    lines.push(format!(
                        "  {}: release {} ({}) {}",
                        env.to_uppercase(),
                        info.release,
                        info.state,
                        info.created
                    ));
                }
                lines.join("\n")
            }
            Reply::History { app, entries } => {
                let mut lines = vec![format!("Last {} actions for `{app}`:", entries.len())];
                for e in entries {
                    lines.push(format!(
                        "  {} by {} -> {} ({})",
                        e.action, e.user, e.result, e.timestamp
                    ));
                }
                lines.join("\n")
            }
            Reply::ApprovalAccepted {
                approver,
                app,
                build,
                environment,
                is_rollback,
            } => format!(
                "{approver} approved the {} of `{app}` build #{build} to {}. Executing...",
                action_label(*is_rollback),
                environment.upper()
            ),
            Reply::ApprovalRejected {
                approver,
                app,
                build,
                environment,
                is_rollback,
            } => format!(
                "{approver} rejected the {} of `{app}` build #{build} to {}.",
                action_label(*is_rollback),
                environment.upper()
            ),
            Reply::ApprovalExpired { app, environment } => format!(
                "Approval request for `{app}` to {} has expired.",
                environment.upper()
            ),
            Reply::AlreadyHandled => {
                "This approval request has already been handled or expired.".to_string()
            }
            Reply::DeploymentStarted { url } => format!("Deployment triggered! {url}"),
            Reply::RollbackStarted { rollback_to } => {
                format!("Rollback triggered, reverting to release {rollback_to}.")
            }
            Reply::DeploymentFailed { message } => format!("Deployment failed: {message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("reply channel unreachable: {0}")]
    Unreachable(String),

    #[error("reply channel refused the message: {0}")]
    Refused(String),
}

/// A route back to the conversation that issued a command.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    async fn send(&self, reply: &Reply) -> Result<(), NotifyError>;

    /// Short label used in log lines.
    fn describe(&self) -> String {
        "channel".to_string()
    }
}

pub type SharedChannel = Arc<dyn ReplyChannel>;

/// Send `reply` on `channel`, logging and discarding any failure.
pub async fn deliver(channel: &dyn ReplyChannel, reply: Reply) {
    if let Err(e) = channel.send(&reply).await {
        tracing::warn!(channel = %channel.describe(), error = %e, "reply not delivered");
    }
}

/// Collects replies in memory. Used by the CLI and by tests.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    replies: Mutex<Vec<Reply>>,
}

impl MemoryChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replies(&self) -> Vec<Reply> {
        match self.replies.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.replies().iter().map(Reply::text).collect()
    }
}

#[async_trait]
impl ReplyChannel for MemoryChannel {
    async fn send(&self, reply: &Reply) -> Result<(), NotifyError> {
        match self.replies.lock() {
            Ok(mut guard) => guard.push(reply.clone()),
            Err(poisoned) => poisoned.into_inner().push(reply.clone()),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Writes replies to the log. Used when a request carries no reply route.
#[derive(Debug, Default, Clone)]
pub struct LogChannel {
    pub conversation: String,
}

#[async_trait]
impl ReplyChannel for LogChannel {
    async fn send(&self, reply: &Reply) -> Result<(), NotifyError> {
        tracing::info!(conversation = %self.conversation, reply = %reply.text(), "reply");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("log:{}", self.conversation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
