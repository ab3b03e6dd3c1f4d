//! Pending approvals and their single resolution.
//!
//! Each approval is resolved exactly once: by an approve or reject response,
//! or by its expiry timer. Both paths remove the entry from the map while
//! holding the lock, so whichever path removes it first wins and the other
//! sees nothing. The response path also aborts the timer inside that same
//! lock window.

use crate::audit::AuditLog;
use crate::outcome::{DeployResult, RejectionResult, RollbackResult};
use crate::reply::{deliver, Reply, ReplyChannel, SharedChannel};
use crate::resolver::ReleaseResolver;
use crate::types::Environment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The action waiting for approval.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub app: String,
    pub build_number: String,
    pub environment: Environment,
    pub requested_by: String,
    pub is_rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub id: String,
    pub app: String,
    pub build_number: String,
    pub environment: Environment,
    pub requested_by: String,
    pub is_rollback: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingApproval {
    fn kind(&self) -> &'static str {
        if self.is_rollback {
            "rollback"
        } else {
            "deploy"
        }
    }
}

struct Entry {
    approval: PendingApproval,
    channel: SharedChannel,
    timer: AbortHandle,
}

type Entries = Arc<Mutex<HashMap<String, Entry>>>;

/// What the resolver returned for an approved action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    Deploy(DeployResult),
    Rollback(RollbackResult),
}

impl ExecutionResult {
    pub fn is_triggered(&self) -> bool {
        match self {
            ExecutionResult::Deploy(r) => r.is_triggered(),
            ExecutionResult::Rollback(r) => r.is_triggered(),
        }
    }

    fn reply(&self) -> Reply {
        match self {
            ExecutionResult::Deploy(DeployResult::Triggered { url, .. }) => {
                Reply::DeploymentStarted { url: url.clone() }
            }
            ExecutionResult::Rollback(RollbackResult::Triggered { rollback_to, .. }) => {
                Reply::RollbackStarted {
                    rollback_to: rollback_to.clone(),
                }
            }
            ExecutionResult::Deploy(DeployResult::Error { message })
            | ExecutionResult::Rollback(RollbackResult::Error { message }) => {
                Reply::DeploymentFailed {
                    message: message.clone(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResponseOutcome {
    AlreadyResolved,
    Rejected {
        approval: PendingApproval,
    },
    Executed {
        approval: PendingApproval,
        result: ExecutionResult,
    },
}

// ---------------------------------------------------------------------------
// ApprovalRegistry
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ApprovalRegistry {
    entries: Entries,
    timeout: Duration,
    resolver: Arc<ReleaseResolver>,
    audit: AuditLog,
}

impl ApprovalRegistry {
    pub fn new(timeout: Duration, resolver: Arc<ReleaseResolver>, audit: AuditLog) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            timeout,
            resolver,
            audit,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a pending approval and start its expiry timer.
    ///
    /// `channel` is where the expiry notice goes if nobody responds in time.
    pub async fn create(&self, request: ApprovalRequest, channel: SharedChannel) -> PendingApproval {
        let mut entries = self.entries.lock().await;
        let mut id = Uuid::new_v4().to_string();
        while entries.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }

        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(self.timeout)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let approval = PendingApproval {
            id: id.clone(),
            app: request.app,
            build_number: request.build_number,
            environment: request.environment,
            requested_by: request.requested_by,
            is_rollback: request.is_rollback,
            created_at,
            expires_at,
        };

        // The timer cannot observe the map until this lock is released,
        // which happens only after the insert below.
        let timer = tokio::spawn(expire(self.entries.clone(), id.clone(), self.timeout))
            .abort_handle();
        entries.insert(
            id.clone(),
            Entry {
                approval: approval.clone(),
                channel,
                timer,
            },
        );
        tracing::info!(
            approval_id = %id,
            app = %approval.app,
            environment = %approval.environment,
            user = %approval.requested_by,
            rollback = approval.is_rollback,
            "approval requested"
        );
        approval
    }

    /// Resolve `id` with an approver's decision. Replies go to `responder`.
    pub async fn handle_response(
        &self,
        id: &str,
        approved: bool,
        approver: &str,
        responder: &dyn ReplyChannel,
    ) -> ResponseOutcome {
        let removed = {
            let mut entries = self.entries.lock().await;
            let entry = entries.remove(id);
            if let Some(entry) = &entry {
                entry.timer.abort();
            }
            entry
        };

        let Some(entry) = removed else {
            tracing::info!(approval_id = %id, user = approver, "approval already resolved");
            deliver(responder, Reply::AlreadyHandled).await;
            return ResponseOutcome::AlreadyResolved;
        };
        let approval = entry.approval;

        if !approved {
            tracing::info!(approval_id = %id, user = approver, app = %approval.app, "approval rejected");
            deliver(
                responder,
                Reply::ApprovalRejected {
                    approver: approver.to_string(),
                    app: approval.app.clone(),
                    build: approval.build_number.clone(),
                    environment: approval.environment,
                    is_rollback: approval.is_rollback,
                },
            )
            .await;
            self.audit
                .log(
                    approver,
                    &format!("{}_rejected", approval.kind()),
                    &approval.app,
                    json!({
                        "env": approval.environment.as_str(),
                        "build": approval.build_number,
                        "requested_by": approval.requested_by,
                    }),
                    &RejectionResult::Rejected {
                        rejected_by: approver.to_string(),
                    },
                )
                .await;
            return ResponseOutcome::Rejected { approval };
        }

        tracing::info!(approval_id = %id, user = approver, app = %approval.app, "approval granted");
        deliver(
            responder,
            Reply::ApprovalAccepted {
                approver: approver.to_string(),
                app: approval.app.clone(),
                build: approval.build_number.clone(),
                environment: approval.environment,
                is_rollback: approval.is_rollback,
            },
        )
        .await;

        let env = approval.environment.as_str();
        let result = if approval.is_rollback {
            ExecutionResult::Rollback(self.resolver.rollback(&approval.app, env).await)
        } else {
            ExecutionResult::Deploy(
                self.resolver
                    .deploy(&approval.app, &approval.build_number, env)
                    .await,
            )
        };

        self.audit
            .log(
                approver,
                &format!("{}_approved", approval.kind()),
                &approval.app,
                json!({
                    "env": env,
                    "build": approval.build_number,
                    "approved_by": approver,
                    "requested_by": approval.requested_by,
                }),
                &result,
            )
            .await;
        deliver(responder, result.reply()).await;

        ResponseOutcome::Executed { approval, result }
    }

    /// Snapshot of pending approvals, oldest first.
    pub async fn pending(&self) -> Vec<PendingApproval> {
        let entries = self.entries.lock().await;
        let mut pending: Vec<PendingApproval> =
            entries.values().map(|e| e.approval.clone()).collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending
    }

    pub async fn get(&self, id: &str) -> Option<PendingApproval> {
        self.entries
            .lock()
            .await
            .get(id)
            .map(|e| e.approval.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn expire(entries: Entries, id: String, after: Duration) {
    tokio::time::sleep(after).await;
    let removed = entries.lock().await.remove(&id);
    let Some(entry) = removed else {
        return;
    };
    tracing::info!(
        approval_id = %id,
        app = %entry.approval.app,
        environment = %entry.approval.environment,
        "approval expired"
    );
    deliver(
        entry.channel.as_ref(),
        Reply::ApprovalExpired {
            app: entry.approval.app.clone(),
            environment: entry.approval.environment,
        },
    )
    .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::MemoryChannel;
    use crate::testkit::FakeReleaseSystem;
    use std::collections::HashSet;

    struct Harness {
        registry: ApprovalRegistry,
        release: Arc<FakeReleaseSystem>,
        audit: AuditLog,
    }

    fn harness_with(release: FakeReleaseSystem, timeout: Duration) -> Harness {
        let release = Arc::new(release);
        let audit = AuditLog::open_in_memory().unwrap();
        let resolver = Arc::new(ReleaseResolver::new(release.clone()));
        Harness {
            registry: ApprovalRegistry::new(timeout, resolver, audit.clone()),
            release,
            audit,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeReleaseSystem::standard(), Duration::from_secs(30 * 60))
    }

    fn prod_deploy() -> ApprovalRequest {
        ApprovalRequest {
            app: "myapp".into(),
            build_number: "42".into(),
            environment: Environment::Prod,
            requested_by: "dana".into(),
            is_rollback: false,
        }
    }

    #[tokio::test]
    async fn create_registers_pending_entry() {
        let h = harness();
        let approval = h.registry.create(prod_deploy(), MemoryChannel::new()).await;
        assert_eq!(h.registry.len().await, 1);
        assert_eq!(h.registry.get(&approval.id).await, Some(approval.clone()));
        assert_eq!(
            approval.expires_at - approval.created_at,
            chrono::Duration::minutes(30)
        );
        assert_eq!(h.release.call_count(), 0);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let h = harness();
        let mut ids = HashSet::new();
        for _ in 0..50 {
            let a = h.registry.create(prod_deploy(), MemoryChannel::new()).await;
            assert!(ids.insert(a.id));
        }
        assert_eq!(h.registry.pending().await.len(), 50);
    }

    #[tokio::test]
    async fn unknown_id_is_already_resolved() {
        let h = harness();
        let responder = MemoryChannel::new();
        let outcome = h
            .registry
            .handle_response("no-such-id", true, "sam", responder.as_ref())
            .await;
        assert_eq!(outcome, ResponseOutcome::AlreadyResolved);
        assert_eq!(responder.replies(), vec![Reply::AlreadyHandled]);
        assert_eq!(h.audit.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn approve_executes_deploy_and_audits() {
        let h = harness();
        let approval = h.registry.create(prod_deploy(), MemoryChannel::new()).await;
        let responder = MemoryChannel::new();
        let outcome = h
            .registry
            .handle_response(&approval.id, true, "sam", responder.as_ref())
            .await;

        let ResponseOutcome::Executed { result, .. } = outcome else {
            panic!("expected executed, got {outcome:?}");
        };
        assert!(result.is_triggered());
        assert_eq!(h.release.created().len(), 1);
        assert_eq!(h.release.created()[0].environment_id, "Environments-3");

        let replies = responder.replies();
        assert!(matches!(replies[0], Reply::ApprovalAccepted { .. }));
        assert!(matches!(replies[1], Reply::DeploymentStarted { .. }));

        let history = h.audit.get_history("myapp", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "deploy_approved");
        assert_eq!(history[0].user, "sam");
        assert_eq!(history[0].result, "triggered");
        assert!(h.registry.is_empty().await);
    }

    #[tokio::test]
    async fn reject_skips_execution_and_audits_rejection() {
        let h = harness();
        let approval = h.registry.create(prod_deploy(), MemoryChannel::new()).await;
        let responder = MemoryChannel::new();
        let outcome = h
            .registry
            .handle_response(&approval.id, false, "sam", responder.as_ref())
            .await;
        assert!(matches!(outcome, ResponseOutcome::Rejected { .. }));
        assert_eq!(h.release.call_count(), 0);
        assert!(matches!(responder.replies()[0], Reply::ApprovalRejected { .. }));

        let history = h.audit.get_history("myapp", 10).await.unwrap();
        assert_eq!(history[0].action, "deploy_rejected");
        assert_eq!(history[0].result, "rejected");
    }

    #[tokio::test]
    async fn approved_rollback_uses_rollback_path() {
        let h = harness();
        let request = ApprovalRequest {
            build_number: "previous".into(),
            is_rollback: true,
            ..prod_deploy()
        };
        let approval = h.registry.create(request, MemoryChannel::new()).await;
        let responder = MemoryChannel::new();
        let outcome = h
            .registry
            .handle_response(&approval.id, true, "sam", responder.as_ref())
            .await;
        let ResponseOutcome::Executed { result, .. } = outcome else {
            panic!("expected executed");
        };
        assert!(matches!(
            result,
            ExecutionResult::Rollback(RollbackResult::Triggered { ref rollback_to, .. }) if rollback_to == "1.0.42"
        ));
        assert!(matches!(responder.replies()[1], Reply::RollbackStarted { .. }));
        let history = h.audit.get_history("myapp", 1).await.unwrap();
        assert_eq!(history[0].action, "rollback_approved");
    }

    #[tokio::test]
    async fn failed_execution_reports_failure() {
        let h = harness_with(
            FakeReleaseSystem::unreachable("connection refused"),
            Duration::from_secs(60),
        );
        let approval = h.registry.create(prod_deploy(), MemoryChannel::new()).await;
        let responder = MemoryChannel::new();
        let outcome = h
            .registry
            .handle_response(&approval.id, true, "sam", responder.as_ref())
            .await;
        assert!(matches!(outcome, ResponseOutcome::Executed { .. }));
        match &responder.replies()[1] {
            Reply::DeploymentFailed { message } => assert!(message.contains("connection refused")),
            other => panic!("expected failure reply, got {other:?}"),
        }
        let history = h.audit.get_history("myapp", 1).await.unwrap();
        assert_eq!(history[0].result, "error");
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_removes_and_notifies_requester() {
        let h = harness();
        let requester = MemoryChannel::new();
        let approval = h.registry.create(prod_deploy(), requester.clone()).await;

        tokio::time::sleep(Duration::from_secs(30 * 60 + 1)).await;

        assert!(h.registry.is_empty().await);
        assert_eq!(
            requester.replies(),
            vec![Reply::ApprovalExpired {
                app: "myapp".into(),
                environment: Environment::Prod,
            }]
        );

        let responder = MemoryChannel::new();
        let outcome = h
            .registry
            .handle_response(&approval.id, true, "sam", responder.as_ref())
            .await;
        assert_eq!(outcome, ResponseOutcome::AlreadyResolved);
        assert_eq!(h.release.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn response_before_expiry_silences_timer() {
        let h = harness();
        let requester = MemoryChannel::new();
        let approval = h.registry.create(prod_deploy(), requester.clone()).await;
        let responder = MemoryChannel::new();
        h.registry
            .handle_response(&approval.id, false, "sam", responder.as_ref())
            .await;

        tokio::time::sleep(Duration::from_secs(31 * 60)).await;
        assert!(requester.replies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_expires_exactly_once() {
        let h = harness_with(FakeReleaseSystem::standard(), Duration::ZERO);
        let requester = MemoryChannel::new();
        let approval = h.registry.create(prod_deploy(), requester.clone()).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let responder = MemoryChannel::new();
        let outcome = h
            .registry
            .handle_response(&approval.id, true, "sam", responder.as_ref())
            .await;
        assert_eq!(outcome, ResponseOutcome::AlreadyResolved);
        assert_eq!(requester.replies().len(), 1);
        assert_eq!(h.release.call_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_responses_have_one_winner() {
        let h = harness();
        let approval = h.registry.create(prod_deploy(), MemoryChannel::new()).await;
        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = h.registry.clone();
            let id = approval.id.clone();
            handles.push(tokio::spawn(async move {
                let responder = MemoryChannel::new();
                registry
                    .handle_response(&id, i % 2 == 0, &format!("approver{i}"), responder.as_ref())
                    .await
            }));
        }
        let mut resolved = 0;
        for handle in handles {
            if handle.await.unwrap() != ResponseOutcome::AlreadyResolved {
                resolved += 1;
            }
        }
        assert_eq!(resolved, 1);
        assert!(h.release.created().len() <= 1);
        assert_eq!(h.audit.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn response_racing_expiry_has_one_terminal_effect() {
        let h = harness_with(FakeReleaseSystem::standard(), Duration::from_micros(200));
        for round in 0..300 {
            let requester = MemoryChannel::new();
            let approval = h.registry.create(prod_deploy(), requester.clone()).await;

            let registry = h.registry.clone();
            let id = approval.id.clone();
            let response = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_micros(150)).await;
                let responder = MemoryChannel::new();
                registry
                    .handle_response(&id, round % 2 == 0, "sam", responder.as_ref())
                    .await
            });
            let outcome = response.await.unwrap();
            // Let a winning timer finish its notification.
            tokio::time::sleep(Duration::from_millis(5)).await;

            let responded = usize::from(outcome != ResponseOutcome::AlreadyResolved);
            let expired = requester
                .replies()
                .iter()
                .filter(|r| matches!(r, Reply::ApprovalExpired { .. }))
                .count();
            assert_eq!(responded + expired, 1, "round {round}: {outcome:?}");
        }
        assert!(h.registry.is_empty().await);
    }

    #[test]
    fn outcome_json_is_tagged() {
        let v = serde_json::to_value(ResponseOutcome::AlreadyResolved).unwrap();
        assert_eq!(v["outcome"], "already_resolved");
    }
}
