//! Structured results of collaborator-facing operations.
//!
//! Every variant serializes with a `status` tag so the audit ledger can
//! reduce any stored result to its status string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeployResult {
    Triggered { deployment_id: String, url: String },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RollbackResult {
    Triggered {
        rollback_to: String,
        deployment_id: String,
    },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildResult {
    Triggered {
        job: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        queue_item: Option<u64>,
    },
    Error { message: String },
}

/// Latest deployment seen for one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentStatus {
    pub release: String,
    pub state: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusResult {
    Ok {
        environments: BTreeMap<String, EnvironmentStatus>,
    },
    Error { message: String },
}

/// Result stored for a rejected approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RejectionResult {
    Rejected { rejected_by: String },
}

impl DeployResult {
    pub fn is_triggered(&self) -> bool {
        matches!(self, DeployResult::Triggered { .. })
    }
}

impl RollbackResult {
    pub fn is_triggered(&self) -> bool {
        matches!(self, RollbackResult::Triggered { .. })
    }
}

impl BuildResult {
    pub fn is_triggered(&self) -> bool {
        matches!(self, BuildResult::Triggered { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_carry_status_tag() {
        let deploy = DeployResult::Triggered {
            deployment_id: "Deployments-7".into(),
            url: "https://octo/app#/Spaces-1/deployments/Deployments-7".into(),
        };
        let v = serde_json::to_value(&deploy).unwrap();
        assert_eq!(v["status"], "triggered");
        assert_eq!(v["deployment_id"], "Deployments-7");

        let err = RollbackResult::Error {
            message: "no previous release".into(),
        };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["message"], "no previous release");
    }

    #[test]
    fn build_result_omits_missing_queue_item() {
        let v = serde_json::to_value(BuildResult::Triggered {
            job: "build-pipeline".into(),
            queue_item: None,
        })
        .unwrap();
        assert!(v.get("queue_item").is_none());
    }
}
