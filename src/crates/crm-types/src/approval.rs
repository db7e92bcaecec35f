//! Approval request/decision entities (spec §3, §4.5, §4.6).

use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A proposed side-effectful action a subgraph wants a human to approve
/// before it mutates the CRM. `preview` is human-readable and must never
/// contain secrets; `data` is the machine payload the subgraph needs to
/// apply the action once approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub action_id: String,
    pub domain: Domain,
    pub action: String,
    pub preview: String,
    pub data: serde_json::Value,
}

/// A client decision for one `action_id`. `Selection` covers structured
/// picks such as "which contact did you mean" (spec §4.5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    Selection { value: serde_json::Value },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub decisions: HashMap<String, Decision>,
}

impl ApprovalDecision {
    pub fn single(action_id: impl Into<String>, decision: Decision) -> Self {
        let mut decisions = HashMap::new();
        decisions.insert(action_id.into(), decision);
        Self { decisions }
    }

    /// Every `action_id` named in `requests` must appear here; unknown ids
    /// in `self` are rejected by the caller, not silently accepted (spec §3).
    pub fn covers(&self, requests: &[ApprovalRequest]) -> bool {
        requests.iter().all(|r| self.decisions.contains_key(&r.action_id))
    }

    pub fn has_unknown_ids(&self, requests: &[ApprovalRequest]) -> bool {
        let known: std::collections::HashSet<&str> =
            requests.iter().map(|r| r.action_id.as_str()).collect();
        self.decisions.keys().any(|id| !known.contains(id.as_str()))
    }
}

/// Pending approval block owned exclusively by the Coordinator (spec §4.6
/// step 7, "Approval collection").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingApproval {
    pub domains: Vec<Domain>,
    pub results: serde_json::Value,
    pub requests: Vec<ApprovalRequest>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(id: &str) -> ApprovalRequest {
        ApprovalRequest {
            action_id: id.to_string(),
            domain: Domain::Calendar,
            action: "create_appointment".to_string(),
            preview: "30-min call with Alex tomorrow at 10am".to_string(),
            data: serde_json::json!({}),
        }
    }

    #[test]
    fn covers_requires_a_decision_per_request() {
        let reqs = vec![req("a1"), req("a2")];
        let partial = ApprovalDecision::single("a1", Decision::Approve);
        assert!(!partial.covers(&reqs));

        let mut full = partial;
        full.decisions.insert("a2".to_string(), Decision::Reject);
        assert!(full.covers(&reqs));
    }

    #[test]
    fn unknown_action_id_is_flagged() {
        let reqs = vec![req("a1")];
        let decision = ApprovalDecision::single("unknown", Decision::Approve);
        assert!(decision.has_unknown_ids(&reqs));
    }
}
