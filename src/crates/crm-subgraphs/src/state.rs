//! Shared subgraph input/output contract (spec §4.5).
//!
//! Each domain subgraph is a single-node `langgraph_core::StateGraph`,
//! compiled without a checkpointer — any intermediate state lives only in
//! the invocation. The Coordinator resolves the session token eagerly via
//! the Credential Store before invoking a subgraph, since a subgraph call
//! is a single bounded async hop and has no need for a lazy `getToken()`
//! closure the way the original interface sketch implies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crm_types::{ApprovalDecision, ApprovalRequest, Domain, ErrorClass, ExtractedEntity, MemoryContext};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphInput {
    pub messages: Vec<String>,
    #[serde(default)]
    pub memory_context: MemoryContext,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    pub timezone: String,
    pub session_id: String,
    pub org_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub thread_id: String,
    pub token: String,
    /// Keyed by `Domain::as_str()` — prior results from upstream steps in a
    /// sequential execution (spec §4.6 step 6).
    #[serde(default)]
    pub dependencies: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub approval_decision: Option<ApprovalDecision>,
    /// The requests this domain had pending when `approval_decision` was
    /// collected, so a resume can tell which proposal a decision applies to
    /// without re-deriving it from the query (spec §4.5, §4.6 step 7).
    #[serde(default)]
    pub pending_requests: Vec<ApprovalRequest>,
}

impl SubgraphInput {
    /// The id of a contact a prior sequential step already resolved, if this
    /// domain depends on `Contact` (spec §4.6 step 6, §8 scenario 2).
    pub fn resolved_contact_id(&self) -> Option<String> {
        self.dependencies
            .get(Domain::Contact.as_str())
            .and_then(|v| v.get("contact"))
            .and_then(|c| c.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string)
    }

    /// The decision and original request for this domain's pending action,
    /// if a resume is in progress and this domain had one outstanding.
    pub fn pending_decision_for(&self, domain: Domain) -> Option<(&ApprovalRequest, &crm_types::Decision)> {
        let request = self.pending_requests.iter().find(|r| r.domain == domain)?;
        let decision = self.approval_decision.as_ref()?.decisions.get(&request.action_id)?;
        Some((request, decision))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubgraphResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubgraphOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SubgraphResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set alongside `error` when it came from a classified CRM call
    /// failure, so the Coordinator can tell an auth failure worth a
    /// refresh-and-retry apart from anything else (spec §4.1, §4.3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_request: Option<ApprovalRequest>,
}

impl SubgraphOutput {
    pub fn ok(response: impl Into<String>) -> Self {
        Self { result: Some(SubgraphResult { response: Some(response.into()), data: None }), ..Default::default() }
    }

    pub fn ok_with_data(response: impl Into<String>, data: serde_json::Value) -> Self {
        Self { result: Some(SubgraphResult { response: Some(response.into()), data: Some(data) }), ..Default::default() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), ..Default::default() }
    }

    /// An error surfaced from a classified CRM call failure (spec §4.3).
    pub fn error_with_class(message: impl Into<String>, class: ErrorClass) -> Self {
        Self { error: Some(message.into()), error_class: Some(class), ..Default::default() }
    }

    pub fn needs_approval(request: ApprovalRequest) -> Self {
        Self { requires_approval: true, approval_request: Some(request), ..Default::default() }
    }
}
