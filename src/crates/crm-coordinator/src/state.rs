//! Coordinator turn state (spec §4.6): persisted to the checkpoint store
//! between turns. Shaped after the teacher's `WorkflowExecutionState`
//! (`step`/`status`/`results`/`error` as plain data, not stack-unwound
//! control flow) generalized from one task graph to the Coordinator's six
//! nodes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crm_subgraphs::SubgraphOutput;
use crm_types::{ApprovalDecision, Domain, ExecutionPlan, ExtractedEntity, MemoryContext, PendingApproval};

/// What the caller supplies to start or resume a turn (spec §6
/// `/api/agent/execute` and `/api/agent/approve` request bodies).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnInput {
    pub query: String,
    pub session_id: String,
    pub org_id: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub approval_decision: Option<ApprovalDecision>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// The Coordinator's persisted state. One of these lives per `thread_id`
/// checkpoint lineage (spec §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorState {
    pub thread_id: String,
    pub session_id: String,
    pub org_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub timezone: String,
    pub messages: Vec<String>,
    #[serde(default)]
    pub memory_context: MemoryContext,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub plan: Option<ExecutionPlan>,
    /// Keyed by `Domain::as_str()` (spec §4.6 step 5 "restore the prior
    /// `results` block").
    #[serde(default)]
    pub results: HashMap<String, SubgraphOutput>,
    #[serde(default)]
    pub pending_approval: Option<PendingApproval>,
    #[serde(default)]
    pub approval_decision: Option<ApprovalDecision>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub final_response: Option<String>,
}

impl CoordinatorState {
    pub fn new(thread_id: impl Into<String>, session_id: impl Into<String>, org_id: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            session_id: session_id.into(),
            org_id: org_id.into(),
            timezone: timezone.into(),
            ..Default::default()
        }
    }
}

/// Result of a single turn, returned to the HTTP layer (spec §6
/// `/api/agent/execute` response shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnOutcome {
    Completed { response: String, entities: Vec<ExtractedEntity>, domains: Vec<Domain> },
    PendingApproval { thread_id: String, previews: Vec<String>, message: String, domains: Vec<Domain> },
    RequiresReauth,
    Failed { message: String },
}
