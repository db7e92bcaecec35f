//! Workflow shells and steps (spec §4.5.4): shell creation, ≤22-step
//! sequential append with cap enforcement.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crm_types::Envelope;

use crate::client::CrmClient;
use crate::error::{DomainToolError, Result};

pub const MAX_STEPS: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ActivityType {
    Task,
    Appointment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeType {
    Owner,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub sequence: u32,
    pub subject: String,
    pub activity_type: ActivityType,
    pub day_offset: i32,
    pub assignee_type: AssigneeType,
    pub roll_over: bool,
    pub all_day: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowParams {
    pub name: String,
}

/// Result of an append attempt: some steps may have succeeded before one
/// failed. No rollback is performed (spec §4.5.4).
#[derive(Debug, Clone, Serialize)]
pub struct StepAppendOutcome {
    pub steps_added: usize,
    pub total_steps: usize,
    pub steps: Vec<WorkflowStep>,
}

pub async fn create_shell(client: &CrmClient, token: &str, org_id: &str, params: CreateWorkflowParams) -> Envelope {
    client.mutate("/workflows", token, org_id, json!(params)).await
}

/// Appends `steps` one at a time, stopping at the first failure and
/// reporting how many made it in, without undoing the ones that did.
pub async fn append_steps(client: &CrmClient, token: &str, org_id: &str, workflow_id: &str, steps: Vec<WorkflowStep>) -> Result<StepAppendOutcome> {
    if steps.len() > MAX_STEPS {
        return Err(DomainToolError::Request(format!("workflow step count {} exceeds the {} step cap", steps.len(), MAX_STEPS)));
    }

    let total_steps = steps.len();
    let mut added = Vec::with_capacity(total_steps);
    for step in steps {
        let envelope = client
            .mutate("/workflows/steps", token, org_id, json!({ "workflow_id": workflow_id, "step": step }))
            .await;
        if !envelope.is_valid() {
            break;
        }
        added.push(step);
    }

    Ok(StepAppendOutcome { steps_added: added.len(), total_steps, steps: added })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(sequence: u32) -> WorkflowStep {
        WorkflowStep {
            sequence,
            subject: format!("step {sequence}"),
            activity_type: ActivityType::Task,
            day_offset: sequence as i32,
            assignee_type: AssigneeType::Owner,
            roll_over: false,
            all_day: false,
        }
    }

    #[tokio::test]
    async fn append_steps_rejects_more_than_the_cap_before_any_network_call() {
        let client = CrmClient::new("http://localhost").unwrap();
        let steps: Vec<_> = (0..MAX_STEPS as u32 + 1).map(step).collect();
        let err = append_steps(&client, "tok", "org", "wf-1", steps).await.unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }
}
