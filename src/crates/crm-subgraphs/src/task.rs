//! Task subgraph (spec §4.5.3): window fetch, create/update/complete/
//! delete, contact linking, bare-date to full-day ISO conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crm_domain_tools::tasks::{self, CreateTaskParams, LinkTaskParams, TaskWindowParams, UpdateTaskParams};
use crm_domain_tools::CrmClient;
use crm_types::{ApprovalRequest, Decision, Domain, Envelope};

use crate::dates::resolve_window;
use crate::state::{SubgraphInput, SubgraphOutput};

/// What gets proposed for a `create_task` action: the task itself, plus an
/// optional contact to link once it's created (spec §8 scenario 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskProposal {
    params: CreateTaskParams,
    #[serde(default)]
    linked_contact_id: Option<String>,
}

pub async fn list_window(input: &SubgraphInput, client: &CrmClient, start: DateTime<Utc>, end: DateTime<Utc>) -> SubgraphOutput {
    match tasks::list_window(client, &input.token, &input.org_id, TaskWindowParams { start, end }).await {
        Envelope::Valid { data } => SubgraphOutput::ok_with_data("Here are the tasks in that window.", data),
        Envelope::Invalid { error } => SubgraphOutput::error_with_class(format!("couldn't fetch tasks: {}", error.message), error.class),
    }
}

pub fn propose_create(subject: &str, due: DateTime<Utc>, notes: Option<String>, linked_contact_id: Option<String>) -> SubgraphOutput {
    let params = CreateTaskParams { subject: subject.to_string(), due, notes };
    let mut preview = format!("Create task \"{subject}\" due {due}");
    if linked_contact_id.is_some() {
        preview.push_str(" and link it to the contact");
    }
    let proposal = TaskProposal { params, linked_contact_id };
    SubgraphOutput::needs_approval(ApprovalRequest {
        action_id: Uuid::new_v4().to_string(),
        domain: Domain::Task,
        action: "create_task".to_string(),
        preview,
        data: serde_json::to_value(&proposal).unwrap(),
    })
}

/// Creates the task and, when a contact was resolved upstream, links it
/// immediately afterward (spec §8 scenario 2).
pub async fn apply_create(input: &SubgraphInput, client: &CrmClient, params: CreateTaskParams, linked_contact_id: Option<String>) -> SubgraphOutput {
    let created = match tasks::create(client, &input.token, &input.org_id, params).await {
        Envelope::Valid { data } => data,
        Envelope::Invalid { error } => return SubgraphOutput::error_with_class(format!("couldn't create the task: {}", error.message), error.class),
    };

    let Some(contact_id) = linked_contact_id else {
        return SubgraphOutput::ok_with_data("Task created.", created);
    };

    let task_id = created.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    match apply_link(input, client, LinkTaskParams { task_id, contact_id }).await {
        SubgraphOutput { error: Some(message), .. } => SubgraphOutput::ok_with_data(format!("Task created, but linking the contact failed: {message}"), created),
        _ => SubgraphOutput::ok_with_data("Task created and linked to the contact.", created),
    }
}

pub fn propose_update(task_id: &str, subject: Option<String>, due: Option<DateTime<Utc>>) -> SubgraphOutput {
    let params = UpdateTaskParams { task_id: task_id.to_string(), subject, due };
    SubgraphOutput::needs_approval(ApprovalRequest {
        action_id: Uuid::new_v4().to_string(),
        domain: Domain::Task,
        action: "update_task".to_string(),
        preview: format!("Update task {task_id}"),
        data: serde_json::to_value(&params).unwrap(),
    })
}

pub async fn apply_update(input: &SubgraphInput, client: &CrmClient, params: UpdateTaskParams) -> SubgraphOutput {
    match tasks::update(client, &input.token, &input.org_id, params).await {
        Envelope::Valid { .. } => SubgraphOutput::ok("Task updated."),
        Envelope::Invalid { error } => SubgraphOutput::error_with_class(format!("couldn't update the task: {}", error.message), error.class),
    }
}

pub fn propose_complete(task_id: &str) -> SubgraphOutput {
    SubgraphOutput::needs_approval(ApprovalRequest {
        action_id: Uuid::new_v4().to_string(),
        domain: Domain::Task,
        action: "complete_task".to_string(),
        preview: format!("Mark task {task_id} complete"),
        data: serde_json::json!({ "task_id": task_id }),
    })
}

pub async fn apply_complete(input: &SubgraphInput, client: &CrmClient, task_id: &str) -> SubgraphOutput {
    match tasks::complete(client, &input.token, &input.org_id, task_id).await {
        Envelope::Valid { .. } => SubgraphOutput::ok("Task completed."),
        Envelope::Invalid { error } => SubgraphOutput::error_with_class(format!("couldn't complete the task: {}", error.message), error.class),
    }
}

pub fn propose_delete(task_id: &str) -> SubgraphOutput {
    SubgraphOutput::needs_approval(ApprovalRequest {
        action_id: Uuid::new_v4().to_string(),
        domain: Domain::Task,
        action: "delete_task".to_string(),
        preview: format!("Delete task {task_id}"),
        data: serde_json::json!({ "task_id": task_id }),
    })
}

pub async fn apply_delete(input: &SubgraphInput, client: &CrmClient, task_id: &str) -> SubgraphOutput {
    match tasks::delete(client, &input.token, &input.org_id, task_id).await {
        Envelope::Valid { .. } => SubgraphOutput::ok("Task deleted."),
        Envelope::Invalid { error } => SubgraphOutput::error_with_class(format!("couldn't delete the task: {}", error.message), error.class),
    }
}

pub async fn apply_link(input: &SubgraphInput, client: &CrmClient, params: LinkTaskParams) -> SubgraphOutput {
    match tasks::link_contact(client, &input.token, &input.org_id, params).await {
        Envelope::Valid { .. } => SubgraphOutput::ok("Linked."),
        Envelope::Invalid { error } => SubgraphOutput::error_with_class(format!("couldn't link: {}", error.message), error.class),
    }
}

/// Consumes a pending decision for this domain, dispatching to the matching
/// `apply_*` rather than re-proposing the same action (spec §4.5, §4.6 step
/// 7). Returns `None` when there's nothing pending to resume.
async fn apply_pending(input: &SubgraphInput, client: &CrmClient) -> Option<SubgraphOutput> {
    let (request, decision) = input.pending_decision_for(Domain::Task)?;
    Some(match decision {
        Decision::Reject => SubgraphOutput::ok("Okay, I won't do that."),
        _ => match request.action.as_str() {
            "create_task" => match serde_json::from_value::<TaskProposal>(request.data.clone()) {
                Ok(proposal) => apply_create(input, client, proposal.params, proposal.linked_contact_id).await,
                Err(err) => SubgraphOutput::error(format!("couldn't decode the pending task: {err}")),
            },
            "update_task" => match serde_json::from_value::<UpdateTaskParams>(request.data.clone()) {
                Ok(params) => apply_update(input, client, params).await,
                Err(err) => SubgraphOutput::error(format!("couldn't decode the pending update: {err}")),
            },
            "complete_task" => match request.data.get("task_id").and_then(|v| v.as_str()) {
                Some(task_id) => apply_complete(input, client, task_id).await,
                None => SubgraphOutput::error("pending completion is missing a task_id"),
            },
            "delete_task" => match request.data.get("task_id").and_then(|v| v.as_str()) {
                Some(task_id) => apply_delete(input, client, task_id).await,
                None => SubgraphOutput::error("pending deletion is missing a task_id"),
            },
            other => SubgraphOutput::error(format!("unknown pending task action: {other}")),
        },
    })
}

/// Entry point used by the Coordinator: resumes a pending decision if one is
/// outstanding, otherwise resolves the window and decides read vs. create
/// based on the query's verb.
pub async fn run(input: SubgraphInput, client: &CrmClient, now: DateTime<Utc>) -> SubgraphOutput {
    if let Some(output) = apply_pending(&input, client).await {
        return output;
    }

    let query = input.messages.last().cloned().unwrap_or_default();
    let lower = query.to_lowercase();

    if lower.contains("add") || lower.contains("create") {
        let Some((due, _)) = resolve_window(&query, now, &input.timezone) else {
            return SubgraphOutput::error("couldn't work out the due date for that task");
        };
        return propose_create(&query, due, None, input.resolved_contact_id());
    }

    let Some((start, end)) = resolve_window(&query, now, &input.timezone) else {
        return SubgraphOutput::error("couldn't work out which dates you mean");
    };
    list_window(&input, client, start, end).await
}
