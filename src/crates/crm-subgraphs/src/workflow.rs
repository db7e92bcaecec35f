//! Workflow subgraph (spec §4.5.4): shell creation, natural-language step
//! parsing, ≤22-step cap enforcement, partial-failure reporting without
//! rollback.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

use crm_domain_tools::workflow::{self, ActivityType, AssigneeType, CreateWorkflowParams, WorkflowStep, MAX_STEPS};
use crm_domain_tools::CrmClient;
use crm_types::{ApprovalRequest, Decision, Domain, Envelope};

use crate::state::{SubgraphInput, SubgraphOutput};

fn numbered_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\d+[.)]\s*(.+)$").unwrap())
}

fn bullet_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*[-*•]\s*(.+)$").unwrap())
}

fn sequencing_adverb_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:first|then|next|after that|finally)\b,?\s*").unwrap())
}

/// Ordered heuristics, first match wins (spec §4.5.4): numbered list,
/// bullet list, sequencing adverbs, then a single-step fallback containing
/// the whole description.
pub fn parse_steps(description: &str) -> Vec<String> {
    let numbered: Vec<String> = numbered_list_regex().captures_iter(description).map(|c| c[1].trim().to_string()).collect();
    if !numbered.is_empty() {
        return numbered;
    }

    let bulleted: Vec<String> = bullet_list_regex().captures_iter(description).map(|c| c[1].trim().to_string()).collect();
    if !bulleted.is_empty() {
        return bulleted;
    }

    let adverb_split: Vec<String> = sequencing_adverb_regex()
        .split(description)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if adverb_split.len() > 1 {
        return adverb_split;
    }

    vec![description.trim().to_string()]
}

fn to_workflow_steps(descriptions: Vec<String>) -> Vec<WorkflowStep> {
    descriptions
        .into_iter()
        .enumerate()
        .map(|(i, subject)| WorkflowStep {
            sequence: i as u32 + 1,
            subject,
            activity_type: ActivityType::Task,
            day_offset: i as i32,
            assignee_type: AssigneeType::Owner,
            roll_over: false,
            all_day: false,
        })
        .collect()
}

/// What gets proposed for a `create_workflow` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkflowProposal {
    name: String,
    steps: Vec<WorkflowStep>,
}

/// Proposes a workflow shell plus its parsed steps. A description that
/// parses into more than `MAX_STEPS` steps is rejected outright with an
/// explicit cap message rather than silently truncated (spec §8: a 23-step
/// plan must be rejected, not quietly shortened to 22).
pub fn propose_create(name: &str, description: &str) -> SubgraphOutput {
    let steps = to_workflow_steps(parse_steps(description));
    if steps.len() > MAX_STEPS {
        return SubgraphOutput::error(format!(
            "that description breaks down into {} steps, which is over the {} step limit for a single workflow — split it into smaller workflows",
            steps.len(),
            MAX_STEPS
        ));
    }

    let preview = format!("Create workflow \"{name}\" with {} step(s)", steps.len());
    let proposal = WorkflowProposal { name: name.to_string(), steps };
    SubgraphOutput::needs_approval(ApprovalRequest {
        action_id: Uuid::new_v4().to_string(),
        domain: Domain::Workflow,
        action: "create_workflow".to_string(),
        preview,
        data: serde_json::to_value(&proposal).unwrap(),
    })
}

pub async fn apply_create(input: &SubgraphInput, client: &CrmClient, proposal: WorkflowProposal) -> SubgraphOutput {
    let shell = workflow::create_shell(client, &input.token, &input.org_id, CreateWorkflowParams { name: proposal.name }).await;
    let Envelope::Valid { data } = shell else {
        let Envelope::Invalid { error } = shell else { unreachable!() };
        return SubgraphOutput::error_with_class(format!("couldn't create the workflow shell: {}", error.message), error.class);
    };
    let workflow_id = data.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();

    match workflow::append_steps(client, &input.token, &input.org_id, &workflow_id, proposal.steps).await {
        Ok(outcome) if outcome.steps_added == outcome.total_steps => {
            SubgraphOutput::ok_with_data(format!("Workflow created with all {} steps.", outcome.total_steps), serde_json::to_value(&outcome).unwrap())
        }
        Ok(outcome) => SubgraphOutput::ok_with_data(
            format!("Workflow created, but only {} of {} steps were added before a failure.", outcome.steps_added, outcome.total_steps),
            serde_json::to_value(&outcome).unwrap(),
        ),
        Err(err) => SubgraphOutput::error(err.to_string()),
    }
}

/// Consumes a pending decision for this domain, dispatching to the matching
/// `apply_*` rather than re-proposing the same action (spec §4.5, §4.6 step
/// 7). Returns `None` when there's nothing pending to resume.
async fn apply_pending(input: &SubgraphInput, client: &CrmClient) -> Option<SubgraphOutput> {
    let (request, decision) = input.pending_decision_for(Domain::Workflow)?;
    Some(match decision {
        Decision::Reject => SubgraphOutput::ok("Okay, I won't do that."),
        _ => match request.action.as_str() {
            "create_workflow" => match serde_json::from_value::<WorkflowProposal>(request.data.clone()) {
                Ok(proposal) => apply_create(input, client, proposal).await,
                Err(err) => SubgraphOutput::error(format!("couldn't decode the pending workflow: {err}")),
            },
            other => SubgraphOutput::error(format!("unknown pending workflow action: {other}")),
        },
    })
}

pub async fn run(input: SubgraphInput, client: &CrmClient) -> SubgraphOutput {
    if let Some(output) = apply_pending(&input, client).await {
        return output;
    }

    let description = input.messages.last().cloned().unwrap_or_default();
    propose_create("New workflow", &description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_list_is_parsed_in_order() {
        let steps = parse_steps("1. Send intro email\n2. Schedule a call\n3. Follow up");
        assert_eq!(steps, vec!["Send intro email", "Schedule a call", "Follow up"]);
    }

    #[test]
    fn bullet_list_is_parsed_when_no_numbers_are_present() {
        let steps = parse_steps("- Send intro email\n- Schedule a call");
        assert_eq!(steps, vec!["Send intro email", "Schedule a call"]);
    }

    #[test]
    fn sequencing_adverbs_split_a_plain_sentence() {
        let steps = parse_steps("First send an email, then schedule a call, finally follow up");
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn an_unstructured_description_falls_back_to_a_single_step() {
        let steps = parse_steps("onboard the new client");
        assert_eq!(steps, vec!["onboard the new client"]);
    }

    #[test]
    fn step_count_beyond_the_cap_is_rejected_with_an_explicit_message() {
        let description = (1..=30).map(|i| format!("{i}. step {i}")).collect::<Vec<_>>().join("\n");
        let output = propose_create("big workflow", &description);
        assert!(!output.requires_approval);
        let message = output.error.expect("should be rejected");
        assert!(message.contains("30"));
        assert!(message.contains(&MAX_STEPS.to_string()));
    }

    #[test]
    fn step_count_at_the_cap_is_proposed_normally() {
        let description = (1..=MAX_STEPS).map(|i| format!("{i}. step {i}")).collect::<Vec<_>>().join("\n");
        let output = propose_create("fits exactly", &description);
        assert!(output.requires_approval);
    }
}
