//! Calendar subgraph (spec §4.5.2): window fetch, appointment creation and
//! attendee linking, all mutations gated behind a preview + approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crm_domain_tools::calendar::{self, ActivityWindow, CreateAppointmentParams, LinkAppointmentParams, LinkKind};
use crm_domain_tools::CrmClient;
use crm_types::{ApprovalRequest, Decision, Domain, Envelope};

use crate::dates::resolve_window;
use crate::state::{SubgraphInput, SubgraphOutput};

/// What gets proposed for a `create_appointment` action: the appointment
/// itself, plus an optional contact to link once it's created (spec §8
/// scenario 2 — a resolved contact flowing into the calendar step).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppointmentProposal {
    params: CreateAppointmentParams,
    #[serde(default)]
    linked_contact_id: Option<String>,
}

pub async fn list_activities(input: &SubgraphInput, client: &CrmClient, start: DateTime<Utc>, end: DateTime<Utc>) -> SubgraphOutput {
    let window = ActivityWindow::widened_if_single_day(start, end);
    match calendar::list_window(client, &input.token, &input.org_id, window).await {
        Envelope::Valid { data } => SubgraphOutput::ok_with_data("Here are the activities in that window.", filter_to_window(data, start, end)),
        Envelope::Invalid { error } => SubgraphOutput::error_with_class(format!("couldn't fetch the calendar: {}", error.message), error.class),
    }
}

/// The CRM widens a single-day window by a day on each side so boundary
/// activities aren't dropped; re-narrow the response back down to what was
/// actually asked for before handing it to the caller (spec §8 scenario 1).
fn filter_to_window(data: serde_json::Value, start: DateTime<Utc>, end: DateTime<Utc>) -> serde_json::Value {
    match data {
        serde_json::Value::Array(items) => serde_json::Value::Array(items.into_iter().filter(|item| activity_in_window(item, start, end)).collect()),
        serde_json::Value::Object(mut map) => {
            for key in ["results", "activities", "items"] {
                if let Some(serde_json::Value::Array(items)) = map.get(key).cloned() {
                    let filtered = items.into_iter().filter(|item| activity_in_window(item, start, end)).collect();
                    map.insert(key.to_string(), serde_json::Value::Array(filtered));
                    return serde_json::Value::Object(map);
                }
            }
            serde_json::Value::Object(map)
        }
        other => other,
    }
}

fn activity_in_window(item: &serde_json::Value, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    for key in ["start", "Start", "start_date", "StartDate", "date", "Date"] {
        if let Some(raw) = item.get(key).and_then(|v| v.as_str()) {
            return match DateTime::parse_from_rfc3339(raw) {
                Ok(parsed) => {
                    let parsed = parsed.with_timezone(&Utc);
                    parsed >= start && parsed < end
                }
                Err(_) => true,
            };
        }
    }
    true
}

/// Proposes creating an appointment; the actual mutation happens only once
/// the Coordinator re-enters with an `approval_decision` (spec §4.5.2).
pub fn propose_create_appointment(subject: &str, start: DateTime<Utc>, end: DateTime<Utc>, notes: Option<String>, linked_contact_id: Option<String>) -> SubgraphOutput {
    let params = CreateAppointmentParams { subject: subject.to_string(), start, end, notes };
    let mut preview = format!("Create \"{subject}\" from {start} to {end}");
    if linked_contact_id.is_some() {
        preview.push_str(" and link it to the contact");
    }
    let proposal = AppointmentProposal { params, linked_contact_id };
    SubgraphOutput::needs_approval(ApprovalRequest {
        action_id: Uuid::new_v4().to_string(),
        domain: Domain::Calendar,
        action: "create_appointment".to_string(),
        preview,
        data: serde_json::to_value(&proposal).unwrap(),
    })
}

/// Creates the appointment and, when a contact was resolved upstream, links
/// it immediately afterward (spec §8 scenario 2).
pub async fn apply_create_appointment(input: &SubgraphInput, client: &CrmClient, params: CreateAppointmentParams, linked_contact_id: Option<String>) -> SubgraphOutput {
    let created = match calendar::create_appointment(client, &input.token, &input.org_id, params).await {
        Envelope::Valid { data } => data,
        Envelope::Invalid { error } => return SubgraphOutput::error_with_class(format!("couldn't create the appointment: {}", error.message), error.class),
    };

    let Some(contact_id) = linked_contact_id else {
        return SubgraphOutput::ok_with_data("Appointment created.", created);
    };

    let appointment_id = created.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let link_params = LinkAppointmentParams { appointment_id, linked_id: contact_id, kind: LinkKind::Contact };
    match apply_link(input, client, link_params).await {
        SubgraphOutput { error: Some(message), .. } => SubgraphOutput::ok_with_data(format!("Appointment created, but linking the contact failed: {message}"), created),
        _ => SubgraphOutput::ok_with_data("Appointment created and linked to the contact.", created),
    }
}

pub fn propose_link(appointment_id: &str, linked_id: &str, kind: LinkKind) -> SubgraphOutput {
    let params = LinkAppointmentParams { appointment_id: appointment_id.to_string(), linked_id: linked_id.to_string(), kind };
    SubgraphOutput::needs_approval(ApprovalRequest {
        action_id: Uuid::new_v4().to_string(),
        domain: Domain::Calendar,
        action: "link_appointment".to_string(),
        preview: format!("Link {linked_id} ({kind:?}) to appointment {appointment_id}"),
        data: serde_json::to_value(&params).unwrap(),
    })
}

pub async fn apply_link(input: &SubgraphInput, client: &CrmClient, params: LinkAppointmentParams) -> SubgraphOutput {
    match calendar::link_appointment(client, &input.token, &input.org_id, params).await {
        Envelope::Valid { .. } => SubgraphOutput::ok("Linked."),
        Envelope::Invalid { error } => SubgraphOutput::error_with_class(format!("couldn't link: {}", error.message), error.class),
    }
}

/// Consumes a pending decision for this domain, dispatching to the matching
/// `apply_*` rather than re-proposing the same action (spec §4.5, §4.6 step
/// 7). Returns `None` when there's nothing pending to resume.
async fn apply_pending(input: &SubgraphInput, client: &CrmClient) -> Option<SubgraphOutput> {
    let (request, decision) = input.pending_decision_for(Domain::Calendar)?;
    Some(match decision {
        Decision::Reject => SubgraphOutput::ok("Okay, I won't do that."),
        _ => match request.action.as_str() {
            "create_appointment" => match serde_json::from_value::<AppointmentProposal>(request.data.clone()) {
                Ok(proposal) => apply_create_appointment(input, client, proposal.params, proposal.linked_contact_id).await,
                Err(err) => SubgraphOutput::error(format!("couldn't decode the pending appointment: {err}")),
            },
            "link_appointment" => match serde_json::from_value::<LinkAppointmentParams>(request.data.clone()) {
                Ok(params) => apply_link(input, client, params).await,
                Err(err) => SubgraphOutput::error(format!("couldn't decode the pending link: {err}")),
            },
            other => SubgraphOutput::error(format!("unknown pending calendar action: {other}")),
        },
    })
}

/// Entry point used by the Coordinator: resumes a pending decision if one is
/// outstanding, otherwise resolves the natural-language window from the
/// query and decides read vs. propose-create based on whether the query
/// asks to create something.
pub async fn run(input: SubgraphInput, client: &CrmClient, now: DateTime<Utc>) -> SubgraphOutput {
    if let Some(output) = apply_pending(&input, client).await {
        return output;
    }

    let query = input.messages.last().cloned().unwrap_or_default();
    let Some((start, end)) = resolve_window(&query, now, &input.timezone) else {
        return SubgraphOutput::error("couldn't work out which dates you mean");
    };

    let wants_creation = query.to_lowercase().contains("schedule") || query.to_lowercase().contains("book") || query.to_lowercase().contains("set up");
    if wants_creation {
        propose_create_appointment(&query, start, end, None, input.resolved_contact_id())
    } else {
        list_activities(&input, client, start, end).await
    }
}
