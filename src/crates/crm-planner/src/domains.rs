//! Domain detection and dependency rules (spec §4.4 steps 2–3).

use crm_types::{Domain, EntityCategory, ExtractedEntity};

const CALENDAR_KEYWORDS: &[&str] = &["meeting", "schedule", "appointment", "event"];
const TASK_KEYWORDS: &[&str] = &["task", "todo", "to-do", "reminder", "action item"];
const WORKFLOW_KEYWORDS: &[&str] = &["workflow", "process", "automation", "procedure"];
const CONTACT_KEYWORDS: &[&str] = &["contact", "client", "prospect"];

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| haystack.contains(kw))
}

/// Union of keyword matches and rule-triggered domains (step 2). The
/// `contact` domain is additionally required whenever a `contact`-category
/// entity was extracted, even without the literal word "contact" in text.
pub fn detect(query: &str, entities: &[ExtractedEntity]) -> Vec<Domain> {
    let lower = query.to_lowercase();
    let mut domains = Vec::new();

    if contains_any(&lower, CALENDAR_KEYWORDS) {
        domains.push(Domain::Calendar);
    }
    if contains_any(&lower, TASK_KEYWORDS) {
        domains.push(Domain::Task);
    }
    if contains_any(&lower, WORKFLOW_KEYWORDS) {
        domains.push(Domain::Workflow);
    }
    let has_contact_entity = entities.iter().any(|e| e.category == EntityCategory::Contact);
    if has_contact_entity || contains_any(&lower, CONTACT_KEYWORDS) {
        domains.push(Domain::Contact);
    }

    domains.sort_by_key(|d| Domain::ALL.iter().position(|a| a == d).unwrap());
    domains.dedup();
    domains
}

/// A directed edge `(from, to)` meaning `to` depends on `from` completing
/// first (spec §4.4 step 3, a closed rule set evaluated in order).
pub fn dependency_edges(query: &str, domains: &[Domain]) -> Vec<(Domain, Domain)> {
    let lower = query.to_lowercase();
    let mut edges = Vec::new();

    let mentions_person = domains.contains(&Domain::Contact);
    let mentions_calendar_verb = contains_any(&lower, CALENDAR_KEYWORDS);
    if mentions_person && mentions_calendar_verb && domains.contains(&Domain::Calendar) {
        edges.push((Domain::Contact, Domain::Calendar));
    }

    let task_from_meeting = domains.contains(&Domain::Calendar)
        && domains.contains(&Domain::Task)
        && contains_any(&lower, &["from the meeting", "after the meeting", "for the meeting", "from this meeting", "after this meeting"]);
    if task_from_meeting {
        edges.push((Domain::Calendar, Domain::Task));
    }

    // Workflow subsumes its own coordination: no outward edges are ever
    // emitted for it here.
    edges
}
