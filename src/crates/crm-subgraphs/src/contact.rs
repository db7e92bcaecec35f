//! Contact subgraph (spec §4.5.1): name extraction, CRM search, weighted
//! scoring, auto-select vs. disambiguation.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use langgraph_core::llm::{ChatModel, ChatRequest};
use langgraph_core::messages::Message;

use crm_domain_tools::contacts::{self, ContactRecord};
use crm_domain_tools::CrmClient;
use crm_types::{Decision, Domain, Envelope, MemoryContext};

use crate::state::{SubgraphInput, SubgraphOutput};

const MAX_CANDIDATES: usize = 5;
const AUTO_SELECT_MARGIN: f64 = 2.0;

#[derive(Debug, Clone, Deserialize)]
pub struct NameExtraction {
    pub name: String,
    #[serde(default)]
    pub context: Option<String>,
}

fn trigger_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:with|meet|call|email|contact)\s+([A-Z][\w'-]*(?:\s+[A-Z][\w'-]*){0,2})\b").unwrap())
}

/// Rejects matches that read like a full sentence rather than a name: more
/// than three words, or containing terminal sentence punctuation.
fn passes_length_guard(candidate: &str) -> bool {
    let word_count = candidate.split_whitespace().count();
    word_count >= 1 && word_count <= 3 && !candidate.contains(['.', '!', '?'])
}

pub fn regex_fallback_extract(query: &str) -> Option<NameExtraction> {
    let capture = trigger_regex().captures(query)?;
    let name = capture.get(1)?.as_str().to_string();
    if passes_length_guard(&name) {
        Some(NameExtraction { name, context: None })
    } else {
        None
    }
}

/// Tries a scoped LLM call constrained to return `{name, context}` JSON
/// first, falling back to the regex extractor on any failure or when no
/// model is configured (spec §4.5.1).
pub async fn extract_name(llm: Option<&Arc<dyn ChatModel>>, query: &str) -> Option<NameExtraction> {
    if let Some(model) = llm {
        let prompt = format!(
            "Extract the person's name mentioned in this request, if any. \
             Respond with nothing but JSON: {{\"name\": string, \"context\": string|null}}. \
             If no person is named, respond with {{\"name\": \"\", \"context\": null}}.\n\nRequest: {query}"
        );
        let request = ChatRequest::new(vec![Message::human(prompt)]);
        if let Ok(response) = model.chat(request).await {
            if let Some(text) = response.message.text() {
                if let Ok(parsed) = serde_json::from_str::<NameExtraction>(text) {
                    if !parsed.name.is_empty() && passes_length_guard(&parsed.name) {
                        return Some(parsed);
                    }
                }
            }
        }
    }
    regex_fallback_extract(query)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub contact: CandidateView,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateView {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl From<&ContactRecord> for CandidateView {
    fn from(record: &ContactRecord) -> Self {
        Self { id: record.id.clone(), name: record.name.clone(), title: record.title.clone() }
    }
}

fn name_similarity(query: &str, candidate: &str) -> f64 {
    let query = query.to_lowercase();
    let candidate_lower = candidate.to_lowercase();
    if query == candidate_lower {
        return 1.0;
    }
    if candidate_lower.contains(&query) || query.contains(&candidate_lower) {
        return 0.9;
    }
    let query_words: Vec<&str> = query.split_whitespace().collect();
    let candidate_words: Vec<&str> = candidate_lower.split_whitespace().collect();
    let overlap = query_words.iter().filter(|w| candidate_words.contains(w)).count();
    if overlap > 0 {
        0.5
    } else {
        0.0
    }
}

/// Weighted blend: name similarity dominates, title match and memory
/// recency are secondary signals (spec §4.5.1, SPEC_FULL Open Question 2 —
/// memory is a weighted signal, never ground truth).
pub fn score_candidates(name: &str, title_hint: Option<&str>, candidates: &[ContactRecord], memory: &MemoryContext) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|c| {
            let name_score = name_similarity(name, &c.name);
            let title_score = match (title_hint, &c.title) {
                (Some(hint), Some(title)) if title.to_lowercase().contains(&hint.to_lowercase()) => 0.2,
                _ => 0.0,
            };
            let recency_score = memory.recency_hint(&c.name) * 0.15;
            ScoredCandidate { contact: CandidateView::from(c), score: name_score + title_score + recency_score }
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    scored
}

pub enum Resolution {
    Selected(CandidateView),
    NoMatch,
    Ambiguous(Vec<ScoredCandidate>),
}

/// Auto-selects when the top score beats the runner-up by more than
/// [`AUTO_SELECT_MARGIN`]x, or when there's exactly one candidate.
pub fn resolve(scored: Vec<ScoredCandidate>) -> Resolution {
    match scored.as_slice() {
        [] => Resolution::NoMatch,
        [only] => Resolution::Selected(only.contact.clone()),
        [top, runner_up, ..] => {
            if runner_up.score == 0.0 || top.score > runner_up.score * AUTO_SELECT_MARGIN {
                Resolution::Selected(top.contact.clone())
            } else {
                Resolution::Ambiguous(scored.into_iter().take(MAX_CANDIDATES).collect())
            }
        }
    }
}

/// Consumes a pending disambiguation decision, picking the selected
/// candidate out of the original request's data rather than re-running
/// extraction and search from scratch (spec §4.5.1, §4.6 step 7). Returns
/// `None` when there's nothing pending to resume.
fn apply_pending(input: &SubgraphInput) -> Option<SubgraphOutput> {
    let (request, decision) = input.pending_decision_for(Domain::Contact)?;
    if request.action != "contact_disambiguation" {
        return Some(SubgraphOutput::error(format!("unknown pending contact action: {}", request.action)));
    }

    Some(match decision {
        Decision::Reject => SubgraphOutput::ok("Okay, I won't do that."),
        Decision::Selection { value } => {
            let candidates: Vec<ScoredCandidate> = request
                .data
                .get("candidates")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            match candidates.into_iter().find(|c| value.as_str() == Some(c.contact.id.as_str())) {
                Some(picked) => SubgraphOutput::ok_with_data(format!("Using {}.", picked.contact.name), serde_json::json!({ "contact": picked.contact })),
                None => SubgraphOutput::error(format!("\"{value}\" wasn't one of the candidates offered")),
            }
        }
        Decision::Approve => SubgraphOutput::error("a contact disambiguation needs a selection, not a plain approval"),
    })
}

pub async fn run(input: SubgraphInput, client: &CrmClient, llm: Option<&Arc<dyn ChatModel>>) -> SubgraphOutput {
    if let Some(output) = apply_pending(&input) {
        return output;
    }

    let query = input.messages.last().cloned().unwrap_or_default();
    let Some(extraction) = extract_name(llm, &query).await else {
        return SubgraphOutput::error("no contact name could be identified in the request");
    };

    let envelope = contacts::search(client, &input.token, &input.org_id, contacts::ContactSearchParams { query: extraction.name.clone(), limit: Some(20) }).await;
    let records: Vec<ContactRecord> = match &envelope {
        Envelope::Valid { data } => serde_json::from_value(data.get("results").cloned().unwrap_or(data.clone())).unwrap_or_default(),
        Envelope::Invalid { error } => return SubgraphOutput::error_with_class(format!("contact search failed: {}", error.message), error.class),
    };

    let scored = score_candidates(&extraction.name, extraction.context.as_deref(), &records, &input.memory_context);
    match resolve(scored) {
        Resolution::NoMatch => SubgraphOutput::error(format!("no contact found matching \"{}\"", extraction.name)),
        Resolution::Selected(candidate) => SubgraphOutput::ok_with_data(
            format!("Found {}.", candidate.name),
            serde_json::json!({ "contact": candidate }),
        ),
        Resolution::Ambiguous(candidates) => SubgraphOutput::needs_approval(crm_types::ApprovalRequest {
            action_id: uuid::Uuid::new_v4().to_string(),
            domain: crm_types::Domain::Contact,
            action: "contact_disambiguation".to_string(),
            preview: format!("Which \"{}\" did you mean?", extraction.name),
            data: serde_json::json!({ "candidates": candidates }),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: &str, name: &str, title: Option<&str>) -> ContactRecord {
        ContactRecord { id: id.to_string(), name: name.to_string(), title: title.map(String::from), email: None }
    }

    #[test]
    fn length_guard_rejects_full_sentence_candidates() {
        assert!(!passes_length_guard("Please Let Me Know About The Schedule."));
        assert!(passes_length_guard("Maria Lopez"));
    }

    #[test]
    fn no_match_without_a_trigger_verb() {
        assert!(regex_fallback_extract("John Smith called earlier today").is_none());
    }

    #[test]
    fn regex_extraction_finds_a_name_after_a_trigger_verb() {
        let extraction = regex_fallback_extract("schedule a call with Maria Lopez").unwrap();
        assert_eq!(extraction.name, "Maria Lopez");
    }

    #[test]
    fn exact_name_match_scores_higher_than_partial() {
        let memory = MemoryContext::empty();
        let candidates = vec![contact("1", "Alex Rivera", None), contact("2", "Alex R", None)];
        let scored = score_candidates("Alex Rivera", None, &candidates, &memory);
        assert_eq!(scored[0].contact.id, "1");
    }

    #[test]
    fn a_dominant_top_score_auto_selects() {
        let memory = MemoryContext::empty();
        let candidates = vec![contact("1", "Alex Rivera", None), contact("2", "Someone Else", None)];
        let scored = score_candidates("Alex Rivera", None, &candidates, &memory);
        match resolve(scored) {
            Resolution::Selected(c) => assert_eq!(c.id, "1"),
            _ => panic!("expected auto-select"),
        }
    }

    #[test]
    fn close_scores_require_disambiguation() {
        let memory = MemoryContext::empty();
        let candidates = vec![contact("1", "Alex Rivera", None), contact("2", "Alex Rivers", None)];
        let scored = score_candidates("Alex Ri", None, &candidates, &memory);
        match resolve(scored) {
            Resolution::Ambiguous(c) => assert_eq!(c.len(), 2),
            _ => panic!("expected disambiguation"),
        }
    }

    #[test]
    fn no_candidates_is_no_match() {
        assert!(matches!(resolve(vec![]), Resolution::NoMatch));
    }
}
