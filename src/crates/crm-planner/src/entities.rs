//! Fixed ordered regex extraction (spec §4.4 step 1). No LLM, no I/O —
//! identical queries always yield identical entity lists.

use regex::Regex;
use std::sync::OnceLock;

use crm_types::{EntityCategory, ExtractedEntity};

struct Pattern {
    entity_type: &'static str,
    category: EntityCategory,
    regex: fn() -> &'static Regex,
}

fn person_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:with|meet|call|email|contact)\s+([A-Z][\w'-]*(?:\s+[A-Z][\w'-]*){0,2})\b").unwrap()
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:today|tomorrow|yesterday|next week|next month|this week|\d{1,2}/\d{1,2}(?:/\d{2,4})?|\d{4}-\d{2}-\d{2}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
        )
        .unwrap()
    })
}

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b\d{1,2}(?::\d{2})?\s?(?:am|pm)\b").unwrap())
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b\d+\s?(?:minutes?|mins?|hours?|hrs?|days?|weeks?)\b").unwrap())
}

const PATTERNS: &[Pattern] = &[
    Pattern { entity_type: "person", category: EntityCategory::Contact, regex: person_regex },
    Pattern { entity_type: "date", category: EntityCategory::Date, regex: date_regex },
    Pattern { entity_type: "time", category: EntityCategory::Time, regex: time_regex },
    Pattern { entity_type: "duration", category: EntityCategory::Duration, regex: duration_regex },
];

/// Runs every pattern in declaration order, collecting matches position-first
/// so downstream consumers can rely on document order within a category.
pub fn extract(query: &str) -> Vec<ExtractedEntity> {
    let mut entities = Vec::new();
    for pattern in PATTERNS {
        let regex = (pattern.regex)();
        for capture in regex.captures_iter(query) {
            let matched = capture.get(1).or_else(|| capture.get(0)).unwrap();
            entities.push(ExtractedEntity {
                entity_type: pattern.entity_type.to_string(),
                value: matched.as_str().to_string(),
                category: pattern.category,
                position: matched.start(),
            });
        }
    }
    entities.sort_by_key(|e| e.position);
    entities
}
