//! Memory context (spec §3, §4.6 `recall_memory`, §4.8 in SPEC_FULL). Only
//! the interface-level shape lives here; storage internals are out of scope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    pub text: String,
    pub relevance: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryContext {
    pub items: Vec<MemoryItem>,
}

impl MemoryContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Best recency/relevance hint for a name, used only as one weighted
    /// signal in contact disambiguation — never as ground truth (spec §4.5.1,
    /// SPEC_FULL Open Question 2).
    pub fn recency_hint(&self, needle: &str) -> f64 {
        self.items
            .iter()
            .filter(|item| item.text.to_lowercase().contains(&needle.to_lowercase()))
            .map(|item| item.relevance)
            .fold(0.0_f64, f64::max)
    }
}
