//! Execution plan (spec §3, §4.4): the Planner's sole output.

use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Contact,
    Date,
    Time,
    Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub entity_type: String,
    pub value: String,
    pub category: EntityCategory,
    /// Byte offset of the match within the query, for stable ordering.
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequentialStep {
    pub domain: Domain,
    pub depends_on: Vec<Domain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanAnalysis {
    pub domains: Vec<Domain>,
    pub entities: Vec<ExtractedEntity>,
    pub dependencies: Vec<(Domain, Domain)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub entity_count: usize,
    pub requires_entity_resolution: bool,
    pub domain_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub parallel: Vec<Domain>,
    pub sequential: Vec<SequentialStep>,
    pub analysis: PlanAnalysis,
    pub metadata: PlanMetadata,
}

impl ExecutionPlan {
    /// All domains referenced anywhere in the plan, parallel or sequential.
    pub fn all_domains(&self) -> Vec<Domain> {
        let mut seen = HashMap::new();
        let mut out = Vec::new();
        for d in self.parallel.iter().chain(self.sequential.iter().map(|s| &s.domain)) {
            if seen.insert(*d, ()).is_none() {
                out.push(*d);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.parallel.is_empty() && self.sequential.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_domains_dedupes_across_buckets() {
        let plan = ExecutionPlan {
            parallel: vec![Domain::Calendar],
            sequential: vec![SequentialStep { domain: Domain::Calendar, depends_on: vec![], reason: None }],
            ..Default::default()
        };
        assert_eq!(plan.all_domains(), vec![Domain::Calendar]);
    }

    #[test]
    fn empty_plan_has_no_domains() {
        assert!(ExecutionPlan::default().is_empty());
    }
}
