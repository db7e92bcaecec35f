//! Deterministic planner (spec §4.4): `(query, memory_context?) ->
//! ExecutionPlan`. No LLM call, no I/O — identical inputs always yield
//! identical plans, grounded in the teacher's `orchestrator::router::evaluator`
//! rule-composition idiom, generalized from routing decisions to a
//! dependency DAG.

mod domains;
mod entities;
mod toposort;

use crm_types::{Domain, EntityCategory, ExecutionPlan, PlanAnalysis, PlanMetadata};

/// Builds an [`ExecutionPlan`] from a raw user query. `memory_context` is
/// accepted for interface parity with the Coordinator's `recall_memory`
/// step but the planner itself never reads memory content — determinism
/// requires it to ignore anything that isn't in `query`.
pub fn plan(query: &str, _memory_context: Option<&crm_types::MemoryContext>) -> ExecutionPlan {
    let extracted_entities = entities::extract(query);
    let domains = domains::detect(query, &extracted_entities);
    let mut warnings = Vec::new();

    let has_contact_entity = extracted_entities.iter().any(|e| e.category == EntityCategory::Contact);
    if has_contact_entity && !domains.contains(&Domain::Contact) {
        warnings.push("a contact entity was found but the contact domain was not selected".to_string());
    }

    let edges = domains::dependency_edges(query, &domains);

    let (parallel, sequential, cycle_warning) = match toposort::layer(&domains, &edges) {
        Ok(layering) => (layering.parallel, layering.sequential, None),
        Err(message) => (Vec::new(), Vec::new(), Some(message)),
    };
    if let Some(message) = cycle_warning {
        warnings.push(message);
    }

    let requires_entity_resolution = has_contact_entity;
    let metadata = PlanMetadata {
        entity_count: extracted_entities.len(),
        requires_entity_resolution,
        domain_count: domains.len(),
        warnings,
    };

    ExecutionPlan {
        parallel,
        sequential,
        analysis: PlanAnalysis { domains, entities: extracted_entities, dependencies: edges },
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_simple_single_domain_query_plans_to_one_parallel_domain() {
        let result = plan("schedule a meeting tomorrow at 3pm", None);
        assert_eq!(result.parallel, vec![Domain::Calendar]);
        assert!(result.sequential.is_empty());
        assert_eq!(result.metadata.domain_count, 1);
    }

    #[test]
    fn contact_then_calendar_produces_a_sequential_dependency() {
        let result = plan("schedule a meeting with John Smith tomorrow", None);
        assert!(result.parallel.contains(&Domain::Contact));
        assert!(result.sequential.iter().any(|s| s.domain == Domain::Calendar));
        assert!(result.metadata.requires_entity_resolution);
    }

    #[test]
    fn identical_queries_produce_identical_plans() {
        let query = "meet with Jane Doe next week and add a task from the meeting";
        let a = plan(query, None);
        let b = plan(query, None);
        assert_eq!(a.analysis.domains, b.analysis.domains);
        assert_eq!(a.parallel, b.parallel);
        assert_eq!(a.sequential.len(), b.sequential.len());
    }

    #[test]
    fn empty_query_yields_an_empty_plan() {
        let result = plan("", None);
        assert!(result.is_empty());
        assert_eq!(result.metadata.domain_count, 0);
    }
}
