//! Domain subgraphs (spec §4.5): Contact, Calendar, Task, Workflow.
//!
//! Each is compiled as a single-node `StateGraph` with no checkpointer
//! attached — the graph itself carries no state across invocations, so
//! "compile stateless" is satisfied trivially. The Coordinator owns the one
//! checkpointer for the whole run and invokes these as `add_subgraph` nodes.

pub mod calendar;
pub mod contact;
pub mod dates;
pub mod state;
pub mod task;
pub mod workflow;

use std::sync::Arc;

use langgraph_core::llm::ChatModel;
use langgraph_core::{CompiledGraph, GraphError, Result as GraphResult, StateGraph};

use crm_domain_tools::CrmClient;

pub use state::{SubgraphInput, SubgraphOutput, SubgraphResult};

fn decode_input(state: serde_json::Value) -> GraphResult<SubgraphInput> {
    serde_json::from_value(state).map_err(|e| GraphError::Execution(format!("invalid subgraph input: {e}")))
}

fn encode_output(output: SubgraphOutput) -> GraphResult<serde_json::Value> {
    serde_json::to_value(&output).map_err(|e| GraphError::Execution(format!("couldn't serialize subgraph output: {e}")))
}

pub fn compiled_contact(client: Arc<CrmClient>, llm: Option<Arc<dyn ChatModel>>) -> GraphResult<CompiledGraph> {
    let mut graph = StateGraph::new();
    graph.add_node("contact", move |state| {
        let client = client.clone();
        let llm = llm.clone();
        Box::pin(async move {
            let input = decode_input(state)?;
            let output = contact::run(input, &client, llm.as_ref()).await;
            encode_output(output)
        })
    });
    graph.compile()
}

pub fn compiled_calendar(client: Arc<CrmClient>) -> GraphResult<CompiledGraph> {
    let mut graph = StateGraph::new();
    graph.add_node("calendar", move |state| {
        let client = client.clone();
        Box::pin(async move {
            let input = decode_input(state)?;
            let output = calendar::run(input, &client, chrono::Utc::now()).await;
            encode_output(output)
        })
    });
    graph.compile()
}

pub fn compiled_task(client: Arc<CrmClient>) -> GraphResult<CompiledGraph> {
    let mut graph = StateGraph::new();
    graph.add_node("task", move |state| {
        let client = client.clone();
        Box::pin(async move {
            let input = decode_input(state)?;
            let output = task::run(input, &client, chrono::Utc::now()).await;
            encode_output(output)
        })
    });
    graph.compile()
}

pub fn compiled_workflow(client: Arc<CrmClient>) -> GraphResult<CompiledGraph> {
    let mut graph = StateGraph::new();
    graph.add_node("workflow", move |state| {
        let client = client.clone();
        Box::pin(async move {
            let input = decode_input(state)?;
            let output = workflow::run(input, &client).await;
            encode_output(output)
        })
    });
    graph.compile()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_domain_subgraph_compiles_without_a_checkpointer() {
        let client = Arc::new(CrmClient::new("http://localhost").unwrap());
        assert!(compiled_contact(client.clone(), None).is_ok());
        assert!(compiled_calendar(client.clone()).is_ok());
        assert!(compiled_task(client.clone()).is_ok());
        assert!(compiled_workflow(client).is_ok());
    }
}
