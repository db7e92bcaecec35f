//! The Coordinator graph (spec §4.6): `recall_memory → route_domains →
//! execute_subgraphs ⇄ approval_handler → finalize_response`, with
//! `handle_error` as the failure sink.
//!
//! Modeled as a hand-rolled step engine — the same shape as the teacher's
//! `orchestrator::execution::workflow_engine::WorkflowExecutionEngine`
//! (plain `results`/`status`/`error` fields driven by an explicit method per
//! node) rather than wired through `langgraph_core::StateGraph`'s generic
//! node-executor closures. The Coordinator's control flow — settle-all
//! parallel fan-out, and resumption driven by a decision arriving on a later
//! HTTP call rather than from within one running graph — doesn't fit the
//! closure-over-`Value` node model the way the single-node domain subgraphs
//! do; those are compiled as real `CompiledGraph`s and invoked here. The
//! Coordinator itself owns the one checkpointer, per spec §4.2.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use langgraph_checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver};
use langgraph_core::CompiledGraph;

use crm_credentials::CredentialStore;
use crm_credentials::backend::OAuthBackend;
use crm_memory::MemoryClient;
use crm_subgraphs::{SubgraphInput, SubgraphOutput};
use crm_transport::Transport;
use crm_types::{ApprovalDecision, ApprovalRequest, CrmError, Domain, ErrorClass, InterruptPayload, InterruptType, PendingApproval, Result as CrmResult, ThreadRef};

use crate::state::{CoordinatorState, TurnInput, TurnOutcome};

/// The four domain subgraphs, precompiled once at startup (spec §4.5 "no
/// checkpointer, compile stateless" — these are reused across every turn).
pub struct Subgraphs {
    pub contact: CompiledGraph,
    pub calendar: CompiledGraph,
    pub task: CompiledGraph,
    pub workflow: CompiledGraph,
}

impl Subgraphs {
    fn compiled_for(&self, domain: Domain) -> &CompiledGraph {
        match domain {
            Domain::Contact => &self.contact,
            Domain::Calendar => &self.calendar,
            Domain::Task => &self.task,
            Domain::Workflow => &self.workflow,
        }
    }
}

pub struct Coordinator<B: OAuthBackend> {
    credentials: Arc<CredentialStore<B>>,
    memory: Arc<dyn MemoryClient>,
    checkpoints: Arc<dyn CheckpointSaver>,
    subgraphs: Subgraphs,
    transport: Arc<Transport>,
}

impl<B: OAuthBackend> Coordinator<B> {
    pub fn new(
        credentials: Arc<CredentialStore<B>>,
        memory: Arc<dyn MemoryClient>,
        checkpoints: Arc<dyn CheckpointSaver>,
        subgraphs: Subgraphs,
        transport: Arc<Transport>,
    ) -> Self {
        Self { credentials, memory, checkpoints, subgraphs, transport }
    }

    fn checkpoint_config(thread_id: &str) -> CheckpointConfig {
        CheckpointConfig::new().with_thread_id(thread_id.to_string())
    }

    async fn load_state(&self, thread_id: &str) -> CrmResult<Option<CoordinatorState>> {
        let config = Self::checkpoint_config(thread_id);
        let checkpoint = self
            .checkpoints
            .get(&config)
            .await
            .map_err(|e| CrmError::Internal(format!("checkpoint read failed: {e}")))?;
        match checkpoint {
            Some(checkpoint) => {
                let state = serde_json::from_value(checkpoint.channel_values.get("coordinator_state").cloned().unwrap_or_default())
                    .map_err(|e| CrmError::Internal(format!("corrupt checkpoint state: {e}")))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn save_state(&self, state: &CoordinatorState) -> CrmResult<()> {
        let mut channel_values = HashMap::new();
        channel_values.insert("coordinator_state".to_string(), serde_json::to_value(state).map_err(|e| CrmError::Internal(e.to_string()))?);

        let checkpoint = Checkpoint::new(Uuid::new_v4().to_string(), channel_values, HashMap::new(), HashMap::new());

        self.checkpoints
            .put(&Self::checkpoint_config(&state.thread_id), checkpoint, CheckpointMetadata::default(), HashMap::new())
            .await
            .map_err(|e| CrmError::Internal(format!("checkpoint write failed: {e}")))?;
        Ok(())
    }

    /// Entry point for both `/api/agent/execute` and `/api/agent/approve`
    /// (spec §6) — the presence of `approval_decision` distinguishes a fresh
    /// turn from a resume.
    pub async fn run_turn(&self, input: TurnInput) -> CrmResult<TurnOutcome> {
        if input.session_id.trim().is_empty() || input.org_id.trim().is_empty() {
            return Err(CrmError::Input("session_id and org_id are required".to_string()));
        }
        if input.query.len() > 2000 {
            return Err(CrmError::Input("query exceeds the 2000 character limit".to_string()));
        }

        let thread_id = input.thread_id.clone().unwrap_or_else(|| ThreadRef::default_id(&input.session_id, &input.org_id));
        let existing = self.load_state(&thread_id).await?;

        let is_resume = input.approval_decision.is_some();
        if is_resume && existing.is_none() {
            return Err(CrmError::SessionUnrecoverable(format!("no checkpoint found for thread {thread_id}")));
        }

        let mut approval_decision = input.approval_decision;
        if is_resume {
            let pending_requests: Vec<ApprovalRequest> =
                existing.as_ref().and_then(|s| s.pending_approval.as_ref()).map(|p| p.requests.clone()).unwrap_or_default();
            let decision = Self::normalize_placeholder_decision(approval_decision.take().unwrap(), &pending_requests)?;
            if decision.has_unknown_ids(&pending_requests) {
                return Err(CrmError::Input("approval decision references an action id that isn't pending".to_string()));
            }
            if !decision.covers(&pending_requests) {
                return Err(CrmError::Input("approval decision is missing a decision for a pending action".to_string()));
            }
            approval_decision = Some(decision);
        }

        let mut state = existing.unwrap_or_else(|| CoordinatorState::new(&thread_id, &input.session_id, &input.org_id, &input.timezone));
        state.user_id = input.user_id.clone();

        if is_resume {
            state.approval_decision = approval_decision;
        } else {
            state.entities.clear();
            state.plan = None;
            state.error = None;
            state.final_response = None;
            state.messages.push(input.query.clone());

            self.recall_memory(&mut state).await;

            if let Some(outcome) = self.route_domains(&mut state) {
                self.save_state(&state).await?;
                return Ok(outcome);
            }
        }

        let outcome = match self.execute_subgraphs(&mut state).await {
            Ok(ExecuteOutcome::Continue) => self.finalize_response(&mut state).await,
            Ok(ExecuteOutcome::NeedsApproval(payload)) => payload,
            Ok(ExecuteOutcome::RequiresReauth) => TurnOutcome::RequiresReauth,
            Err(message) => {
                state.error = Some(message);
                self.handle_error(&mut state)
            }
        };

        self.save_state(&state).await?;
        Ok(outcome)
    }

    /// V2 callers (`/api/agent/approve` with a bare `decision`, or
    /// `/api/agent/resolve-contact`) key their decision under the
    /// placeholder id `"_"` since they don't know the real `action_id`.
    /// Rewrite it to the one pending request's real id before the coverage
    /// check below runs; reject if more than one request is outstanding,
    /// since the placeholder can't disambiguate which it applies to.
    fn normalize_placeholder_decision(mut decision: ApprovalDecision, pending: &[ApprovalRequest]) -> CrmResult<ApprovalDecision> {
        if let Some(placeholder) = decision.decisions.remove("_") {
            if pending.len() != 1 {
                return Err(CrmError::Input("a placeholder approval decision can only be used when exactly one action is pending".to_string()));
            }
            decision.decisions.insert(pending[0].action_id.clone(), placeholder);
        }
        Ok(decision)
    }

    /// `recall_memory` node: best-effort, never blocks the turn (spec §4.6).
    async fn recall_memory(&self, state: &mut CoordinatorState) {
        let query = state.messages.last().cloned().unwrap_or_default();
        state.memory_context = self.memory.recall(&query, &state.thread_id).await;
    }

    /// `route_domains` node. Returns `Some(outcome)` when the turn should
    /// short-circuit straight to a terminal outcome (invalid plan or nothing
    /// to do); `None` means proceed to `execute_subgraphs`.
    fn route_domains(&self, state: &mut CoordinatorState) -> Option<TurnOutcome> {
        let query = state.messages.last().cloned().unwrap_or_default();
        let plan = crm_planner::plan(&query, Some(&state.memory_context));

        if plan.metadata.warnings.iter().any(|w| w.contains("cycle")) {
            state.error = Some("the planner found a cyclic dependency in this request".to_string());
            return Some(self.handle_error(state));
        }

        state.entities = plan.analysis.entities.clone();

        if plan.is_empty() {
            state.final_response = Some("I didn't find anything actionable in that request.".to_string());
            return Some(TurnOutcome::Completed { response: state.final_response.clone().unwrap(), entities: state.entities.clone(), domains: vec![] });
        }

        state.plan = Some(plan);
        None
    }

    /// `execute_subgraphs` node: the central engine (spec §4.6 steps 1-7).
    async fn execute_subgraphs(&self, state: &mut CoordinatorState) -> Result<ExecuteOutcome, String> {
        let token = match self.credentials.get_token(&state.session_id).await {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(ExecuteOutcome::RequiresReauth),
            Err(err) => {
                warn!(session_id = %state.session_id, error = %err, "[COORDINATOR:EXECUTE] token acquisition failed");
                return Ok(ExecuteOutcome::RequiresReauth);
            }
        };

        let Some(plan) = state.plan.clone() else {
            return Err("no execution plan available".to_string());
        };

        let is_resume_apply = state.pending_approval.is_some() && state.approval_decision.is_some();

        let (parallel, sequential): (Vec<Domain>, Vec<crm_types::SequentialStep>) = if is_resume_apply {
            let narrowed: Vec<Domain> = state.pending_approval.as_ref().map(|p| p.domains.clone()).unwrap_or_default();
            if let Some(prior) = state.pending_approval.as_ref().map(|p| p.results.clone()) {
                if let Ok(restored) = serde_json::from_value::<HashMap<String, SubgraphOutput>>(prior) {
                    for (domain, output) in restored {
                        state.results.entry(domain).or_insert(output);
                    }
                }
            }
            let parallel = plan.parallel.iter().filter(|d| narrowed.contains(d)).copied().collect();
            let sequential = plan.sequential.iter().filter(|s| narrowed.contains(&s.domain)).cloned().collect();
            (parallel, sequential)
        } else {
            (plan.parallel.clone(), plan.sequential.clone())
        };

        let parallel_inputs: Vec<(Domain, SubgraphInput)> =
            parallel.iter().map(|d| (*d, self.build_subgraph_input(state, &token, *d, &HashMap::new()))).collect();

        let futures = parallel_inputs.into_iter().map(|(domain, input)| {
            let graph = self.subgraphs.compiled_for(domain).clone();
            let credentials = self.credentials.clone();
            let session_id = state.session_id.clone();
            async move { (domain, Self::invoke_with_reauth(&credentials, &session_id, &graph, input).await) }
        });
        let settled = join_all(futures).await;
        for (domain, result) in settled {
            let output = match result {
                Ok(output) => output,
                Err(()) => return Ok(ExecuteOutcome::RequiresReauth),
            };
            state.entities.extend(output.entities.clone());
            state.results.insert(domain.as_str().to_string(), output);
        }

        for step in &sequential {
            let dependencies: HashMap<String, serde_json::Value> = step
                .depends_on
                .iter()
                .filter_map(|d| state.results.get(d.as_str()).map(|r| (d.as_str().to_string(), Self::result_data(r))))
                .collect();
            let input = self.build_subgraph_input(state, &token, step.domain, &dependencies);
            let graph = self.subgraphs.compiled_for(step.domain).clone();
            let output = match Self::invoke_with_reauth(&self.credentials, &state.session_id, &graph, input).await {
                Ok(output) => output,
                Err(()) => return Ok(ExecuteOutcome::RequiresReauth),
            };
            state.entities.extend(output.entities.clone());
            state.results.insert(step.domain.as_str().to_string(), output);
        }

        if is_resume_apply {
            // Each domain's own `run()` dispatched the decision to the
            // matching `apply_*` above; the results in `state.results` are
            // already the post-mutation outputs, not re-proposals.
            state.pending_approval = None;
            state.approval_decision = None;
            return Ok(ExecuteOutcome::Continue);
        }

        let requests: Vec<ApprovalRequest> =
            state.results.values().filter_map(|r| if r.requires_approval { r.approval_request.clone() } else { None }).collect();

        if requests.is_empty() {
            return Ok(ExecuteOutcome::Continue);
        }

        let domains: Vec<Domain> = requests.iter().map(|r| r.domain).collect();
        let previews: Vec<String> = requests.iter().map(|r| r.preview.clone()).collect();
        let results_snapshot = serde_json::to_value(&state.results).map_err(|e| e.to_string())?;

        state.pending_approval = Some(PendingApproval { domains: domains.clone(), results: results_snapshot, requests: requests.clone(), processed: false, step_index: None });

        Ok(ExecuteOutcome::NeedsApproval(self.approval_handler(state, domains, previews, requests)))
    }

    /// Invokes a subgraph once; if it comes back with a classified
    /// authentication failure, forces a reactive credential refresh and
    /// retries exactly once with the new token (spec §4.1/§4.3 — a mid-turn
    /// 401 from the CRM, not just the proactive pre-execution check). `Err`
    /// means the refresh itself failed and the turn needs reauth.
    async fn invoke_with_reauth(credentials: &CredentialStore<B>, session_id: &str, graph: &CompiledGraph, input: SubgraphInput) -> Result<SubgraphOutput, ()> {
        let output = Self::invoke_subgraph(graph, input.clone()).await;
        if output.error_class != Some(ErrorClass::Authentication) {
            return Ok(output);
        }

        warn!(session_id, "[COORDINATOR:EXECUTE] mid-turn authentication failure, forcing reactive refresh");
        let Ok(token) = credentials.refresh(session_id).await else {
            return Err(());
        };

        let mut retried = input;
        retried.token = token;
        Ok(Self::invoke_subgraph(graph, retried).await)
    }

    /// `approval_handler` node: the single point where an interrupt is
    /// produced (spec §4.6, §4.7). Consolidates every pending request into
    /// one payload and publishes it through the Transport so both push-mode
    /// (WebSocket) and pull-mode (poll/acknowledge) clients can observe it; a
    /// resume re-enters `execute_subgraphs` instead (handled in `run_turn`,
    /// since the decision only ever arrives on the *next* HTTP call, never
    /// mid-turn).
    fn approval_handler(&self, state: &CoordinatorState, domains: Vec<Domain>, previews: Vec<String>, requests: Vec<ApprovalRequest>) -> TurnOutcome {
        info!(thread_id = %state.thread_id, domain_count = domains.len(), "[COORDINATOR:APPROVAL] consolidating pending requests");

        let interrupt_type = if requests.iter().any(|r| r.action == "contact_disambiguation") {
            InterruptType::ContactDisambiguation
        } else {
            InterruptType::ApprovalRequired
        };
        let message = "This action needs your approval before I continue.".to_string();
        let payload = InterruptPayload {
            interrupt_type,
            previews: previews.clone(),
            message: message.clone(),
            thread_id: state.thread_id.clone(),
            domains: domains.clone(),
            requests,
        };
        self.transport.publish(&state.session_id, &state.thread_id, interrupt_type, payload);

        TurnOutcome::PendingApproval { thread_id: state.thread_id.clone(), message, previews, domains }
    }

    /// `finalize_response` node: aggregates per-domain results into one
    /// message and fires memory synthesis best-effort (spec §4.6).
    async fn finalize_response(&self, state: &mut CoordinatorState) -> TurnOutcome {
        let mut domains: Vec<Domain> = state
            .plan
            .as_ref()
            .map(|p| p.all_domains())
            .unwrap_or_default();
        domains.sort_by_key(|d| d.as_str());

        let mut lines = Vec::new();
        for domain in &domains {
            match state.results.get(domain.as_str()) {
                Some(output) => {
                    if let Some(error) = &output.error {
                        lines.push(format!("{domain}: Error — {error}"));
                    } else if let Some(result) = &output.result {
                        if let Some(response) = &result.response {
                            lines.push(response.clone());
                        } else if let Some(data) = &result.data {
                            lines.push(format!("{domain}: {data}"));
                        }
                    }
                }
                None => lines.push(format!("{domain}: Error — no result was produced")),
            }
        }

        let response = if lines.is_empty() { "Done.".to_string() } else { lines.join("\n") };
        state.final_response = Some(response.clone());
        state.messages.push(response.clone());

        let memory = self.memory.clone();
        let thread_id = state.thread_id.clone();
        let messages = state.messages.clone();
        tokio::spawn(async move { memory.synthesize(&thread_id, &messages).await });

        TurnOutcome::Completed { response, entities: state.entities.clone(), domains }
    }

    /// `handle_error` node: converts `state.error` into a user-visible
    /// apology; never throws (spec §4.6).
    fn handle_error(&self, state: &CoordinatorState) -> TurnOutcome {
        let message = state.error.clone().unwrap_or_else(|| "something went wrong".to_string());
        warn!(thread_id = %state.thread_id, error = %message, "[COORDINATOR:ERROR] routed to handle_error");
        TurnOutcome::Failed { message: format!("Sorry, I couldn't do that: {message}") }
    }

    fn build_subgraph_input(&self, state: &CoordinatorState, token: &str, domain: Domain, dependencies: &HashMap<String, serde_json::Value>) -> SubgraphInput {
        SubgraphInput {
            messages: state.messages.clone(),
            memory_context: state.memory_context.clone(),
            entities: state.entities.clone(),
            timezone: state.timezone.clone(),
            session_id: state.session_id.clone(),
            org_id: state.org_id.clone(),
            user_id: state.user_id.clone(),
            thread_id: domain.namespace(),
            token: token.to_string(),
            dependencies: dependencies.clone(),
            approval_decision: state.approval_decision.clone(),
            pending_requests: state.pending_approval.as_ref().map(|p| p.requests.clone()).unwrap_or_default(),
        }
    }

    fn result_data(output: &SubgraphOutput) -> serde_json::Value {
        output.result.as_ref().and_then(|r| r.data.clone()).unwrap_or(serde_json::Value::Null)
    }

    async fn invoke_subgraph(graph: &CompiledGraph, input: SubgraphInput) -> SubgraphOutput {
        let value = match serde_json::to_value(&input) {
            Ok(value) => value,
            Err(err) => return SubgraphOutput::error(format!("couldn't encode subgraph input: {err}")),
        };
        match graph.invoke(value).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|err| SubgraphOutput::error(format!("couldn't decode subgraph output: {err}"))),
            Err(err) => SubgraphOutput::error(err.to_string()),
        }
    }
}

enum ExecuteOutcome {
    Continue,
    NeedsApproval(TurnOutcome),
    RequiresReauth,
}
