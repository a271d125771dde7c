use std::time::Instant;

use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::answer::compose_answer;
use super::Orchestrator;
use crate::a2a::{AgentName, SubmitOptions, DEFAULT_TASK_TIMEOUT};
use crate::domain::retrieval::merge_hits;
use crate::domain::{
    ChatRequest, ChatResponse, DroneState, ExecutionReport, Plan, Reflection, RetrievalFilters,
    RetrievalHit, RetrievalOutcome, ToolDescriptor,
};
use crate::events::{phase, AgentEvent};
use crate::services::mcp::MISSION_TOOL;

impl Orchestrator {
    /// Drive one request through preparation and the bounded ReAct loop.
    ///
    /// Stage order within a request is fixed:
    /// RAG → STATE → TOOLS → (PLAN → [RAG_RETRY → PLAN]* → EXECUTE →
    /// OBSERVE → REFLECT)*.
    pub(crate) async fn run_request(&self, request: &ChatRequest, request_id: &str) -> ChatResponse {
        let filters = effective_filters(request);
        let mut response = ChatResponse {
            success: true,
            ..ChatResponse::default()
        };

        // Preparation: all three probes are best-effort.
        let mut rag_hits = self.prep_retrieval(request, &filters, request_id).await;
        let mut drone_state = self.fetch_state(request_id, phase::STATE).await;
        let tools = self.fetch_tools(request_id).await;

        let mut goal_achieved = false;
        let mut iteration = 0;
        let mut rag_retries = 0;
        let mut last_plan: Option<Plan> = None;
        let mut last_report: Option<ExecutionReport> = None;
        let mut reflections: Vec<Reflection> = Vec::new();
        let mut nothing_to_execute = false;

        while iteration < self.max_iterations && !goal_achieved {
            iteration += 1;

            // a. Plan: a failure here is fatal for the request.
            let plan = match self
                .call_plan(request, &rag_hits, drone_state.as_ref(), &tools, request_id, iteration)
                .await
            {
                Ok(plan) => plan,
                Err(err) => {
                    error!(%err, "planning failed, aborting request");
                    response.success = false;
                    response.error = Some(err.clone());
                    response.answer =
                        format!("I could not work out a plan for this request: {err}");
                    response.react_iterations = iteration;
                    response.rag_retries = rag_retries;
                    response.rag_hits = rag_hits;
                    response.reflections = reflections;
                    return response;
                }
            };

            // b. Clarification handling, with targeted re-retrieval.
            if plan.needs_clarification {
                if !plan.missing_locations.is_empty() && rag_retries < self.max_rag_retries {
                    rag_retries += 1;
                    let fresh = self
                        .retry_missing(&plan.missing_locations, &filters, request_id, rag_retries)
                        .await;
                    let before = rag_hits.len();
                    rag_hits = merge_hits([std::mem::take(&mut rag_hits), fresh]);
                    if rag_hits.len() > before {
                        info!(
                            added = rag_hits.len() - before,
                            retry = rag_retries,
                            "re-retrieval enriched the context, replanning"
                        );
                        continue;
                    }
                    // Zero new hits: no point replanning with the same context.
                }

                let question = plan.clarification_question.clone().unwrap_or_else(|| {
                    if plan.missing_locations.is_empty() {
                        "I need more information to carry out this request.".to_string()
                    } else {
                        format!(
                            "I could not locate: {}. Can you describe where they are?",
                            plan.missing_locations.join(", ")
                        )
                    }
                });
                response.answer = question;
                response.needs_clarification = true;
                response.reasoning = plan.reasoning.clone();
                response.plan = Some(plan);
                response.react_iterations = iteration;
                response.rag_retries = rag_retries;
                response.rag_hits = rag_hits;
                response.reflections = reflections;
                return response;
            }

            // c. Act. A plan with no steps means there is nothing to do.
            if plan.steps.is_empty() {
                info!("plan has zero steps, nothing to execute");
                nothing_to_execute = true;
                goal_achieved = true;
                last_plan = Some(plan);
                break;
            }

            let report = self.call_execute(&plan, request_id).await;
            response.tool_calls.extend(report.results.iter().cloned());
            response.execution_success = report.all_success;

            // d. Observe.
            drone_state = self.fetch_state(request_id, phase::OBSERVE).await;

            // e. Reflect.
            match self
                .call_reflect(request, &plan, &report, drone_state.as_ref(), &rag_hits, &tools, request_id)
                .await
            {
                Ok(reflection) => {
                    let accepts = reflection.accepts_goal();
                    let has_next = !reflection.next_steps.is_empty();
                    reflections.push(reflection);
                    last_plan = Some(plan);
                    last_report = Some(report);
                    if accepts {
                        goal_achieved = true;
                    } else if !has_next {
                        // No verdict and no remediation: stop burning budget.
                        break;
                    }
                }
                Err(err) => {
                    // f. A failed reflection exits the loop; the achieved
                    // execution results still reach the user.
                    warn!(%err, "reflection failed, exiting loop");
                    last_plan = Some(plan);
                    last_report = Some(report);
                    break;
                }
            }
        }

        let plan_reasoning = last_plan.as_ref().map(|p| p.reasoning.clone()).unwrap_or_default();
        let execution_summary = match (&last_report, nothing_to_execute) {
            (Some(report), _) => Some(report.summary()),
            (None, true) => Some("Nothing to execute for this request.".to_string()),
            (None, false) => None,
        };
        let reflection_summary = reflections.last().map(|r| r.summary.clone());

        response.answer = compose_answer(
            &plan_reasoning,
            execution_summary.as_deref(),
            reflection_summary.as_deref(),
            iteration,
        );
        response.reasoning = plan_reasoning;
        response.plan = last_plan;
        response.goal_achieved = goal_achieved;
        response.react_iterations = iteration;
        response.rag_retries = rag_retries;
        response.rag_hits = rag_hits;
        response.reflections = reflections;
        response
    }

    async fn prep_retrieval(
        &self,
        request: &ChatRequest,
        filters: &RetrievalFilters,
        request_id: &str,
    ) -> Vec<RetrievalHit> {
        let started = Instant::now();
        self.emit(AgentEvent::start(
            request_id,
            AgentName::Retriever.as_str(),
            phase::RAG,
            json!({"query": request.message}),
        ))
        .await;

        let result = self
            .client
            .submit(
                AgentName::Retriever,
                "smart_retrieve",
                json!({"query": request.message, "filters": filters}),
                SubmitOptions::default(),
            )
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let hits = match result.parse_output::<RetrievalOutcome>() {
            Ok(outcome) => {
                // Targets the planner never flags have no recovery path;
                // make the gap visible in the logs.
                for (target, hits) in &outcome.target_hits {
                    if hits.is_empty() {
                        warn!(rag_target = %target, "retrieval target produced zero hits");
                    }
                }
                self.emit(AgentEvent::end(
                    request_id,
                    AgentName::Retriever.as_str(),
                    phase::RAG,
                    json!({
                        "hits": outcome.hits.len(),
                        "total_found": outcome.total_found,
                        "duration_ms": duration_ms,
                    }),
                ))
                .await;
                outcome.hits
            }
            Err(e) => {
                warn!(error = %e, "smart retrieval failed, continuing without context");
                self.emit(AgentEvent::end(
                    request_id,
                    AgentName::Retriever.as_str(),
                    phase::RAG,
                    json!({"error": e.to_string(), "duration_ms": duration_ms}),
                ))
                .await;
                Vec::new()
            }
        };
        hits
    }

    async fn fetch_state(&self, request_id: &str, stage: &str) -> Option<DroneState> {
        let started = Instant::now();
        self.emit(AgentEvent::start(request_id, AgentName::Executor.as_str(), stage, Value::Null))
            .await;

        let result = self
            .client
            .submit(AgentName::Executor, "get_drone_state", json!({}), SubmitOptions::default())
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result.parse_output::<DroneState>() {
            Ok(state) => {
                self.emit(AgentEvent::end(
                    request_id,
                    AgentName::Executor.as_str(),
                    stage,
                    json!({"state": state.summary(), "duration_ms": duration_ms}),
                ))
                .await;
                Some(state)
            }
            Err(e) => {
                warn!(error = %e, "drone state unavailable");
                self.emit(AgentEvent::end(
                    request_id,
                    AgentName::Executor.as_str(),
                    stage,
                    json!({"error": e.to_string(), "duration_ms": duration_ms}),
                ))
                .await;
                None
            }
        }
    }

    async fn fetch_tools(&self, request_id: &str) -> Vec<ToolDescriptor> {
        #[derive(serde::Deserialize)]
        struct Listing {
            #[serde(default)]
            tools: Vec<ToolDescriptor>,
        }

        let started = Instant::now();
        self.emit(AgentEvent::start(request_id, AgentName::Executor.as_str(), phase::TOOLS, Value::Null))
            .await;

        let result = self
            .client
            .submit(AgentName::Executor, "list_tools", json!({}), SubmitOptions::default())
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let tools = match result.parse_output::<Listing>() {
            Ok(listing) => listing.tools,
            Err(e) => {
                warn!(error = %e, "tool catalog unavailable, planner will ask for clarification");
                Vec::new()
            }
        };
        self.emit(AgentEvent::end(
            request_id,
            AgentName::Executor.as_str(),
            phase::TOOLS,
            json!({"count": tools.len(), "duration_ms": duration_ms}),
        ))
        .await;
        tools
    }

    async fn call_plan(
        &self,
        request: &ChatRequest,
        rag_hits: &[RetrievalHit],
        drone_state: Option<&DroneState>,
        tools: &[ToolDescriptor],
        request_id: &str,
        iteration: usize,
    ) -> Result<Plan, String> {
        let started = Instant::now();
        self.emit(AgentEvent::start(
            request_id,
            AgentName::Planner.as_str(),
            phase::PLAN,
            json!({"iteration": iteration, "hits": rag_hits.len(), "tools": tools.len()}),
        ))
        .await;

        let result = self
            .client
            .submit(
                AgentName::Planner,
                "plan",
                json!({
                    "user_request": request.message,
                    "rag_hits": rag_hits,
                    "drone_state": drone_state,
                    "available_tools": tools,
                }),
                SubmitOptions::default(),
            )
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = result.parse_output::<Plan>().map_err(|e| e.to_string());
        self.emit(AgentEvent::end(
            request_id,
            AgentName::Planner.as_str(),
            phase::PLAN,
            match &outcome {
                Ok(plan) => json!({
                    "steps": plan.steps.len(),
                    "needs_clarification": plan.needs_clarification,
                    "missing_locations": plan.missing_locations,
                    "duration_ms": duration_ms,
                }),
                Err(e) => json!({"error": e, "duration_ms": duration_ms}),
            },
        ))
        .await;
        outcome
    }

    async fn retry_missing(
        &self,
        missing: &[String],
        filters: &RetrievalFilters,
        request_id: &str,
        retry: usize,
    ) -> Vec<RetrievalHit> {
        let started = Instant::now();
        self.emit(AgentEvent::start(
            request_id,
            AgentName::Retriever.as_str(),
            phase::RAG_RETRY,
            json!({"targets": missing, "retry": retry}),
        ))
        .await;

        let result = self
            .client
            .submit(
                AgentName::Retriever,
                "retrieve_missing",
                json!({"missing_targets": missing, "filters": filters}),
                SubmitOptions::default(),
            )
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let hits = match result.parse_output::<RetrievalOutcome>() {
            Ok(outcome) => outcome.hits,
            Err(e) => {
                warn!(error = %e, "targeted re-retrieval failed");
                Vec::new()
            }
        };
        self.emit(AgentEvent::end(
            request_id,
            AgentName::Retriever.as_str(),
            phase::RAG_RETRY,
            json!({"hits": hits.len(), "retry": retry, "duration_ms": duration_ms}),
        ))
        .await;
        hits
    }

    async fn call_execute(&self, plan: &Plan, request_id: &str) -> ExecutionReport {
        let started = Instant::now();
        self.emit(AgentEvent::start(
            request_id,
            AgentName::Executor.as_str(),
            phase::EXECUTE,
            json!({"steps": plan.steps.len()}),
        ))
        .await;

        // Mission plans get a deadline above the endpoint's own ceiling so
        // the transport never cancels a mission the executor still allows.
        let timeout = if plan.steps.iter().any(|s| s.tool == MISSION_TOOL) {
            self.mission_timeout + DEFAULT_TASK_TIMEOUT
        } else {
            DEFAULT_TASK_TIMEOUT
        };

        let result = self
            .client
            .submit(
                AgentName::Executor,
                "execute",
                json!({"steps": plan.steps, "stop_on_error": true}),
                SubmitOptions::with_timeout(timeout),
            )
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let report = match result.parse_output::<ExecutionReport>() {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "execute dispatch failed");
                ExecutionReport {
                    results: Vec::new(),
                    all_success: false,
                    completed_steps: 0,
                    total_steps: plan.steps.len(),
                    total_duration_ms: duration_ms,
                }
            }
        };
        self.emit(AgentEvent::end(
            request_id,
            AgentName::Executor.as_str(),
            phase::EXECUTE,
            json!({
                "completed_steps": report.completed_steps,
                "total_steps": report.total_steps,
                "all_success": report.all_success,
                "duration_ms": duration_ms,
            }),
        ))
        .await;
        report
    }

    #[allow(clippy::too_many_arguments)]
    async fn call_reflect(
        &self,
        request: &ChatRequest,
        plan: &Plan,
        report: &ExecutionReport,
        drone_state: Option<&DroneState>,
        rag_hits: &[RetrievalHit],
        tools: &[ToolDescriptor],
        request_id: &str,
    ) -> Result<Reflection, String> {
        let started = Instant::now();
        self.emit(AgentEvent::start(
            request_id,
            AgentName::Planner.as_str(),
            phase::REFLECT,
            Value::Null,
        ))
        .await;

        let result = self
            .client
            .submit(
                AgentName::Planner,
                "reflect",
                json!({
                    "original_request": request.message,
                    "previous_plan": plan,
                    "execution_result": report,
                    "current_drone_state": drone_state,
                    "rag_hits": rag_hits,
                    "available_tools": tools,
                }),
                SubmitOptions::default(),
            )
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = result.parse_output::<Reflection>().map_err(|e| e.to_string());
        self.emit(AgentEvent::end(
            request_id,
            AgentName::Planner.as_str(),
            phase::REFLECT,
            match &outcome {
                Ok(r) => json!({
                    "goal_achieved": r.goal_achieved,
                    "confidence": r.confidence,
                    "next_steps": r.next_steps.len(),
                    "duration_ms": duration_ms,
                }),
                Err(e) => json!({"error": e, "duration_ms": duration_ms}),
            },
        ))
        .await;
        outcome
    }
}

fn effective_filters(request: &ChatRequest) -> RetrievalFilters {
    let mut filters = request.filters.clone().unwrap_or_default();
    if filters.map_id.is_none() {
        filters.map_id = request.map_id.clone();
    }
    filters
}
