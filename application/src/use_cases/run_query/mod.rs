//! Run Query use case
//!
//! Drives one user query through the orchestrator state machine:
//!
//! | State           | Action                                                  |
//! |-----------------|---------------------------------------------------------|
//! | AwaitingQuery   | append the user turn                                    |
//! | Planning        | ask the oracle (hard timeout, cancellable)              |
//! | ExecutingTool   | resolve, validate, dispatch; append one tool turn       |
//! | Finalizing      | append the assistant turn                               |
//! | Done / Errored  | return the answer / the fatal error                     |
//!
//! Unknown tools and invalid arguments become error observations for the
//! oracle. Read-only calls of one planning step run concurrently, mutating
//! calls run afterwards one at a time; results are always reassembled in the
//! order the oracle requested the calls.

mod types;

pub use types::{RunQueryError, RunQueryInput, RunQueryOutput};

use crate::config::OrchestratorConfig;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger, event_types,
};
use crate::ports::conversation_memory::{ConversationMemory, MemoryError};
use crate::ports::oracle::{Oracle, OracleError};
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::shared::check_cancelled;
use crate::use_cases::tool_helpers::tool_args_preview;
use agentic_domain::core::string::truncate;
use agentic_domain::{
    CallId, ConversationId, DefaultToolValidator, OracleDecision, OrchestratorState, QueryRun,
    RequestedCall, ToolCall, ToolError, ToolRegistry, ToolResult, ToolSpec, ToolValidator, Turn,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const PARTIAL_RESULT_PREVIEW: usize = 300;

/// Use case for answering a query with tool use
pub struct RunQueryUseCase<
    O: Oracle + 'static,
    T: ToolExecutorPort + 'static,
    M: ConversationMemory + 'static,
> {
    oracle: Arc<O>,
    tool_executor: Arc<T>,
    memory: Arc<M>,
    config: OrchestratorConfig,
    logger: Arc<dyn ConversationLogger>,
    cancellation_token: Option<CancellationToken>,
    query_locks: Arc<Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<O, T, M> Clone for RunQueryUseCase<O, T, M>
where
    O: Oracle + 'static,
    T: ToolExecutorPort + 'static,
    M: ConversationMemory + 'static,
{
    fn clone(&self) -> Self {
        Self {
            oracle: self.oracle.clone(),
            tool_executor: self.tool_executor.clone(),
            memory: self.memory.clone(),
            config: self.config.clone(),
            logger: self.logger.clone(),
            cancellation_token: self.cancellation_token.clone(),
            query_locks: self.query_locks.clone(),
        }
    }
}

/// A call after registry lookup and argument validation.
enum Prepared<'a> {
    Ready { spec: &'a ToolSpec, call: ToolCall },
    Rejected(ToolResult),
}

impl<O, T, M> RunQueryUseCase<O, T, M>
where
    O: Oracle + 'static,
    T: ToolExecutorPort + 'static,
    M: ConversationMemory + 'static,
{
    pub fn new(
        oracle: Arc<O>,
        tool_executor: Arc<T>,
        memory: Arc<M>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            oracle,
            tool_executor,
            memory,
            config,
            logger: Arc::new(NoConversationLogger),
            cancellation_token: None,
            query_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Set a conversation logger for transcript recording
    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.tool_executor.registry()
    }

    pub async fn execute(&self, input: RunQueryInput) -> Result<RunQueryOutput, RunQueryError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    pub async fn execute_with_progress(
        &self,
        input: RunQueryInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunQueryOutput, RunQueryError> {
        let conversation_id = match input.conversation_id {
            Some(id) => id,
            None => self.memory.create().await,
        };

        // One in-flight query per conversation
        let guard = self.query_lock(conversation_id).lock_owned().await;
        let result = self.run_locked(conversation_id, &input, progress).await;
        drop(guard);
        self.prune_lock(conversation_id);
        result
    }

    async fn run_locked(
        &self,
        conversation_id: ConversationId,
        input: &RunQueryInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunQueryOutput, RunQueryError> {
        if input.conversation_id.is_some() {
            self.memory.ensure(conversation_id).await;
        }

        let mut run = QueryRun::new(self.config.max_steps);
        match self.drive(&mut run, conversation_id, input, progress).await {
            Ok(output) => Ok(output),
            Err(e) => {
                run.fail();
                warn!(
                    conversation = %conversation_id,
                    state = %run.state(),
                    error = %e,
                    "Query failed"
                );
                self.logger.log(ConversationEvent::new(
                    event_types::QUERY_FAILED,
                    json!({
                        "conversation_id": conversation_id,
                        "error": e.to_string(),
                    }),
                ));
                Err(e)
            }
        }
    }

    /// Visible history of a conversation, oldest first.
    pub async fn conversation_history(
        &self,
        id: ConversationId,
    ) -> Result<Vec<Turn>, MemoryError> {
        self.memory.history(id).await
    }

    /// Delete a conversation. Waits for any in-flight query on it first.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<(), MemoryError> {
        let guard = self.query_lock(id).lock_owned().await;
        let result = self.memory.delete(id).await;
        drop(guard);
        self.prune_lock(id);
        result
    }

    fn query_lock(&self, id: ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        self.query_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id)
            .or_default()
            .clone()
    }

    /// Drop the lock entry once nobody holds or waits on it.
    fn prune_lock(&self, id: ConversationId) {
        let mut locks = self.query_locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }

    async fn drive(
        &self,
        run: &mut QueryRun,
        conversation_id: ConversationId,
        input: &RunQueryInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunQueryOutput, RunQueryError> {
        check_cancelled(&self.cancellation_token)?;

        let query = input.query.content();
        info!(conversation = %conversation_id, "Processing query: {}", truncate(query, 80));

        self.memory
            .append(conversation_id, Turn::user(query))
            .await?;
        self.logger.log(ConversationEvent::new(
            event_types::USER_QUERY,
            json!({ "conversation_id": conversation_id, "query": query }),
        ));
        run.transition(OrchestratorState::Planning)?;

        let tools = self.tool_executor.registry().list_specs();
        let mut tool_results: Vec<ToolResult> = Vec::new();
        let mut tools_used: Vec<String> = Vec::new();

        loop {
            check_cancelled(&self.cancellation_token)?;
            progress.on_planning(run.steps() + 1);

            let history = self.memory.history(conversation_id).await?;
            let decision = self.ask_oracle(&history, tools).await?;
            self.logger.log(ConversationEvent::new(
                event_types::ORACLE_DECISION,
                json!({ "conversation_id": conversation_id, "decision": decision }),
            ));

            let requested = match decision {
                OracleDecision::FinalAnswer(answer) => {
                    run.transition(OrchestratorState::Finalizing)?;
                    return self
                        .finalize(run, conversation_id, input, answer, tools_used, tool_results, false, progress)
                        .await;
                }
                OracleDecision::ToolCalls(requested) if requested.is_empty() => {
                    return Err(RunQueryError::OracleUnavailable(
                        OracleError::InvalidResponse("empty tool call list".to_string()),
                    ));
                }
                OracleDecision::ToolCalls(requested) => requested,
            };

            if !run.begin_step()? {
                warn!(
                    conversation = %conversation_id,
                    max_steps = run.max_steps(),
                    "Step limit reached, finalizing with best-effort answer"
                );
                progress.on_step_limit(run.max_steps());
                self.logger.log(ConversationEvent::new(
                    event_types::STEP_LIMIT,
                    json!({
                        "conversation_id": conversation_id,
                        "max_steps": run.max_steps(),
                        "pending_calls": requested.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
                    }),
                ));
                run.transition(OrchestratorState::Finalizing)?;
                let answer = best_effort_answer(run.max_steps(), &tool_results);
                return self
                    .finalize(run, conversation_id, input, answer, tools_used, tool_results, true, progress)
                    .await;
            }

            let (calls, argument_errors): (Vec<ToolCall>, Vec<Option<String>>) =
                assign_call_ids(run.steps(), requested).into_iter().unzip();
            let results = self.execute_calls(&calls, &argument_errors, progress).await;

            for call in &calls {
                if self.registry().contains(&call.tool_name)
                    && !tools_used.iter().any(|t| t == &call.tool_name)
                {
                    tools_used.push(call.tool_name.clone());
                }
            }
            tool_results.extend(results.iter().cloned());

            let turn = Turn::tool_exchange(calls, results)?;
            self.memory.append(conversation_id, turn).await?;
            run.transition(OrchestratorState::Planning)?;
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        run: &mut QueryRun,
        conversation_id: ConversationId,
        input: &RunQueryInput,
        answer: String,
        tools_used: Vec<String>,
        tool_results: Vec<ToolResult>,
        step_limit_reached: bool,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunQueryOutput, RunQueryError> {
        self.memory
            .append(conversation_id, Turn::assistant(answer.clone()))
            .await?;
        self.logger.log(ConversationEvent::new(
            event_types::ANSWER,
            json!({
                "conversation_id": conversation_id,
                "answer": answer,
                "steps": run.steps(),
                "step_limit_reached": step_limit_reached,
            }),
        ));
        run.transition(OrchestratorState::Done)?;
        progress.on_answer(&answer);

        info!(
            conversation = %conversation_id,
            steps = run.steps(),
            tools = tool_results.len(),
            "Query answered"
        );

        Ok(RunQueryOutput {
            conversation_id,
            query: input.query.content().to_string(),
            answer,
            steps: run.steps(),
            tools_used,
            tool_results,
            step_limit_reached,
            final_state: run.state(),
        })
    }

    async fn ask_oracle(
        &self,
        history: &[Turn],
        tools: &[ToolSpec],
    ) -> Result<OracleDecision, RunQueryError> {
        let call = tokio::time::timeout(
            self.config.oracle_timeout,
            self.oracle.decide(history, tools),
        );

        let outcome = if let Some(token) = &self.cancellation_token {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(RunQueryError::Cancelled),
                outcome = call => outcome,
            }
        } else {
            call.await
        };

        match outcome {
            Err(_) => {
                warn!(timeout = ?self.config.oracle_timeout, "Oracle call timed out");
                Err(RunQueryError::OracleUnavailable(OracleError::Timeout))
            }
            Ok(Err(e)) => Err(RunQueryError::OracleUnavailable(e)),
            Ok(Ok(decision)) => Ok(decision),
        }
    }

    /// Execute one planning step's calls and return their results in
    /// request order.
    async fn execute_calls(
        &self,
        calls: &[ToolCall],
        argument_errors: &[Option<String>],
        progress: &dyn ProgressNotifier,
    ) -> Vec<ToolResult> {
        let registry = self.tool_executor.registry();
        let mut slots: Vec<Option<ToolResult>> = vec![None; calls.len()];
        let mut concurrent = Vec::new();
        let mut sequential = Vec::new();

        for (index, call) in calls.iter().enumerate() {
            debug!(
                call_id = %call.call_id,
                tool = %call.tool_name,
                "Dispatching tool call: {}",
                tool_args_preview(call)
            );
            progress.on_tool_start(call);
            let argument_error = argument_errors.get(index).and_then(Option::as_deref);
            match prepare(registry, call, argument_error) {
                Prepared::Rejected(result) => slots[index] = Some(result),
                Prepared::Ready { spec, call } => {
                    if spec.side_effect.is_read_only() {
                        concurrent.push((index, spec, call));
                    } else {
                        sequential.push((index, spec, call));
                    }
                }
            }
        }

        // Read-only calls in parallel
        let futures = concurrent
            .iter()
            .map(|(_, spec, call)| self.tool_executor.execute(spec, call));
        let results = futures::future::join_all(futures).await;
        for ((index, _, _), result) in concurrent.iter().zip(results) {
            slots[*index] = Some(result);
        }

        // Mutating calls one at a time, in request order
        for (index, spec, call) in &sequential {
            slots[*index] = Some(self.tool_executor.execute(spec, call).await);
        }

        calls
            .iter()
            .zip(slots)
            .map(|(call, slot)| {
                let result = match slot {
                    Some(result) if result.call_id() == &call.call_id => result,
                    Some(_) => ToolResult::failed(
                        call.call_id.clone(),
                        &call.tool_name,
                        &ToolError::Execution("executor returned a result for another call".to_string()),
                    ),
                    None => ToolResult::failed(
                        call.call_id.clone(),
                        &call.tool_name,
                        &ToolError::Execution("no result produced".to_string()),
                    ),
                };
                self.log_result(call, &result);
                progress.on_tool_complete(&result);
                result
            })
            .collect()
    }

    fn log_result(&self, call: &ToolCall, result: &ToolResult) {
        if result.is_ok() {
            debug!(call_id = %call.call_id, tool = %call.tool_name, "Tool call succeeded");
        } else {
            warn!(
                call_id = %call.call_id,
                tool = %call.tool_name,
                status = %result.status(),
                detail = result.error_detail().unwrap_or_default(),
                "Tool call failed"
            );
        }
        self.logger.log(ConversationEvent::new(
            event_types::TOOL_CALL,
            json!({ "call": call }),
        ));
        self.logger.log(ConversationEvent::new(
            event_types::TOOL_RESULT,
            json!({ "result": result }),
        ));
    }
}

fn assign_call_ids(step: usize, requested: Vec<RequestedCall>) -> Vec<(ToolCall, Option<String>)> {
    requested
        .into_iter()
        .enumerate()
        .map(|(index, r)| {
            let call =
                ToolCall::new(CallId::for_step(step, index), r.name).with_arguments(r.arguments);
            (call, r.argument_error)
        })
        .collect()
}

fn prepare<'a>(
    registry: &'a ToolRegistry,
    call: &ToolCall,
    argument_error: Option<&str>,
) -> Prepared<'a> {
    let spec = match registry.resolve(&call.tool_name) {
        Ok(spec) => spec,
        Err(_) => {
            return Prepared::Rejected(ToolResult::failed(
                call.call_id.clone(),
                &call.tool_name,
                &ToolError::UnknownTool(call.tool_name.clone()),
            ));
        }
    };

    if let Some(reason) = argument_error {
        return Prepared::Rejected(ToolResult::failed(
            call.call_id.clone(),
            &call.tool_name,
            &ToolError::validation(&call.tool_name, reason),
        ));
    }

    match DefaultToolValidator.validate(call, spec) {
        Ok(arguments) => Prepared::Ready {
            spec,
            call: ToolCall::new(call.call_id.clone(), &call.tool_name).with_arguments(arguments),
        },
        Err(e) => Prepared::Rejected(ToolResult::failed(call.call_id.clone(), &call.tool_name, &e)),
    }
}

/// Answer used when the step budget runs out before the oracle answers.
/// Always non-empty.
fn best_effort_answer(max_steps: usize, results: &[ToolResult]) -> String {
    let mut answer = format!(
        "I could not reach a final answer within the limit of {} tool steps.",
        max_steps
    );
    let partial: Vec<String> = results
        .iter()
        .filter(|r| r.is_ok())
        .map(|r| {
            format!(
                "- {}: {}",
                r.tool_name(),
                truncate(&r.observation(), PARTIAL_RESULT_PREVIEW)
            )
        })
        .collect();

    if partial.is_empty() {
        answer.push_str(" No tool produced a usable result.");
    } else {
        answer.push_str(" Partial results gathered so far:\n");
        answer.push_str(&partial.join("\n"));
    }
    answer
}

#[cfg(test)]
mod tests;
