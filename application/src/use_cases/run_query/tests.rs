use super::*;
use crate::ports::oracle::ScriptedOracle;
use agentic_domain::{
    Conversation, ParamType, Query, Role, ToolKind, ToolParameter, ToolStatus,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ==================== Test doubles ====================

struct TestMemory {
    capacity: usize,
    conversations: Mutex<HashMap<ConversationId, Conversation>>,
}

impl TestMemory {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            conversations: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ConversationMemory for TestMemory {
    async fn create(&self) -> ConversationId {
        let id = ConversationId::new();
        self.ensure(id).await;
        id
    }

    async fn ensure(&self, id: ConversationId) {
        self.conversations
            .lock()
            .unwrap()
            .entry(id)
            .or_insert_with(|| Conversation::new(id, self.capacity));
    }

    async fn append(&self, id: ConversationId, turn: Turn) -> Result<u64, MemoryError> {
        let mut conversations = self.conversations.lock().unwrap();
        let conversation = conversations.get_mut(&id).ok_or(MemoryError::NotFound(id))?;
        Ok(conversation.append(turn))
    }

    async fn history(&self, id: ConversationId) -> Result<Vec<Turn>, MemoryError> {
        self.conversations
            .lock()
            .unwrap()
            .get(&id)
            .map(|c| c.history())
            .ok_or(MemoryError::NotFound(id))
    }

    async fn delete(&self, id: ConversationId) -> Result<(), MemoryError> {
        self.conversations
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(MemoryError::NotFound(id))
    }

    async fn list(&self) -> Vec<ConversationId> {
        self.conversations.lock().unwrap().keys().copied().collect()
    }
}

/// Executor with canned behaviour per tool name.
///
/// - `web_search`: returns `max_results` items
/// - `slow_search`: sleeps for `delay_ms` then echoes it
/// - `code_execute`: denied if the code mentions `import os`, otherwise ok
///   after `delay_ms`
struct MockExecutor {
    registry: ToolRegistry,
    executed: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    max_active_mutating: AtomicUsize,
    order: Mutex<Vec<String>>,
}

impl MockExecutor {
    fn new() -> Self {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new("web_search", "Search the web", ToolKind::WebSearch)
                    .with_parameter(ToolParameter::new("query", "Query", ParamType::String, true))
                    .with_parameter(
                        ToolParameter::new("max_results", "Count", ParamType::Integer, false)
                            .with_default(5)
                            .with_range(Some(1.0), Some(10.0)),
                    ),
            )
            .unwrap();
        registry
            .register(
                ToolSpec::new("slow_search", "Slow search", ToolKind::WebSearch).with_parameter(
                    ToolParameter::new("delay_ms", "Delay", ParamType::Integer, true),
                ),
            )
            .unwrap();
        registry
            .register(
                ToolSpec::new("code_execute", "Run code", ToolKind::CodeExecution)
                    .with_parameter(ToolParameter::new("code", "Code", ParamType::String, true))
                    .with_parameter(
                        ToolParameter::new("delay_ms", "Delay", ParamType::Integer, false)
                            .with_default(0),
                    ),
            )
            .unwrap();

        Self {
            registry,
            executed: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            max_active_mutating: AtomicUsize::new(0),
            order: Mutex::new(Vec::new()),
        }
    }

    fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolExecutorPort for MockExecutor {
    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn execute(&self, spec: &ToolSpec, call: &ToolCall) -> ToolResult {
        self.executed.fetch_add(1, Ordering::SeqCst);
        self.order.lock().unwrap().push(call.call_id.to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !spec.side_effect.is_read_only() {
            self.max_active_mutating.fetch_max(now, Ordering::SeqCst);
        }

        let delay = call.get_i64("delay_ms").unwrap_or(0) as u64;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let outcome = match spec.name.as_str() {
            "web_search" => {
                let n = call.get_i64("max_results").unwrap_or(5) as usize;
                let query = call.get_string("query").unwrap_or_default();
                Ok(Value::Array(
                    (0..n)
                        .map(|i| json!({"title": format!("{} {}", query, i), "snippet": "", "url": ""}))
                        .collect(),
                ))
            }
            "slow_search" => Ok(json!({ "delay_ms": delay })),
            "code_execute" => {
                if call.get_string("code").unwrap_or_default().contains("import os") {
                    Err(ToolError::CapabilityDenied("os".to_string()))
                } else {
                    Ok(json!({ "stdout": "ok" }))
                }
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        ToolResult::from_outcome(call.call_id.clone(), &call.tool_name, outcome)
    }
}

// ==================== Helpers ====================

type TestUseCase = RunQueryUseCase<ScriptedOracle, MockExecutor, TestMemory>;

fn use_case(oracle: ScriptedOracle, config: OrchestratorConfig) -> (TestUseCase, Arc<ScriptedOracle>, Arc<MockExecutor>, Arc<TestMemory>) {
    let oracle = Arc::new(oracle);
    let executor = Arc::new(MockExecutor::new());
    let memory = Arc::new(TestMemory::new(config.history_length));
    let uc = RunQueryUseCase::new(oracle.clone(), executor.clone(), memory.clone(), config);
    (uc, oracle, executor, memory)
}

fn input(q: &str) -> RunQueryInput {
    RunQueryInput::new(Query::try_new(q).unwrap())
}

fn call(name: &str) -> RequestedCall {
    RequestedCall::new(name)
}

fn assert_call_ids_match(history: &[Turn]) {
    for turn in history {
        assert_eq!(turn.tool_calls.len(), turn.tool_results.len());
        for (c, r) in turn.tool_calls.iter().zip(&turn.tool_results) {
            assert_eq!(&c.call_id, r.call_id());
        }
    }
}

// ==================== Scenarios ====================

#[tokio::test]
async fn test_search_then_answer() {
    let oracle = ScriptedOracle::new([
        OracleDecision::call(call("web_search").with_arg("query", "X").with_arg("max_results", 5)),
        OracleDecision::answer("X is a letter."),
    ]);
    let (uc, oracle, _, _) = use_case(oracle, OrchestratorConfig::default());

    let output = uc.execute(input("search for X")).await.unwrap();
    assert_eq!(output.answer, "X is a letter.");
    assert_eq!(output.steps, 1);
    assert_eq!(output.tools_used, vec!["web_search"]);
    assert!(!output.step_limit_reached);
    assert_eq!(output.final_state, OrchestratorState::Done);
    assert_eq!(oracle.calls(), 2);

    let history = uc.conversation_history(output.conversation_id).await.unwrap();
    let roles: Vec<Role> = history.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Tool, Role::Assistant]);

    let tool_turn = &history[1];
    assert_eq!(tool_turn.tool_results.len(), 1);
    let result = &tool_turn.tool_results[0];
    assert_eq!(result.status(), ToolStatus::Ok);
    assert!(result.payload().unwrap().as_array().unwrap().len() <= 5);
    assert_call_ids_match(&history);

    // The second planning step saw the tool turn
    let seen = oracle.seen_histories();
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[1].len(), 2);
}

#[tokio::test]
async fn test_unknown_tool_is_observation() {
    let oracle = ScriptedOracle::new([
        OracleDecision::call(call("teleport")),
        OracleDecision::answer("I cannot teleport."),
    ]);
    let (uc, _, executor, _) = use_case(oracle, OrchestratorConfig::default());

    let output = uc.execute(input("go")).await.unwrap();
    assert_eq!(output.answer, "I cannot teleport.");
    assert!(output.tools_used.is_empty());
    assert_eq!(output.tool_results.len(), 1);
    let result = &output.tool_results[0];
    assert_eq!(result.status(), ToolStatus::Error);
    assert_eq!(result.metadata().error_code.as_deref(), Some("UNKNOWN_TOOL"));
    assert_eq!(executor.executed(), 0);
}

#[tokio::test]
async fn test_validation_error_is_observation() {
    let oracle = ScriptedOracle::new([
        OracleDecision::call(call("web_search").with_arg("max_results", 50)),
        OracleDecision::answer("done"),
    ]);
    let (uc, _, executor, _) = use_case(oracle, OrchestratorConfig::default());

    let output = uc.execute(input("search")).await.unwrap();
    let result = &output.tool_results[0];
    assert_eq!(result.status(), ToolStatus::Error);
    assert_eq!(result.metadata().error_code.as_deref(), Some("INVALID_ARGUMENT"));
    assert!(result.error_detail().unwrap().contains("query"));
    assert_eq!(executor.executed(), 0);
}

#[tokio::test]
async fn test_unreadable_arguments_are_observation() {
    let oracle = ScriptedOracle::new([
        OracleDecision::call(RequestedCall::malformed(
            "web_search",
            "arguments are not valid JSON: EOF while parsing",
        )),
        OracleDecision::answer("Let me try that again later."),
    ]);
    let (uc, oracle, executor, _) = use_case(oracle, OrchestratorConfig::default());

    let output = uc.execute(input("search")).await.unwrap();
    assert_eq!(output.answer, "Let me try that again later.");
    assert_eq!(output.final_state, OrchestratorState::Done);
    let result = &output.tool_results[0];
    assert_eq!(result.status(), ToolStatus::Error);
    assert_eq!(result.metadata().error_code.as_deref(), Some("INVALID_ARGUMENT"));
    assert!(result.error_detail().unwrap().contains("not valid JSON"));
    assert_eq!(executor.executed(), 0);
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn test_denied_code_conversation_continues() {
    let oracle = ScriptedOracle::new([
        OracleDecision::call(call("code_execute").with_arg("code", "import os\nos.listdir('/')")),
        OracleDecision::answer("That code is not allowed, but here is my answer."),
    ]);
    let (uc, _, _, _) = use_case(oracle, OrchestratorConfig::default());

    let output = uc.execute(input("list files")).await.unwrap();
    assert_eq!(output.tool_results[0].status(), ToolStatus::Denied);
    assert!(!output.answer.is_empty());
    assert_eq!(output.final_state, OrchestratorState::Done);
}

#[tokio::test]
async fn test_step_limit_yields_best_effort_answer() {
    let decisions = (0..10).map(|i| {
        OracleDecision::call(call("web_search").with_arg("query", format!("q{}", i)))
    });
    let oracle = ScriptedOracle::new(decisions);
    let config = OrchestratorConfig::default().with_max_steps(3);
    let (uc, oracle, executor, _) = use_case(oracle, config);

    let output = uc.execute(input("loop forever")).await.unwrap();
    assert!(output.step_limit_reached);
    assert_eq!(output.steps, 3);
    assert_eq!(executor.executed(), 3);
    assert_eq!(oracle.calls(), 4);
    assert!(!output.answer.is_empty());
    assert!(output.answer.contains("limit of 3"));
    assert!(output.answer.contains("web_search"));
    assert_eq!(output.final_state, OrchestratorState::Done);

    let history = uc.conversation_history(output.conversation_id).await.unwrap();
    assert_eq!(history.last().unwrap().role, Role::Assistant);
}

#[tokio::test]
async fn test_zero_step_budget() {
    let oracle = ScriptedOracle::new([OracleDecision::call(call("web_search").with_arg("query", "x"))]);
    let config = OrchestratorConfig::default().with_max_steps(0);
    let (uc, _, executor, _) = use_case(oracle, config);

    let output = uc.execute(input("hi")).await.unwrap();
    assert!(output.step_limit_reached);
    assert_eq!(output.steps, 0);
    assert_eq!(executor.executed(), 0);
    assert!(output.answer.contains("No tool produced"));
}

#[tokio::test]
async fn test_oracle_timeout_is_fatal_but_memory_kept() {
    let oracle = ScriptedOracle::new([OracleDecision::answer("too late")])
        .with_delay(Duration::from_millis(500));
    let config = OrchestratorConfig::default().with_oracle_timeout(Duration::from_millis(20));
    let (uc, _, _, memory) = use_case(oracle, config);

    let id = memory.create().await;
    let err = uc
        .execute(input("hello").with_conversation(id))
        .await
        .unwrap_err();
    assert!(matches!(err, RunQueryError::OracleUnavailable(OracleError::Timeout)));
    assert!(err.user_message().contains("too long"));

    let history = uc.conversation_history(id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
}

#[tokio::test]
async fn test_oracle_unavailable_preserves_committed_turns() {
    let oracle = ScriptedOracle::from_results([
        Ok(OracleDecision::call(call("web_search").with_arg("query", "x"))),
        Err(OracleError::Unavailable("503".to_string())),
    ]);
    let (uc, _, _, memory) = use_case(oracle, OrchestratorConfig::default());

    let id = memory.create().await;
    let err = uc.execute(input("q").with_conversation(id)).await.unwrap_err();
    assert!(matches!(err, RunQueryError::OracleUnavailable(OracleError::Unavailable(_))));

    let history = uc.conversation_history(id).await.unwrap();
    let roles: Vec<Role> = history.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Tool]);
}

#[tokio::test]
async fn test_empty_tool_call_list_rejected() {
    let oracle = ScriptedOracle::new([OracleDecision::ToolCalls(vec![])]);
    let (uc, _, _, _) = use_case(oracle, OrchestratorConfig::default());
    let err = uc.execute(input("q")).await.unwrap_err();
    assert!(matches!(
        err,
        RunQueryError::OracleUnavailable(OracleError::InvalidResponse(_))
    ));
}

// ==================== Concurrency ====================

#[tokio::test]
async fn test_parallel_results_keep_request_order() {
    let oracle = ScriptedOracle::new([
        OracleDecision::ToolCalls(vec![
            call("slow_search").with_arg("delay_ms", 120),
            call("slow_search").with_arg("delay_ms", 0),
            call("web_search").with_arg("query", "x").with_arg("max_results", 2),
            call("slow_search").with_arg("delay_ms", 60),
        ]),
        OracleDecision::answer("done"),
    ]);
    let (uc, _, executor, _) = use_case(oracle, OrchestratorConfig::default());

    let output = uc.execute(input("many")).await.unwrap();
    let ids: Vec<&str> = output.tool_results.iter().map(|r| r.call_id().as_str()).collect();
    assert_eq!(ids, vec!["call_1_0", "call_1_1", "call_1_2", "call_1_3"]);
    assert_eq!(output.tool_results[0].payload(), Some(&json!({"delay_ms": 120})));
    assert_eq!(output.tool_results[3].payload(), Some(&json!({"delay_ms": 60})));
    assert!(executor.max_active.load(Ordering::SeqCst) >= 2);
    assert_eq!(output.tools_used, vec!["slow_search", "web_search"]);
}

#[tokio::test]
async fn test_mutating_calls_run_sequentially_in_order() {
    let oracle = ScriptedOracle::new([
        OracleDecision::ToolCalls(vec![
            call("code_execute").with_arg("code", "a = 1").with_arg("delay_ms", 40),
            call("slow_search").with_arg("delay_ms", 10),
            call("code_execute").with_arg("code", "b = 2").with_arg("delay_ms", 0),
        ]),
        OracleDecision::answer("done"),
    ]);
    let (uc, _, executor, _) = use_case(oracle, OrchestratorConfig::default());

    let output = uc.execute(input("run")).await.unwrap();
    assert_eq!(executor.max_active_mutating.load(Ordering::SeqCst), 1);

    let order = executor.order.lock().unwrap().clone();
    assert_eq!(order, vec!["call_1_1", "call_1_0", "call_1_2"]);

    let ids: Vec<&str> = output.tool_results.iter().map(|r| r.call_id().as_str()).collect();
    assert_eq!(ids, vec!["call_1_0", "call_1_1", "call_1_2"]);
}

#[tokio::test]
async fn test_queries_on_same_conversation_are_serialized() {
    let oracle = ScriptedOracle::new([
        OracleDecision::answer("first"),
        OracleDecision::answer("second"),
    ])
    .with_delay(Duration::from_millis(30));
    let (uc, oracle, _, memory) = use_case(oracle, OrchestratorConfig::default());

    let id = memory.create().await;
    let a = uc.execute(input("one").with_conversation(id));
    let b = uc.execute(input("two").with_conversation(id));
    let (ra, rb) = tokio::join!(a, b);
    ra.unwrap();
    rb.unwrap();

    let history = uc.conversation_history(id).await.unwrap();
    let roles: Vec<Role> = history.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);

    let seen = oracle.seen_histories();
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[1].len(), 3);
}

#[tokio::test]
async fn test_query_queued_behind_delete_recreates_conversation() {
    let oracle = ScriptedOracle::new([
        OracleDecision::answer("first"),
        OracleDecision::answer("second"),
    ])
    .with_delay(Duration::from_millis(30));
    let (uc, _, _, memory) = use_case(oracle, OrchestratorConfig::default());

    let id = memory.create().await;
    let (first, deleted, second) = tokio::join!(
        uc.execute(input("one").with_conversation(id)),
        uc.delete_conversation(id),
        uc.execute(input("two").with_conversation(id)),
    );
    first.unwrap();
    deleted.unwrap();
    assert_eq!(second.unwrap().answer, "second");

    let history = uc.conversation_history(id).await.unwrap();
    let roles: Vec<Role> = history.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(history[0].content, "two");
}

#[tokio::test]
async fn test_idle_query_locks_are_pruned() {
    let oracle = ScriptedOracle::new([
        OracleDecision::answer("a"),
        OracleDecision::answer("b"),
        OracleDecision::answer("c"),
    ]);
    let (uc, _, _, _) = use_case(oracle, OrchestratorConfig::default());

    for q in ["one", "two", "three"] {
        uc.execute(input(q)).await.unwrap();
    }
    assert!(uc.query_locks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let oracle = ScriptedOracle::new([OracleDecision::answer("never")]);
    let (uc, oracle, _, memory) = use_case(oracle, OrchestratorConfig::default());
    let uc = uc.with_cancellation(token);

    let id = memory.create().await;
    let err = uc.execute(input("q").with_conversation(id)).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(oracle.calls(), 0);
    assert!(uc.conversation_history(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_while_waiting_for_oracle() {
    let token = CancellationToken::new();
    let oracle = ScriptedOracle::new([OracleDecision::answer("slow")])
        .with_delay(Duration::from_secs(5));
    let (uc, _, _, _) = use_case(oracle, OrchestratorConfig::default());
    let uc = uc.with_cancellation(token.clone());

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    };
    let (result, _) = tokio::join!(uc.execute(input("q")), canceller);
    assert!(result.unwrap_err().is_cancelled());
}

// ==================== Memory ====================

#[tokio::test]
async fn test_history_bounded_across_queries() {
    let decisions = (0..6).flat_map(|i| {
        [
            OracleDecision::call(call("web_search").with_arg("query", format!("q{}", i))),
            OracleDecision::answer(format!("a{}", i)),
        ]
    });
    let oracle = ScriptedOracle::new(decisions);
    let config = OrchestratorConfig::default().with_history_length(4);
    let (uc, _, _, memory) = use_case(oracle, config);

    let id = memory.create().await;
    for i in 0..6 {
        uc.execute(input(&format!("q{}", i)).with_conversation(id))
            .await
            .unwrap();
        let history = uc.conversation_history(id).await.unwrap();
        assert!(history.len() <= 4);
        assert_call_ids_match(&history);
        let seqs: Vec<u64> = history.iter().map(|t| t.sequence_number).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }
}

#[tokio::test]
async fn test_deleted_conversation_unreachable() {
    let oracle = ScriptedOracle::new([OracleDecision::answer("hi")]);
    let (uc, _, _, _) = use_case(oracle, OrchestratorConfig::default());

    let output = uc.execute(input("hello")).await.unwrap();
    let id = output.conversation_id;
    assert_eq!(uc.conversation_history(id).await.unwrap().len(), 2);

    uc.delete_conversation(id).await.unwrap();
    assert_eq!(
        uc.conversation_history(id).await.unwrap_err(),
        MemoryError::NotFound(id)
    );
    assert_eq!(uc.delete_conversation(id).await.unwrap_err(), MemoryError::NotFound(id));
}

#[test]
fn test_best_effort_answer_never_empty() {
    assert!(!best_effort_answer(0, &[]).is_empty());
    let ok = ToolResult::ok(CallId::new("c"), "web_search", json!(["x"]));
    let answer = best_effort_answer(2, &[ok]);
    assert!(answer.contains("- web_search: [\"x\"]"));
}
