//! Sandboxed tool executor — the concrete implementation of [`ToolExecutorPort`].
//!
//! [`SandboxedToolExecutor`] owns the read-only [`ToolRegistry`] and one
//! [`ToolAdapter`] per [`ToolKind`]. Dispatch goes by the spec's kind, never
//! by name, so a spec can only ever reach the adapter that declared it.
//!
//! ```text
//! ToolExecutorPort::execute(spec, call)
//!   └─ adapters[spec.kind].execute(call, sandbox)
//!        ├─ WebSearch / Document / Tabular → SandboxExecutor::run_in_process
//!        └─ Code                           → SandboxExecutor::run_process
//! ```
//!
//! Every outcome, including a panic inside an adapter, is folded into one
//! [`ToolResult`] carrying the call id and the measured duration.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use agentic_application::ToolExecutorPort;
use agentic_domain::{RegistryError, ToolCall, ToolError, ToolKind, ToolRegistry, ToolResult, ToolSpec};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use super::code::CodeTool;
use super::document::DocumentTool;
use super::settings::ToolSettings;
use super::tabular::TabularTool;
use super::web::WebSearchTool;
use crate::sandbox::SandboxExecutor;

#[derive(Error, Debug)]
pub enum ToolSetupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to initialise tool: {0}")]
    Adapter(#[from] ToolError),
}

/// The closed set of capabilities a spec can be backed by.
pub enum ToolAdapter {
    WebSearch(WebSearchTool),
    Document(DocumentTool),
    Tabular(TabularTool),
    Code(CodeTool),
}

impl ToolAdapter {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolAdapter::WebSearch(_) => ToolKind::WebSearch,
            ToolAdapter::Document(_) => ToolKind::DocumentExtraction,
            ToolAdapter::Tabular(_) => ToolKind::TabularAnalysis,
            ToolAdapter::Code(_) => ToolKind::CodeExecution,
        }
    }

    pub fn spec(&self) -> ToolSpec {
        match self {
            ToolAdapter::WebSearch(tool) => tool.spec(),
            ToolAdapter::Document(tool) => tool.spec(),
            ToolAdapter::Tabular(tool) => tool.spec(),
            ToolAdapter::Code(tool) => tool.spec(),
        }
    }

    pub async fn execute(&self, call: &ToolCall, sandbox: &SandboxExecutor) -> Result<Value, ToolError> {
        match self {
            ToolAdapter::WebSearch(tool) => tool.execute(call, sandbox).await,
            ToolAdapter::Document(tool) => tool.execute(call, sandbox).await,
            ToolAdapter::Tabular(tool) => tool.execute(call, sandbox).await,
            ToolAdapter::Code(tool) => tool.execute(call, sandbox).await,
        }
    }
}

/// Built-in adapters in registration order: web_search, pdf_parser,
/// data_analysis, code_execute.
pub fn builtin_adapters(settings: &ToolSettings) -> Result<Vec<ToolAdapter>, ToolError> {
    Ok(vec![
        ToolAdapter::WebSearch(WebSearchTool::from_settings(
            &settings.web_search,
            settings.policy_for(ToolKind::WebSearch),
        )?),
        ToolAdapter::Document(DocumentTool::from_settings(
            &settings.document,
            settings.policy_for(ToolKind::DocumentExtraction),
        )?),
        ToolAdapter::Tabular(TabularTool::from_settings(
            &settings.tabular,
            settings.policy_for(ToolKind::TabularAnalysis),
        )),
        ToolAdapter::Code(CodeTool::from_settings(&settings.code)),
    ])
}

/// Executor that runs every call through the sandbox.
pub struct SandboxedToolExecutor {
    registry: ToolRegistry,
    adapters: HashMap<ToolKind, ToolAdapter>,
    sandbox: SandboxExecutor,
}

impl SandboxedToolExecutor {
    /// Register each adapter's spec in the given order.
    pub fn new(adapters: Vec<ToolAdapter>) -> Result<Self, ToolSetupError> {
        let mut registry = ToolRegistry::new();
        let mut by_kind = HashMap::new();
        for adapter in adapters {
            registry.register(adapter.spec())?;
            by_kind.insert(adapter.kind(), adapter);
        }
        Ok(Self {
            registry,
            adapters: by_kind,
            sandbox: SandboxExecutor::new(),
        })
    }

    /// Executor with the four built-in tools.
    pub fn builtin(settings: &ToolSettings) -> Result<Self, ToolSetupError> {
        Self::new(builtin_adapters(settings)?)
    }

    pub fn sandbox(&self) -> &SandboxExecutor {
        &self.sandbox
    }

    async fn dispatch(&self, spec: &ToolSpec, call: &ToolCall) -> Result<Value, ToolError> {
        let adapter = self
            .adapters
            .get(&spec.kind)
            .ok_or_else(|| ToolError::UnknownTool(spec.name.clone()))?;

        match AssertUnwindSafe(adapter.execute(call, &self.sandbox))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(tool = %spec.name, call_id = %call.call_id, "Tool adapter panicked");
                Err(ToolError::Execution("tool adapter panicked".to_string()))
            }
        }
    }
}

#[async_trait]
impl ToolExecutorPort for SandboxedToolExecutor {
    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn execute(&self, spec: &ToolSpec, call: &ToolCall) -> ToolResult {
        let start = Instant::now();
        let outcome = self.dispatch(spec, call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = ToolResult::from_outcome(call.call_id.clone(), &spec.name, outcome)
            .with_duration(duration_ms);
        debug!(
            tool = %spec.name,
            call_id = %call.call_id,
            status = %result.status(),
            duration_ms,
            "Tool call finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::web::{SearchBackend, SearchHit};
    use agentic_domain::{CallId, SideEffect, ToolStatus, names};
    use std::sync::Arc;

    struct PanickingBackend;

    #[async_trait]
    impl SearchBackend for PanickingBackend {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
            panic!("backend bug");
        }
    }

    fn executor() -> SandboxedToolExecutor {
        SandboxedToolExecutor::builtin(&ToolSettings::default()).unwrap()
    }

    #[test]
    fn test_builtin_registry_order() {
        let executor = executor();
        let registered: Vec<&str> = executor.registry().names().collect();
        assert_eq!(
            registered,
            vec![names::WEB_SEARCH, names::PDF_PARSER, names::DATA_ANALYSIS, names::CODE_EXECUTE]
        );
        let code = executor.registry().resolve(names::CODE_EXECUTE).unwrap();
        assert_eq!(code.side_effect, SideEffect::Mutating);
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let settings = ToolSettings::default();
        let code = || ToolAdapter::Code(CodeTool::from_settings(&settings.code));
        let err = SandboxedToolExecutor::new(vec![code(), code()]).err().unwrap();
        assert!(matches!(err, ToolSetupError::Registry(RegistryError::DuplicateTool(_))));
    }

    #[tokio::test]
    async fn test_denied_code_becomes_denied_result() {
        let executor = executor();
        let spec = executor.registry().resolve(names::CODE_EXECUTE).unwrap().clone();
        let call = ToolCall::new(CallId::new("call_0_0"), names::CODE_EXECUTE)
            .with_arg("code", "import subprocess");

        let result = executor.execute(&spec, &call).await;
        assert_eq!(result.call_id(), &CallId::new("call_0_0"));
        assert_eq!(result.status(), ToolStatus::Denied);
        assert_eq!(result.metadata().error_code.as_deref(), Some("PERMISSION_DENIED"));
        assert!(result.metadata().duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_panic_is_folded_into_result() {
        let settings = ToolSettings::default();
        let tool = WebSearchTool::new(
            Arc::new(PanickingBackend),
            &settings.web_search,
            settings.policy_for(ToolKind::WebSearch),
        );
        let executor = SandboxedToolExecutor::new(vec![ToolAdapter::WebSearch(tool)]).unwrap();
        let spec = executor.registry().resolve(names::WEB_SEARCH).unwrap().clone();
        let call = ToolCall::new(CallId::new("call_0_0"), names::WEB_SEARCH).with_arg("query", "rust");

        let result = executor.execute(&spec, &call).await;
        assert_eq!(result.status(), ToolStatus::Error);
        assert!(result.error_detail().unwrap().contains("panicked"));
    }

    // ==================== Orchestrated over the real executor ====================

    use crate::memory::InMemoryConversationMemory;
    use crate::tools::settings::DocumentSettings;
    use agentic_application::{OrchestratorConfig, RunQueryInput, RunQueryUseCase, ScriptedOracle};
    use agentic_domain::{OracleDecision, OrchestratorState, Query, RequestedCall, Role};

    fn orchestrate(
        decisions: Vec<OracleDecision>,
        settings: &ToolSettings,
    ) -> RunQueryUseCase<ScriptedOracle, SandboxedToolExecutor, InMemoryConversationMemory> {
        let config = OrchestratorConfig::default();
        RunQueryUseCase::new(
            Arc::new(ScriptedOracle::new(decisions)),
            Arc::new(SandboxedToolExecutor::builtin(settings).unwrap()),
            Arc::new(InMemoryConversationMemory::new(config.history_length)),
            config,
        )
    }

    fn ask(text: &str) -> RunQueryInput {
        RunQueryInput::new(Query::try_new(text).unwrap())
    }

    #[tokio::test]
    async fn test_orchestrated_denied_import_then_answer() {
        let uc = orchestrate(
            vec![
                OracleDecision::call(
                    RequestedCall::new(names::CODE_EXECUTE).with_arg("code", "import os\nprint(os.listdir('/'))"),
                ),
                OracleDecision::answer("Listing files is not permitted here."),
            ],
            &ToolSettings::default(),
        );

        let output = uc.execute(ask("list the root directory")).await.unwrap();
        assert_eq!(output.answer, "Listing files is not permitted here.");
        assert_eq!(output.final_state, OrchestratorState::Done);
        assert_eq!(output.tool_results.len(), 1);
        assert_eq!(output.tool_results[0].status(), ToolStatus::Denied);
        assert_eq!(output.tool_results[0].error_detail(), Some("capability denied: os"));

        let history = uc.conversation_history(output.conversation_id).await.unwrap();
        let roles: Vec<Role> = history.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_orchestrated_runtime_denial_then_answer() {
        if which::which("python3").is_err() {
            return;
        }
        let uc = orchestrate(
            vec![
                OracleDecision::call(RequestedCall::new(names::CODE_EXECUTE).with_arg(
                    "code",
                    "import json\nprint(json.__builtins__['__import__']('os').getpid())",
                )),
                OracleDecision::answer("done"),
            ],
            &ToolSettings::default(),
        );

        let output = uc.execute(ask("pid please")).await.unwrap();
        assert_eq!(output.tool_results[0].status(), ToolStatus::Denied);
        assert_eq!(output.answer, "done");
    }

    #[tokio::test]
    async fn test_orchestrated_document_bounded_to_max_pages() {
        let dir = tempfile::tempdir().unwrap();
        let text: Vec<String> = (1..=100).map(|i| format!("page {} body", i)).collect();
        std::fs::write(dir.path().join("report.txt"), text.join("\x0c")).unwrap();

        let settings = ToolSettings {
            document: DocumentSettings {
                max_pages: 50,
                root: Some(dir.path().to_path_buf()),
            },
            ..ToolSettings::default()
        };
        let uc = orchestrate(
            vec![
                OracleDecision::call(RequestedCall::new(names::PDF_PARSER).with_arg("file_path", "report.txt")),
                OracleDecision::answer("The report has 100 pages."),
            ],
            &settings,
        );

        let output = uc.execute(ask("summarise report.txt")).await.unwrap();
        assert_eq!(output.tools_used, vec![names::PDF_PARSER]);
        let result = &output.tool_results[0];
        assert_eq!(result.status(), ToolStatus::Ok);
        let payload = result.payload().unwrap();
        let pages = payload["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 50);
        assert_eq!(pages[0]["page_number"], 1);
        assert_eq!(pages[49]["page_number"], 50);
        assert_eq!(payload["truncated"], true);
        assert_eq!(output.final_state, OrchestratorState::Done);
    }

    #[tokio::test]
    async fn test_missing_adapter_is_unknown_tool() {
        let executor = SandboxedToolExecutor::new(Vec::new()).unwrap();
        let spec = ToolSpec::new(names::PDF_PARSER, "docs", ToolKind::DocumentExtraction);
        let call = ToolCall::new(CallId::new("c"), names::PDF_PARSER);

        let result = executor.execute(&spec, &call).await;
        assert_eq!(result.metadata().error_code.as_deref(), Some("UNKNOWN_TOOL"));
    }
}
