//! Sandbox executor
//!
//! Every tool run goes through [`SandboxExecutor`], which enforces a
//! [`SandboxPolicy`] independently of the tool's cooperation:
//!
//! | Path | Used for | Isolation |
//! |------|----------|-----------|
//! | [`run_process`](SandboxExecutor::run_process) | user-influenced code | child process, own group, rlimits |
//! | [`run_in_process`](SandboxExecutor::run_in_process) | network / file adapters | async task under the same gate |
//!
//! Declared capabilities are checked before anything starts; the process
//! path also honours runtime denials reported by the child.

mod accounting;
mod error;
mod process;

pub use accounting::ExecutionAccounting;
pub use error::SandboxError;
pub use process::{
    DENIED_EXIT_CODE, DENIED_MARKER, MEMORY_EXIT_CODE, ProcessOutput, ProcessRequest,
};

use std::future::Future;

use agentic_domain::{SandboxPolicy, ToolError};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SandboxExecutor {
    accounting: ExecutionAccounting,
}

impl SandboxExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes spawned by this executor that are still alive.
    pub fn accounting(&self) -> &ExecutionAccounting {
        &self.accounting
    }

    /// Fail with [`SandboxError::Denied`] on the first declared symbol the
    /// policy does not permit.
    pub fn check_declared<'a, I>(policy: &SandboxPolicy, declared: I) -> Result<(), SandboxError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match policy.first_violation(declared) {
            Some(symbol) => {
                debug!(symbol, "Declared capability denied by policy");
                Err(SandboxError::Denied(symbol.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Run a program as an isolated child process.
    pub async fn run_process(
        &self,
        request: &ProcessRequest,
        policy: &SandboxPolicy,
    ) -> Result<ProcessOutput, SandboxError> {
        Self::check_declared(policy, request.declared.iter().map(String::as_str))?;
        process::run(request, policy, &self.accounting).await
    }

    /// Run an async capability in-process under the policy's timeout,
    /// capability gate and payload-size ceiling.
    pub async fn run_in_process<F>(
        &self,
        declared: &[&str],
        policy: &SandboxPolicy,
        task: F,
    ) -> Result<Value, ToolError>
    where
        F: Future<Output = Result<Value, ToolError>>,
    {
        Self::check_declared(policy, declared.iter().copied())?;

        let payload = tokio::time::timeout(policy.timeout(), task)
            .await
            .map_err(|_| ToolError::Timeout {
                after_ms: policy.timeout().as_millis() as u64,
            })??;

        let size = serde_json::to_vec(&payload)
            .map(|bytes| bytes.len() as u64)
            .unwrap_or_default();
        if policy.max_memory_mb() > 0 && size > policy.max_memory_bytes() {
            return Err(ToolError::MemoryLimit {
                limit_mb: policy.max_memory_mb(),
            });
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn network_policy() -> SandboxPolicy {
        SandboxPolicy::new(Duration::from_millis(100), 1).with_allowed(["network"])
    }

    #[tokio::test]
    async fn test_in_process_ok() {
        let sandbox = SandboxExecutor::new();
        let value = sandbox
            .run_in_process(&["network"], &network_policy(), async { Ok(json!({"a": 1})) })
            .await
            .unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_in_process_denied_before_running() {
        let sandbox = SandboxExecutor::new();
        let ran = std::sync::atomic::AtomicBool::new(false);
        let err = sandbox
            .run_in_process(&["filesystem.read"], &network_policy(), async {
                ran.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(Value::Null)
            })
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::CapabilityDenied("filesystem.read".to_string()));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_in_process_timeout() {
        let sandbox = SandboxExecutor::new();
        let err = sandbox
            .run_in_process(&["network"], &network_policy(), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Value::Null)
            })
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Timeout { after_ms: 100 });
    }

    #[tokio::test]
    async fn test_in_process_payload_ceiling() {
        let sandbox = SandboxExecutor::new();
        let big = "x".repeat(2 * 1024 * 1024);
        let err = sandbox
            .run_in_process(&["network"], &network_policy(), async move { Ok(json!(big)) })
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::MemoryLimit { limit_mb: 1 });
    }

    #[tokio::test]
    async fn test_in_process_propagates_tool_error() {
        let sandbox = SandboxExecutor::new();
        let err = sandbox
            .run_in_process(&["network"], &network_policy(), async {
                Err(ToolError::Provider("503".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Provider("503".into()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_declared_denial_skips_spawn() {
        let sandbox = SandboxExecutor::new();
        let policy = SandboxPolicy::new(Duration::from_secs(1), 64)
            .with_allowed(["math", "os"])
            .with_denied(["os"]);
        let request = ProcessRequest::new("/nonexistent/program").declare(["math", "os.path"]);
        let err = sandbox.run_process(&request, &policy).await.unwrap_err();
        assert!(matches!(err, SandboxError::Denied(ref s) if s == "os.path"));
        assert_eq!(sandbox.accounting().live_count(), 0);
    }

    /// Denied ⇔ (not allowed) ∨ denied, over every combination of set
    /// membership for a symbol.
    #[test]
    fn test_declared_check_exhaustive() {
        let symbols = ["math", "os", "socket"];
        for mask in 0u32..(1 << (symbols.len() * 2)) {
            let allowed: Vec<&str> = symbols
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| *s)
                .collect();
            let denied: Vec<&str> = symbols
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << (i + symbols.len())) != 0)
                .map(|(_, s)| *s)
                .collect();
            let policy = SandboxPolicy::new(Duration::from_secs(1), 1)
                .with_allowed(allowed.iter().copied())
                .with_denied(denied.iter().copied());

            for symbol in symbols {
                let expect_denied = !allowed.contains(&symbol) || denied.contains(&symbol);
                let result = SandboxExecutor::check_declared(&policy, [symbol]);
                assert_eq!(result.is_err(), expect_denied, "symbol {symbol}, mask {mask:b}");
            }
        }
    }
}
