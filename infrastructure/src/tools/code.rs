//! `code_execute` tool — Python snippets in an isolated interpreter.
//!
//! The adapter itself is thin:
//!
//! 1. scan the source for imports, dynamic-evaluation calls and attribute
//!    access on denied modules (`os.`, `random._os.`); these form the
//!    declared capability set checked before anything is spawned
//! 2. run `python3 -I -c BOOTSTRAP` under [`SandboxExecutor::run_process`]
//!    with the snippet on stdin
//!
//! The bootstrap replaces `__import__`, `eval` and `exec` in the shared
//! builtins and installs an audit hook, so denied modules reached through
//! allowed ones, `open()`, process spawning and sockets are refused at
//! runtime. A refusal prints `SANDBOX_DENIED:<symbol>` and exits with
//! [`DENIED_EXIT_CODE`]; a `MemoryError` exits with [`MEMORY_EXIT_CODE`].

use std::sync::LazyLock;
use std::time::Duration;

use agentic_domain::{
    ParamType, SandboxPolicy, ToolCall, ToolError, ToolKind, ToolParameter, ToolSpec, names,
};
use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

use super::settings::CodeSettings;
use crate::sandbox::{DENIED_EXIT_CODE, MEMORY_EXIT_CODE, ProcessRequest, SandboxExecutor};

const DEFAULT_TIMEOUT_SECS: i64 = 10;
const MAX_TIMEOUT_SECS: i64 = 60;

static IMPORT_STMT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*import\s+([^#\n]+)").expect("import pattern is valid")
});
static FROM_IMPORT_STMT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*from\s+([\w.]+)\s+import\b").expect("from-import pattern is valid")
});
static DYNAMIC_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(eval|exec|__import__)\s*\(").expect("dynamic call pattern is valid")
});
static ATTRIBUTE_BASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*)\s*\.").expect("attribute pattern is valid")
});

/// Python prelude run with `-I -c`.
///
/// argv: `[allowed_json, denied_json, args_json]`; the snippet arrives on
/// stdin and is compiled as `<code>`.
///
/// Checks apply to calls made from the snippet's own frames. Imports made
/// while an allowed module initialises are trusted, except that process and
/// socket audit events are refused at any depth outside such an import.
const BOOTSTRAP: &str = r#"import builtins, json, os, sys, traceback

_exit = os._exit
_getframe = sys._getframe
_allowed = frozenset(json.loads(sys.argv[1]))
_denied = frozenset(json.loads(sys.argv[2]))
_args = json.loads(sys.argv[3])
_source = sys.stdin.read()
_real_import = builtins.__import__
_real_exec = builtins.exec
_real_eval = builtins.eval
_USER = "<code>"
_PROCESS_EVENTS = ("os.system", "os.exec", "os.posix_spawn", "os.spawn", "os.fork",
                   "os.forkpty", "os.kill", "os.killpg", "subprocess.Popen", "pty.spawn")
_importing = [0]


def _permits(name):
    root = name.split(".")[0]
    if name in _denied or root in _denied:
        return False
    return name in _allowed or root in _allowed


def _deny(symbol):
    sys.stdout.flush()
    sys.stderr.write("SANDBOX_DENIED:%s\n" % symbol)
    sys.stderr.flush()
    _exit(__DENIED_EXIT__)


def _from_user(depth):
    frame = _getframe(depth + 1)
    while frame is not None:
        name = frame.f_code.co_filename
        if name == _USER:
            return True
        if not (name.startswith("<frozen importlib.") or name == "<string>"):
            return False
        frame = frame.f_back
    return False


def _guarded_import(name, globals=None, locals=None, fromlist=(), level=0):
    if level == 0 and _importing[0] == 0 and _from_user(1):
        if not _permits(name):
            _deny(name)
        _importing[0] += 1
        try:
            return _real_import(name, globals, locals, fromlist, level)
        finally:
            _importing[0] -= 1
    return _real_import(name, globals, locals, fromlist, level)


def _guarded(symbol, real):
    def call(*args, **kwargs):
        if _importing[0] == 0 and _from_user(1) and not _permits(symbol):
            _deny(symbol)
        return real(*args, **kwargs)
    return call


def _audit(event, args):
    if event.startswith("sys._getframe") or event == "object.__getattr__":
        return
    if event.startswith(_PROCESS_EVENTS) or event.startswith("socket."):
        symbol = event.split(".")[0]
        if not _permits(symbol) and (_importing[0] == 0 or _from_user(1)):
            _deny(symbol)
    elif _importing[0]:
        return
    elif event == "import":
        if _from_user(1) and not _permits(args[0]):
            _deny(args[0])
    elif event == "open" or event.startswith(("os.", "shutil.")):
        symbol = "open" if event == "open" else event.split(".")[0]
        if _from_user(1) and not _permits(symbol):
            _deny(symbol)


builtins.__import__ = _guarded_import
builtins.exec = _guarded("exec", _real_exec)
builtins.eval = _guarded("eval", _real_eval)
sys.addaudithook(_audit)

_globals = {"__name__": "__main__", "__builtins__": builtins.__dict__, "ARGS": _args}
try:
    _real_exec(compile(_source, _USER, "exec"), _globals)
except MemoryError:
    sys.stdout.flush()
    sys.stderr.write("MemoryError\n")
    sys.stderr.flush()
    _exit(__MEMORY_EXIT__)
except SystemExit:
    raise
except BaseException:
    traceback.print_exc()
    sys.stdout.flush()
    sys.stderr.flush()
    _exit(1)
"#;

/// Capabilities a snippet declares by its source text: imported modules
/// (dotted names kept as written) followed by any of `eval`, `exec`,
/// `__import__` that are called. Order of first appearance, no duplicates.
pub fn scan_capabilities(code: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |symbol: &str| {
        if !symbol.is_empty() && !symbol.starts_with('.') && !found.iter().any(|s| s == symbol) {
            found.push(symbol.to_string());
        }
    };

    for caps in IMPORT_STMT.captures_iter(code) {
        let Some(list) = caps.get(1) else { continue };
        for item in list.as_str().split([',', ';']) {
            if let Some(module) = item.split_whitespace().next() {
                push(module.trim_matches(|c: char| c == '(' || c == ')' || c == '\\'));
            }
        }
    }
    for caps in FROM_IMPORT_STMT.captures_iter(code) {
        if let Some(module) = caps.get(1) {
            push(module.as_str());
        }
    }
    for caps in DYNAMIC_CALL.captures_iter(code) {
        if let Some(call) = caps.get(1) {
            push(call.as_str());
        }
    }
    found
}

/// Denied module names used as an attribute base, either directly (`os.`)
/// or as a private alias held by another module (`random._os.`).
pub fn scan_denied_attributes<'a>(
    code: &str,
    denied: impl IntoIterator<Item = &'a String> + Clone,
) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in ATTRIBUTE_BASE.captures_iter(code) {
        let Some(name) = caps.get(1) else { continue };
        let module = name.as_str().trim_start_matches('_');
        if denied.clone().into_iter().any(|d| d == module) && !found.iter().any(|f| f == module) {
            found.push(module.to_string());
        }
    }
    found
}

pub struct CodeTool {
    interpreter: String,
    policy: SandboxPolicy,
}

impl CodeTool {
    pub fn from_settings(settings: &CodeSettings) -> Self {
        Self {
            interpreter: settings.interpreter.clone(),
            policy: settings.policy.clone(),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            names::CODE_EXECUTE,
            "Execute a Python snippet in an isolated interpreter and return its output. \
             Only allow-listed modules may be imported.",
            ToolKind::CodeExecution,
        )
        .with_parameter(ToolParameter::new(
            "code",
            "Python source to execute",
            ParamType::String,
            true,
        ))
        .with_parameter(
            ToolParameter::new(
                "timeout",
                "Maximum execution time in seconds",
                ParamType::Integer,
                false,
            )
            .with_default(DEFAULT_TIMEOUT_SECS)
            .with_range(Some(1.0), Some(MAX_TIMEOUT_SECS as f64)),
        )
        .with_parameter(ToolParameter::new(
            "arguments",
            "JSON object exposed to the code as ARGS",
            ParamType::Object,
            false,
        ))
    }

    pub async fn execute(&self, call: &ToolCall, sandbox: &SandboxExecutor) -> Result<Value, ToolError> {
        let code = call
            .get_string("code")
            .ok_or_else(|| ToolError::validation(names::CODE_EXECUTE, "code is required"))?;
        let timeout = call
            .get_i64("timeout")
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, MAX_TIMEOUT_SECS) as u64;
        let arguments = call.arguments.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let policy = self.policy.with_timeout_cap(Duration::from_secs(timeout));
        let mut declared = scan_capabilities(code);
        for module in scan_denied_attributes(code, policy.denied()) {
            if !declared.contains(&module) {
                declared.push(module);
            }
        }
        SandboxExecutor::check_declared(&policy, declared.iter().map(String::as_str))?;

        let program = which::which(&self.interpreter).map_err(|e| {
            ToolError::Provider(format!("interpreter '{}' not found: {}", self.interpreter, e))
        })?;
        debug!(program = %program.display(), ?declared, timeout = ?policy.timeout(), "Running code snippet");

        let request = ProcessRequest::new(program)
            .args([
                "-I".to_string(),
                "-c".to_string(),
                bootstrap(),
                to_json(policy.allowed())?,
                to_json(policy.denied())?,
                to_json(&arguments)?,
            ])
            .stdin(code)
            .env("OPENBLAS_NUM_THREADS", "1")
            .env("MPLBACKEND", "Agg")
            .declare(declared);

        let output = sandbox.run_process(&request, &policy).await?;
        Ok(json!({
            "stdout": output.stdout,
            "stderr": output.stderr,
            "exit_code": output.exit_code,
            "truncated": output.truncated,
            "duration_ms": output.duration_ms,
        }))
    }
}

fn bootstrap() -> String {
    BOOTSTRAP
        .replace("__DENIED_EXIT__", &DENIED_EXIT_CODE.to_string())
        .replace("__MEMORY_EXIT__", &MEMORY_EXIT_CODE.to_string())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string(value).map_err(|e| ToolError::Execution(e.to_string()))
}
