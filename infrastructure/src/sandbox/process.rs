//! Child-process execution under a [`SandboxPolicy`].
//!
//! The child runs in its own process group with an address-space rlimit and
//! a parent-death signal (Linux). The supervisor races three futures:
//!
//! ```text
//! select! {
//!   child exits          → ProcessOutput (or a denial/memory report)
//!   policy timeout fires → killpg(SIGKILL) + reap → Timeout
//!   VmHWM over ceiling   → killpg(SIGKILL) + reap → MemoryLimit
//! }
//! ```
//!
//! # Child protocol
//!
//! A child that blocks a capability at runtime writes
//! `SANDBOX_DENIED:<symbol>` to stderr and exits with [`DENIED_EXIT_CODE`].
//! A child that catches its own allocation failure exits with
//! [`MEMORY_EXIT_CODE`].

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use agentic_domain::SandboxPolicy;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::accounting::ExecutionAccounting;
use super::error::SandboxError;

pub const DENIED_EXIT_CODE: i32 = 86;
pub const MEMORY_EXIT_CODE: i32 = 87;
pub const DENIED_MARKER: &str = "SANDBOX_DENIED:";

/// Per-stream capture limit (1 MB)
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

const MEMORY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A program to run inside the sandbox.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    /// Capabilities the caller knows the program will use
    pub declared: Vec<String>,
}

impl ProcessRequest {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn declare<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared.extend(symbols.into_iter().map(Into::into));
        self
    }
}

/// Captured result of a child that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the child was terminated by a signal
    pub exit_code: i32,
    /// True if either stream hit the capture limit
    pub truncated: bool,
    pub duration_ms: u64,
}

enum Outcome {
    Exited(std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)>),
    TimedOut,
    MemoryExceeded,
}

pub(super) async fn run(
    request: &ProcessRequest,
    policy: &SandboxPolicy,
    accounting: &ExecutionAccounting,
) -> Result<ProcessOutput, SandboxError> {
    let start = Instant::now();

    let mut cmd = Command::new(&request.program);
    cmd.args(&request.args)
        .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(if request.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &request.current_dir {
        cmd.current_dir(dir);
    }
    isolate(&mut cmd, policy.max_memory_bytes());

    let mut child = cmd.spawn().map_err(|source| SandboxError::Spawn {
        program: request.program.display().to_string(),
        source,
    })?;
    let pid = child.id().unwrap_or_default();
    let _live = accounting.track(pid);
    debug!(pid, program = %request.program.display(), "Spawned sandboxed process");

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let input = request.stdin.as_deref();

    let outcome = {
        let io = async {
            let write = async {
                if let (Some(mut pipe), Some(input)) = (stdin, input) {
                    // The child may exit without reading everything
                    let _ = pipe.write_all(input.as_bytes()).await;
                }
            };
            let (_, out, err) = tokio::join!(write, read_capped(stdout), read_capped(stderr));
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out?, err?))
        };

        tokio::select! {
            result = io => Outcome::Exited(result),
            _ = tokio::time::sleep(policy.timeout()) => Outcome::TimedOut,
            _ = watch_memory(pid, policy.max_memory_bytes()) => Outcome::MemoryExceeded,
        }
    };

    match outcome {
        Outcome::TimedOut => {
            terminate(&mut child, pid).await;
            warn!(pid, timeout = ?policy.timeout(), "Sandboxed process timed out");
            Err(SandboxError::Timeout {
                after_ms: policy.timeout().as_millis() as u64,
            })
        }
        Outcome::MemoryExceeded => {
            terminate(&mut child, pid).await;
            warn!(pid, limit_mb = policy.max_memory_mb(), "Sandboxed process exceeded memory ceiling");
            Err(SandboxError::MemoryLimit {
                limit_mb: policy.max_memory_mb(),
            })
        }
        Outcome::Exited(Err(e)) => {
            terminate(&mut child, pid).await;
            Err(SandboxError::Io(e))
        }
        Outcome::Exited(Ok((status, stdout, stderr))) => {
            // Background descendants must not outlive the leader
            kill_group(pid);
            let exit_code = status.code().unwrap_or(-1);
            let (stdout, stdout_truncated) = decode(stdout);
            let (stderr, stderr_truncated) = decode(stderr);

            if exit_code == DENIED_EXIT_CODE
                && let Some(symbol) = denied_symbol(&stderr)
            {
                warn!(pid, symbol = %symbol, "Sandboxed process attempted a denied capability");
                return Err(SandboxError::Denied(symbol));
            }
            if exit_code == MEMORY_EXIT_CODE {
                return Err(SandboxError::MemoryLimit {
                    limit_mb: policy.max_memory_mb(),
                });
            }

            debug!(pid, exit_code, "Sandboxed process exited");
            Ok(ProcessOutput {
                stdout,
                stderr,
                exit_code,
                truncated: stdout_truncated || stderr_truncated,
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

/// Own process group, parent-death signal and `RLIMIT_AS`.
fn isolate(cmd: &mut Command, max_memory_bytes: u64) {
    #[cfg(unix)]
    cmd.process_group(0);

    #[cfg(target_os = "linux")]
    unsafe {
        cmd.pre_exec(move || {
            libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
            if max_memory_bytes > 0 {
                let limit = libc::rlimit {
                    rlim_cur: max_memory_bytes as libc::rlim_t,
                    rlim_max: max_memory_bytes as libc::rlim_t,
                };
                if libc::setrlimit(libc::RLIMIT_AS, &limit) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
            }
            Ok(())
        });
    }

    #[cfg(not(target_os = "linux"))]
    let _ = max_memory_bytes;
}

/// Kill the whole group, then kill and reap the leader.
async fn terminate(child: &mut Child, pid: u32) {
    kill_group(pid);
    if let Err(e) = child.kill().await {
        debug!(pid, error = %e, "Child already gone");
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    if pid == 0 {
        return;
    }
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// Keeps at most one byte past the capture limit, so [`decode`] can flag
/// truncation, and discards the rest while the child keeps writing.
async fn read_capped<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        (&mut pipe)
            .take(MAX_OUTPUT_BYTES as u64 + 1)
            .read_to_end(&mut buf)
            .await?;
        tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
    }
    Ok(buf)
}

fn decode(mut bytes: Vec<u8>) -> (String, bool) {
    let truncated = bytes.len() > MAX_OUTPUT_BYTES;
    if truncated {
        bytes.truncate(MAX_OUTPUT_BYTES);
    }
    (String::from_utf8_lossy(&bytes).into_owned(), truncated)
}

fn denied_symbol(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .find_map(|line| line.trim().strip_prefix(DENIED_MARKER))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn watch_memory(pid: u32, limit_bytes: u64) {
    if limit_bytes == 0 || pid == 0 {
        return std::future::pending().await;
    }
    let mut ticker = tokio::time::interval(MEMORY_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if peak_rss_bytes(pid).is_some_and(|peak| peak > limit_bytes) {
            return;
        }
    }
}

/// Peak resident set size (`VmHWM`) of a live process.
#[cfg(target_os = "linux")]
pub(crate) fn peak_rss_bytes(pid: u32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmHWM:"))
        .and_then(|v| v.trim().trim_end_matches("kB").trim().parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn peak_rss_bytes(_pid: u32) -> Option<u64> {
    None
}
