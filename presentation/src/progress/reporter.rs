//! Progress reporting for query orchestration

use agentic_application::ProgressNotifier;
use agentic_application::use_cases::tool_helpers::tool_args_preview;
use agentic_domain::{ToolCall, ToolResult, ToolStatus};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Spinner on stderr showing the current planning step and running tools
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut guard) = self.spinner.lock() else {
            return;
        };
        let spinner = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        f(spinner);
    }

    fn finish(&self) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(pb) = guard.take()
        {
            pb.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_planning(&self, step: usize) {
        self.with_spinner(|pb| {
            pb.set_prefix(format!("Step {step}"));
            pb.set_message("thinking...");
        });
    }

    fn on_tool_start(&self, call: &ToolCall) {
        self.with_spinner(|pb| {
            pb.set_message(format!("{} {}", call.tool_name, tool_args_preview(call)));
        });
    }

    fn on_tool_complete(&self, result: &ToolResult) {
        let line = SimpleProgress::result_line(result);
        self.with_spinner(|pb| pb.println(line));
    }

    fn on_step_limit(&self, max_steps: usize) {
        self.with_spinner(|pb| {
            pb.println(format!(
                "  {} step limit ({}) reached, summarising",
                "!".yellow(),
                max_steps
            ));
        });
    }

    fn on_answer(&self, _answer: &str) {
        self.finish();
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Plain line-per-event progress on stderr (no spinner)
pub struct SimpleProgress;

impl SimpleProgress {
    fn result_line(result: &ToolResult) -> String {
        let marker = match result.status() {
            ToolStatus::Ok => "v".green(),
            ToolStatus::Timeout => "t".yellow(),
            ToolStatus::Error | ToolStatus::Denied => "x".red(),
        };
        let code = result
            .metadata()
            .error_code
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        format!("  {} {}{}", marker, result.tool_name(), code)
    }
}

impl ProgressNotifier for SimpleProgress {
    fn on_planning(&self, step: usize) {
        eprintln!("{} step {step}", "->".cyan());
    }

    fn on_tool_start(&self, call: &ToolCall) {
        eprintln!("  {} {} {}", "*".cyan(), call.tool_name, tool_args_preview(call));
    }

    fn on_tool_complete(&self, result: &ToolResult) {
        eprintln!("{}", Self::result_line(result));
    }

    fn on_step_limit(&self, max_steps: usize) {
        eprintln!("  {} step limit ({max_steps}) reached", "!".yellow());
    }
}
