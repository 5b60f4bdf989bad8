//! Console output formatter for query outcomes

use agentic_application::{RunQueryError, RunQueryOutput};
use agentic_domain::{OutputFormat, ToolResult, ToolStatus, Turn};
use colored::Colorize;

const OBSERVATION_PREVIEW: usize = 400;

/// Formats query outcomes for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn format(output: &RunQueryOutput, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => Self::format_text(output),
            OutputFormat::Full => Self::format_full(output),
            OutputFormat::Json => Self::format_json(output),
        }
    }

    /// Only the answer, plus a note when the step budget ran out
    pub fn format_text(output: &RunQueryOutput) -> String {
        let mut text = output.answer.clone();
        if output.step_limit_reached {
            text.push_str(&format!(
                "\n\n{}",
                format!("(stopped after {} tool steps)", output.steps).dimmed()
            ));
        }
        text
    }

    pub fn format_full(output: &RunQueryOutput) -> String {
        let mut text = String::new();

        text.push_str(&Self::header("Query"));
        text.push_str(&format!("{} {}\n", "Q:".bold(), output.query));
        text.push_str(&format!(
            "{} {}\n",
            "Conversation:".dimmed(),
            output.conversation_id
        ));

        if !output.tool_results.is_empty() {
            text.push_str(&Self::section_header(&format!(
                "Tool results ({} steps)",
                output.steps
            )));
            for result in &output.tool_results {
                text.push_str(&Self::format_tool_result(result));
                text.push('\n');
            }
        }

        text.push_str(&Self::section_header("Answer"));
        text.push_str(&output.answer);
        text.push('\n');

        if output.step_limit_reached {
            text.push_str(&format!(
                "\n{}\n",
                "Step limit reached; the answer summarises partial results.".yellow()
            ));
        }

        text.push_str(&Self::footer());
        text
    }

    pub fn format_json(output: &RunQueryOutput) -> String {
        serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per tool call: status marker, name, call id, observation
    pub fn format_tool_result(result: &ToolResult) -> String {
        let marker = match result.status() {
            ToolStatus::Ok => "v".green(),
            ToolStatus::Error => "x".red(),
            ToolStatus::Timeout => "t".yellow(),
            ToolStatus::Denied => "!".red(),
        };
        let duration = result
            .metadata()
            .duration_ms
            .map(|ms| format!(" {ms}ms"))
            .unwrap_or_default();
        format!(
            "  {} {} {}{}\n{}",
            marker,
            result.tool_name().bold(),
            format!("[{}]", result.call_id()).dimmed(),
            duration.dimmed(),
            Self::indent(&Self::preview(&result.observation()), "    ")
        )
    }

    /// A conversation's visible turns, oldest first
    pub fn format_history(turns: &[Turn]) -> String {
        if turns.is_empty() {
            return "(empty conversation)".dimmed().to_string();
        }
        turns
            .iter()
            .map(|turn| {
                let body = if turn.tool_results.is_empty() {
                    turn.content.clone()
                } else {
                    turn.tool_results
                        .iter()
                        .map(|r| format!("{} -> {}", r.tool_name(), r.status()))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!(
                    "{:>3} {:<9} {}",
                    turn.sequence_number,
                    turn.role.as_str().cyan(),
                    Self::preview(&body)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_error(error: &RunQueryError) -> String {
        format!("{} {}", "Error:".red().bold(), error.user_message())
    }

    fn preview(text: &str) -> String {
        if text.chars().count() <= OBSERVATION_PREVIEW {
            return text.to_string();
        }
        let cut: String = text.chars().take(OBSERVATION_PREVIEW).collect();
        format!("{cut}...")
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}\n", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
