//! Shared helpers for tool use cases.

use agentic_domain::ToolCall;

/// Extract a short preview string from tool call arguments.
///
/// Looks for well-known keys (`query`, `file_path`, `url`, `operation`, `code`)
/// first, then falls back to the first string value found.
pub fn tool_args_preview(call: &ToolCall) -> String {
    let keys = ["query", "file_path", "url", "operation", "code"];
    for key in &keys {
        if let Some(serde_json::Value::String(s)) = call.arguments.get(*key) {
            return truncate_preview(s, 50);
        }
    }
    call.arguments
        .values()
        .find_map(|v| v.as_str())
        .map(|s| truncate_preview(s, 50))
        .unwrap_or_default()
}

fn truncate_preview(s: &str, max_len: usize) -> String {
    let line = s.lines().next().unwrap_or_default();
    if line.chars().count() <= max_len && line.len() == s.len() {
        line.to_string()
    } else {
        let truncated: String = line.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}
