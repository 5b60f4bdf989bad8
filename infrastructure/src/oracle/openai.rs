//! OpenAI Chat Completions oracle.
//!
//! History mapping:
//!
//! | Turn | Messages |
//! |------|----------|
//! | user | `user` |
//! | assistant | `assistant` |
//! | tool | one `assistant` message carrying `tool_calls`, then one `tool` message per result |
//!
//! A response with `tool_calls` becomes [`OracleDecision::ToolCalls`];
//! otherwise its text becomes [`OracleDecision::FinalAnswer`].

#![cfg_attr(not(feature = "openai-oracle"), allow(dead_code))]

use agentic_application::OracleError;
use agentic_domain::{Arguments, OracleDecision, RequestedCall, Role, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions accurately, \
using the available tools when they help.\n\
- Call tools only when the answer needs fresh facts, document or data contents, or computation.\n\
- Several independent tool calls may be requested at once.\n\
- Tool results may report an error, a timeout or a denied capability; adapt instead of repeating the same call.\n\
- When you have enough information, reply with the final answer in plain prose without \
mentioning tool names.";

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireFunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// System prompt followed by the visible history.
pub(crate) fn build_messages(history: &[Turn]) -> Vec<WireMessage> {
    let mut messages = vec![WireMessage::text("system", SYSTEM_PROMPT)];
    for turn in history {
        match turn.role {
            Role::User => messages.push(WireMessage::text("user", &turn.content)),
            Role::Assistant => messages.push(WireMessage::text("assistant", &turn.content)),
            Role::Tool => {
                let calls = turn
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.call_id.to_string(),
                        call_type: function_type(),
                        function: WireFunctionCall {
                            name: call.tool_name.clone(),
                            arguments: Value::Object(call.arguments.clone()).to_string(),
                        },
                    })
                    .collect();
                messages.push(WireMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: Some(calls),
                    tool_call_id: None,
                });
                messages.extend(turn.tool_results.iter().map(|result| WireMessage {
                    role: "tool".to_string(),
                    content: Some(result.observation()),
                    tool_calls: None,
                    tool_call_id: Some(result.call_id().to_string()),
                }));
            }
        }
    }
    messages
}

/// Decode a successful chat-completions body.
pub(crate) fn parse_response(body: &str) -> Result<OracleDecision, OracleError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| OracleError::InvalidResponse(format!("malformed response: {}", e)))?;
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| OracleError::InvalidResponse("response has no choices".to_string()))?;

    if let Some(calls) = message.tool_calls.filter(|c| !c.is_empty()) {
        let requested = calls
            .into_iter()
            .map(|call| match parse_arguments(&call.function.arguments) {
                Ok(arguments) => RequestedCall {
                    arguments,
                    ..RequestedCall::new(call.function.name)
                },
                Err(reason) => RequestedCall::malformed(call.function.name, reason),
            })
            .collect();
        return Ok(OracleDecision::ToolCalls(requested));
    }

    match message.content.map(|c| c.trim().to_string()) {
        Some(text) if !text.is_empty() => Ok(OracleDecision::FinalAnswer(text)),
        _ => Err(OracleError::InvalidResponse(
            "response has neither content nor tool calls".to_string(),
        )),
    }
}

/// Tool arguments as an object; the error text is reported back to the
/// oracle as a validation failure of that call.
fn parse_arguments(raw: &str) -> Result<Arguments, String> {
    if raw.trim().is_empty() {
        return Ok(Arguments::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("arguments are not a JSON object: {}", other)),
        Err(e) => Err(format!("arguments are not valid JSON: {}", e)),
    }
}

/// Best-effort message from an error body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[cfg(feature = "openai-oracle")]
mod client {
    use super::*;
    use crate::oracle::OracleSettings;
    use crate::tools::JsonSchemaToolConverter;
    use agentic_application::{Oracle, ToolSchemaPort};
    use agentic_domain::ToolSpec;
    use async_trait::async_trait;
    use tracing::{debug, warn};

    /// [`Oracle`] backed by an OpenAI-compatible chat-completions endpoint.
    #[derive(Debug, Clone)]
    pub struct OpenAiOracle {
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
        model: String,
    }

    impl OpenAiOracle {
        pub fn new(settings: &OracleSettings) -> Result<Self, OracleError> {
            let client = reqwest::Client::builder()
                .timeout(settings.timeout)
                .build()
                .map_err(|e| OracleError::Unavailable(format!("failed to create HTTP client: {}", e)))?;
            Ok(Self {
                client,
                endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
                api_key: settings.api_key.clone(),
                model: settings.model.clone(),
            })
        }

        pub fn model(&self) -> &str {
            &self.model
        }
    }

    #[async_trait]
    impl Oracle for OpenAiOracle {
        async fn decide(
            &self,
            history: &[Turn],
            tools: &[ToolSpec],
        ) -> Result<OracleDecision, OracleError> {
            let request = ChatRequest {
                model: &self.model,
                messages: build_messages(history),
                tools: JsonSchemaToolConverter.tools_schema(tools),
                temperature: 0.2,
            };

            let mut builder = self.client.post(&self.endpoint).json(&request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }
            debug!(model = %self.model, messages = request.messages.len(), tools = request.tools.len(), "Calling oracle");

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Unavailable(e.to_string())
                }
            })?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| OracleError::Unavailable(e.to_string()))?;

            if !status.is_success() {
                let message = error_message(&body);
                warn!(status = %status, message = %message, "Oracle request failed");
                return Err(OracleError::Unavailable(format!("HTTP {}: {}", status, message)));
            }
            parse_response(&body)
        }
    }
}

#[cfg(feature = "openai-oracle")]
pub use client::OpenAiOracle;
