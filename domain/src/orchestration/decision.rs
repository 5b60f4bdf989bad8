//! What the oracle returns from one planning step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::Arguments;

/// A tool invocation requested by the oracle, before it receives a call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestedCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
    /// Why the oracle's raw arguments could not be read as an object.
    /// The call is answered with a validation error instead of running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_error: Option<String>,
}

impl RequestedCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Arguments::new(),
            argument_error: None,
        }
    }

    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            argument_error: Some(reason.into()),
            ..Self::new(name)
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleDecision {
    FinalAnswer(String),
    ToolCalls(Vec<RequestedCall>),
}

impl OracleDecision {
    pub fn answer(text: impl Into<String>) -> Self {
        Self::FinalAnswer(text.into())
    }

    pub fn call(call: RequestedCall) -> Self {
        Self::ToolCalls(vec![call])
    }

    pub fn is_final(&self) -> bool {
        matches!(self, OracleDecision::FinalAnswer(_))
    }
}
