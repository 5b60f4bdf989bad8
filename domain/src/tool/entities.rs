//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool name constants for the built-in tool families.
pub mod names {
    pub const WEB_SEARCH: &str = "web_search";
    pub const PDF_PARSER: &str = "pdf_parser";
    pub const DATA_ANALYSIS: &str = "data_analysis";
    pub const CODE_EXECUTE: &str = "code_execute";
}

/// Argument mapping passed to a tool (name → JSON value).
pub type Arguments = Map<String, Value>;

/// Semantic type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Whether a JSON value is acceptable for this type.
    ///
    /// Integers are accepted where a number is expected; floats with no
    /// fractional part are accepted where an integer is expected.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a tool may change state outside its own result.
///
/// Read-only calls from the same planning step run concurrently; mutating
/// calls run one at a time in request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    ReadOnly,
    Mutating,
}

impl SideEffect {
    pub fn is_read_only(&self) -> bool {
        matches!(self, SideEffect::ReadOnly)
    }
}

/// The closed set of tool families a [`ToolSpec`] can be backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    DocumentExtraction,
    TabularAnalysis,
    CodeExecution,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::WebSearch,
        ToolKind::DocumentExtraction,
        ToolKind::TabularAnalysis,
        ToolKind::CodeExecution,
    ];

    /// Name under which the built-in tool of this family is registered.
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => names::WEB_SEARCH,
            ToolKind::DocumentExtraction => names::PDF_PARSER,
            ToolKind::TabularAnalysis => names::DATA_ANALYSIS,
            ToolKind::CodeExecution => names::CODE_EXECUTE,
        }
    }

    pub fn side_effect(&self) -> SideEffect {
        match self {
            ToolKind::CodeExecution => SideEffect::Mutating,
            _ => SideEffect::ReadOnly,
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tool_name())
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Allowed string values, if the parameter is an enumeration
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

impl ToolParameter {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        param_type: ParamType,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type,
            required,
            default: None,
            minimum: None,
            maximum: None,
            allowed_values: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Declared contract of a registered tool.
///
/// Immutable once registered; `kind` is the reference to the capability
/// that implements it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub kind: ToolKind,
    pub side_effect: SideEffect,
    pub parameters: Vec<ToolParameter>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: ToolKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            side_effect: kind.side_effect(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_side_effect(mut self, side_effect: SideEffect) -> Self {
        self.side_effect = side_effect;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Identifier of a single tool call, unique within one orchestration turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic id for the `index`-th call requested at `step`.
    pub fn for_step(step: usize, index: usize) -> Self {
        Self(format!("call_{}_{}", step, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A call to a tool with arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: CallId,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolCall {
    pub fn new(call_id: CallId, tool_name: impl Into<String>) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            arguments: Arguments::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.arguments.get(key).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.arguments.get(key).and_then(|v| v.as_bool())
    }
}
