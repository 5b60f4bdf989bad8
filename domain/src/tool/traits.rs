//! Tool domain traits
//!
//! Contains pure domain logic for argument validation.
//! The async ToolExecutorPort is defined in the application layer (ports).

use std::collections::HashSet;

use serde_json::Value;

use super::entities::{Arguments, ToolCall, ToolParameter, ToolSpec};
use super::value_objects::ToolError;

/// Validator for tool calls
///
/// Pure domain trait: checks a call against its spec without any I/O and
/// returns the arguments the capability should receive.
pub trait ToolValidator {
    fn validate(&self, call: &ToolCall, spec: &ToolSpec) -> Result<Arguments, ToolError>;
}

/// Default implementation of ToolValidator
///
/// Rejects missing required parameters, unknown parameters, type mismatches,
/// values outside an enumeration and numbers outside `minimum`/`maximum`.
/// Optional parameters that were not supplied receive their declared
/// default.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, spec: &ToolSpec) -> Result<Arguments, ToolError> {
        let fail = |message: String| ToolError::validation(&spec.name, message);

        let known: HashSet<&str> = spec.parameters.iter().map(|p| p.name.as_str()).collect();
        if let Some(unknown) = call.arguments.keys().find(|k| !known.contains(k.as_str())) {
            return Err(fail(format!("unknown parameter '{}'", unknown)));
        }

        let mut validated = Arguments::new();
        for param in &spec.parameters {
            match call.arguments.get(&param.name) {
                Some(Value::Null) | None => {
                    if param.required {
                        return Err(fail(format!("missing required parameter '{}'", param.name)));
                    }
                    if let Some(default) = &param.default {
                        validated.insert(param.name.clone(), default.clone());
                    }
                }
                Some(value) => {
                    check_value(param, value).map_err(fail)?;
                    validated.insert(param.name.clone(), value.clone());
                }
            }
        }

        Ok(validated)
    }
}

fn check_value(param: &ToolParameter, value: &Value) -> Result<(), String> {
    if !param.param_type.accepts(value) {
        return Err(format!(
            "parameter '{}' must be of type {}",
            param.name, param.param_type
        ));
    }

    if let Some(allowed) = &param.allowed_values
        && let Some(s) = value.as_str()
        && !allowed.iter().any(|a| a == s)
    {
        return Err(format!(
            "parameter '{}' must be one of [{}], got '{}'",
            param.name,
            allowed.join(", "),
            s
        ));
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = param.minimum
            && n < min
        {
            return Err(format!("parameter '{}' must be >= {}", param.name, min));
        }
        if let Some(max) = param.maximum
            && n > max
        {
            return Err(format!("parameter '{}' must be <= {}", param.name, max));
        }
    }

    Ok(())
}
