//! JSON Schema tool converter.
//!
//! Default implementation of [`ToolSchemaPort`] producing the
//! OpenAI-compatible function format used by the chat-completions oracle.

use agentic_application::ToolSchemaPort;
use agentic_domain::ToolSpec;
use serde_json::{Map, Value, json};

/// Produces `{ "type": "function", "function": { name, description, parameters } }`.
///
/// Parameter types map one-to-one onto JSON Schema types; `enum`,
/// `minimum`, `maximum` and `default` are emitted when the parameter
/// declares them.
pub struct JsonSchemaToolConverter;

impl ToolSchemaPort for JsonSchemaToolConverter {
    fn tool_to_schema(&self, spec: &ToolSpec) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &spec.parameters {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(param.param_type.as_str()));
            prop.insert("description".to_string(), json!(param.description));
            if let Some(values) = &param.allowed_values {
                prop.insert("enum".to_string(), json!(values));
            }
            if let Some(minimum) = param.minimum {
                prop.insert("minimum".to_string(), json!(minimum));
            }
            if let Some(maximum) = param.maximum {
                prop.insert("maximum".to_string(), json!(maximum));
            }
            if let Some(default) = &param.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "function",
            "function": {
                "name": spec.name,
                "description": spec.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_domain::{ParamType, ToolKind, ToolParameter};

    fn search_spec() -> ToolSpec {
        ToolSpec::new("web_search", "Search the web", ToolKind::WebSearch)
            .with_parameter(ToolParameter::new("query", "Search query", ParamType::String, true))
            .with_parameter(
                ToolParameter::new("max_results", "Result count", ParamType::Integer, false)
                    .with_default(5)
                    .with_range(Some(1.0), Some(10.0)),
            )
    }

    #[test]
    fn test_tool_to_schema() {
        let schema = JsonSchemaToolConverter.tool_to_schema(&search_spec());

        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "web_search");
        assert_eq!(schema["function"]["description"], "Search the web");
        assert_eq!(schema["function"]["parameters"]["type"], "object");

        let props = &schema["function"]["parameters"]["properties"];
        assert_eq!(props["query"]["type"], "string");
        assert_eq!(props["max_results"]["type"], "integer");
        assert_eq!(props["max_results"]["default"], 5);
        assert_eq!(props["max_results"]["minimum"], 1.0);
        assert_eq!(props["max_results"]["maximum"], 10.0);
        assert!(props["query"].get("default").is_none());

        let required = schema["function"]["parameters"]["required"].as_array().unwrap();
        assert_eq!(required, &vec![json!("query")]);
    }

    #[test]
    fn test_enum_values() {
        let spec = ToolSpec::new("data_analysis", "Analyze", ToolKind::TabularAnalysis).with_parameter(
            ToolParameter::new("operation", "Op", ParamType::String, false)
                .with_allowed_values(["summary", "filter"]),
        );
        let schema = JsonSchemaToolConverter.tool_to_schema(&spec);
        assert_eq!(
            schema["function"]["parameters"]["properties"]["operation"]["enum"],
            json!(["summary", "filter"])
        );
    }

    #[test]
    fn test_tools_schema_keeps_order() {
        let specs = vec![
            search_spec(),
            ToolSpec::new("code_execute", "Run code", ToolKind::CodeExecution),
            ToolSpec::new("pdf_parser", "Read docs", ToolKind::DocumentExtraction),
        ];
        let names: Vec<Value> = JsonSchemaToolConverter
            .tools_schema(&specs)
            .into_iter()
            .map(|t| t["function"]["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("web_search"), json!("code_execute"), json!("pdf_parser")]);
    }
}
