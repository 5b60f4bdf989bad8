//! `data_analysis` tool — summary statistics, filtering, grouping and chart
//! specifications over CSV files.
//!
//! Processing order for every call:
//!
//! 1. load the file and enforce the row bound (truncate with a warning, or
//!    fail with `RowLimitExceeded` when strict)
//! 2. narrow to `columns` (unknown names are ignored)
//! 3. apply `filter_query` (an unparseable query is reported as a warning)
//! 4. run the requested operation

mod frame;
mod ops;

use std::path::{Path, PathBuf};

use agentic_domain::{
    ParamType, SandboxPolicy, ToolCall, ToolError, ToolKind, ToolParameter, ToolSpec, names,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

pub use frame::{DType, Frame, parse_csv};
pub use ops::{Aggregation, Filter};

use super::paths;
use super::settings::{FILESYSTEM_READ, TabularSettings};
use crate::sandbox::SandboxExecutor;

const OPERATIONS: [&str; 4] = ["summary", "filter", "aggregate", "visualize"];
const AGGREGATIONS: [&str; 3] = ["sum", "mean", "count"];

/// Arguments of one `data_analysis` call.
#[derive(Debug, Clone, PartialEq)]
struct Request {
    file_path: String,
    operation: String,
    columns: Vec<String>,
    filter_query: Option<String>,
    group_by: Option<String>,
    aggregation: Aggregation,
    strict: bool,
}

impl Request {
    fn from_call(call: &ToolCall, strict_default: bool) -> Result<Self, ToolError> {
        let file_path = call
            .get_string("file_path")
            .ok_or_else(|| ToolError::validation(names::DATA_ANALYSIS, "file_path is required"))?
            .to_string();
        let operation = call.get_string("operation").unwrap_or("summary").to_string();
        let aggregation_name = call.get_string("aggregation").unwrap_or("sum");
        let aggregation = Aggregation::parse(aggregation_name).ok_or_else(|| {
            ToolError::validation(
                names::DATA_ANALYSIS,
                format!("unsupported aggregation '{}'", aggregation_name),
            )
        })?;
        let columns = call
            .arguments
            .get("columns")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            file_path,
            operation,
            columns,
            filter_query: call.get_string("filter_query").map(str::to_string),
            group_by: call.get_string("group_by").map(str::to_string),
            aggregation,
            strict: call.get_bool("strict_row_limit").unwrap_or(strict_default),
        })
    }
}

pub struct TabularTool {
    root: Option<PathBuf>,
    max_rows: usize,
    strict_row_limit: bool,
    policy: SandboxPolicy,
}

impl TabularTool {
    pub fn from_settings(settings: &TabularSettings, policy: SandboxPolicy) -> Self {
        Self {
            root: settings.root.clone(),
            max_rows: settings.max_rows,
            strict_row_limit: settings.strict_row_limit,
            policy,
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            names::DATA_ANALYSIS,
            "Analyze a CSV file: summary statistics, row filtering, group-by aggregation or a chart specification.",
            ToolKind::TabularAnalysis,
        )
        .with_parameter(ToolParameter::new(
            "file_path",
            "Path to the CSV file",
            ParamType::String,
            true,
        ))
        .with_parameter(
            ToolParameter::new("operation", "Analysis to perform", ParamType::String, false)
                .with_allowed_values(OPERATIONS)
                .with_default("summary"),
        )
        .with_parameter(ToolParameter::new(
            "columns",
            "Columns to include in the analysis",
            ParamType::Array,
            false,
        ))
        .with_parameter(ToolParameter::new(
            "filter_query",
            "Row filter of the form `column op value`, op one of ==, !=, >, >=, <, <=",
            ParamType::String,
            false,
        ))
        .with_parameter(ToolParameter::new(
            "group_by",
            "Column to group by (aggregate, visualize)",
            ParamType::String,
            false,
        ))
        .with_parameter(
            ToolParameter::new("aggregation", "Aggregation function", ParamType::String, false)
                .with_allowed_values(AGGREGATIONS)
                .with_default("sum"),
        )
        .with_parameter(
            ToolParameter::new(
                "strict_row_limit",
                "Fail instead of truncating when the file exceeds the row limit",
                ParamType::Boolean,
                false,
            )
            .with_default(self.strict_row_limit),
        )
    }

    pub async fn execute(&self, call: &ToolCall, sandbox: &SandboxExecutor) -> Result<Value, ToolError> {
        let request = Request::from_call(call, self.strict_row_limit)?;

        sandbox
            .run_in_process(&[FILESYSTEM_READ], &self.policy, self.analyze(request))
            .await
    }

    async fn analyze(&self, request: Request) -> Result<Value, ToolError> {
        let path = paths::resolve(self.root.as_deref(), &request.file_path)?;
        let mut warnings = Vec::new();
        let frame = self.load(&path, request.strict, &mut warnings).await?;
        let frame = frame.select(&request.columns);

        let frame = match &request.filter_query {
            Some(query) => match Filter::parse(query).and_then(|f| f.apply(frame.clone())) {
                Ok(filtered) => filtered,
                Err(reason) => {
                    warn!(query = %query, reason = %reason, "Ignoring invalid filter query");
                    warnings.push(format!("filter_query ignored: {}", reason));
                    frame
                }
            },
            None => frame,
        };

        let mut payload = match request.operation.as_str() {
            "summary" => ops::summary(&frame),
            "filter" => ops::filter_preview(&frame),
            "aggregate" => ops::aggregate(&frame, request.group_by.as_deref(), request.aggregation)?,
            "visualize" => ops::visualize(&frame, request.group_by.as_deref())?,
            other => {
                return Err(ToolError::validation(
                    names::DATA_ANALYSIS,
                    format!("unsupported operation '{}'", other),
                ));
            }
        };

        if !warnings.is_empty()
            && let Some(object) = payload.as_object_mut()
        {
            object.insert("warnings".to_string(), json!(warnings));
        }
        Ok(payload)
    }

    async fn load(&self, path: &Path, strict: bool, warnings: &mut Vec<String>) -> Result<Frame, ToolError> {
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(ToolError::Execution(format!(
                "unsupported file format: {}",
                path.display()
            )));
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ToolError::Execution(format!("cannot read {}: {}", path.display(), e)))?;
        let mut frame = parse_csv(&text)
            .map_err(|e| ToolError::Execution(format!("cannot parse {}: {}", path.display(), e)))?;

        let rows = frame.rows.len();
        if rows > self.max_rows {
            if strict {
                return Err(ToolError::RowLimitExceeded {
                    rows,
                    max: self.max_rows,
                });
            }
            frame.rows.truncate(self.max_rows);
            warn!(rows, max = self.max_rows, "Truncated table to row limit");
            warnings.push(format!(
                "table truncated to the first {} of {} rows",
                self.max_rows, rows
            ));
        }
        debug!(path = %path.display(), rows = frame.rows.len(), columns = frame.columns.len(), "Loaded table");
        Ok(frame)
    }
}
