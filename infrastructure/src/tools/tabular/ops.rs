//! Analysis operations over a [`Frame`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use agentic_domain::{ToolError, names};
use regex::Regex;
use serde_json::{Map, Value, json};

use super::frame::{DType, Frame, is_missing, parse_number, typed_value};

pub const SAMPLE_ROWS: usize = 5;
pub const FILTER_PREVIEW_ROWS: usize = 50;

static FILTER_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:`([^`]+)`|([A-Za-z_][\w.]*))\s*(==|!=|>=|<=|>|<)\s*(.+?)\s*$")
        .expect("filter expression pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "<" => Self::Lt,
            "<=" => Self::Le,
            _ => return None,
        })
    }

    fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
        }
    }
}

/// A parsed `column op value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    column: String,
    comparison: Comparison,
    value: String,
}

impl Filter {
    /// Parse `column op value`. Column names containing spaces may be
    /// wrapped in backticks; string values may be single or double quoted.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let caps = FILTER_EXPR
            .captures(expr)
            .ok_or_else(|| format!("cannot parse filter '{}'", expr))?;
        let column = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let comparison = caps
            .get(3)
            .and_then(|m| Comparison::parse(m.as_str()))
            .ok_or_else(|| format!("unsupported operator in '{}'", expr))?;
        let raw = caps.get(4).map(|m| m.as_str()).unwrap_or_default();

        Ok(Self {
            column,
            comparison,
            value: unquote(raw).to_string(),
        })
    }

    /// Apply the predicate. Rows with a missing cell never match.
    pub fn apply(&self, frame: Frame) -> Result<Frame, String> {
        let index = frame
            .column_index(&self.column)
            .ok_or_else(|| format!("column '{}' not found", self.column))?;

        let numeric_target = frame.dtype(index).is_numeric().then(|| parse_number(&self.value)).flatten();
        let rows = frame
            .rows
            .into_iter()
            .filter(|row| {
                let cell = row[index].trim();
                if is_missing(cell) {
                    return false;
                }
                let ordering = match (numeric_target, parse_number(cell)) {
                    (Some(target), Some(n)) => n.partial_cmp(&target),
                    _ => Some(cell.cmp(self.value.as_str())),
                };
                ordering.is_some_and(|o| self.comparison.holds(o))
            })
            .collect();

        Ok(Frame {
            columns: frame.columns,
            rows,
        })
    }
}

fn unquote(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    raw
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    Count,
}

impl Aggregation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Self::Sum),
            "mean" => Some(Self::Mean),
            "count" => Some(Self::Count),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Count => "count",
        }
    }

    fn apply(&self, values: &[f64]) -> Value {
        match self {
            Self::Sum => json!(values.iter().sum::<f64>()),
            Self::Mean => mean(values).map_or(Value::Null, Value::from),
            Self::Count => json!(values.len()),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

fn column_stats(values: &[f64]) -> Value {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    json!({
        "count": values.len(),
        "mean": mean(values),
        "std": std_dev(values),
        "min": (!values.is_empty()).then_some(min),
        "max": (!values.is_empty()).then_some(max),
    })
}

fn numeric_stats(frame: &Frame) -> Map<String, Value> {
    frame
        .numeric_columns()
        .into_iter()
        .map(|i| (frame.columns[i].clone(), column_stats(&frame.numbers(i))))
        .collect()
}

pub fn summary(frame: &Frame) -> Value {
    let (rows, cols) = frame.shape();
    let dtypes: Map<String, Value> = frame
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), json!(frame.dtype(i).as_str())))
        .collect();
    let missing: Map<String, Value> = frame
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), json!(frame.missing_count(i))))
        .collect();

    json!({
        "shape": [rows, cols],
        "columns": frame.columns,
        "dtypes": dtypes,
        "summary": numeric_stats(frame),
        "missing": missing,
        "sample": frame.head(SAMPLE_ROWS).records(),
    })
}

pub fn filter_preview(frame: &Frame) -> Value {
    let (rows, cols) = frame.shape();
    json!({
        "filtered_shape": [rows, cols],
        "data": frame.head(FILTER_PREVIEW_ROWS).records(),
    })
}

pub fn aggregate(frame: &Frame, group_by: Option<&str>, aggregation: Aggregation) -> Result<Value, ToolError> {
    let group_by = group_by.ok_or_else(|| {
        ToolError::validation(names::DATA_ANALYSIS, "group_by is required for aggregation")
    })?;
    let key_index = frame
        .column_index(group_by)
        .ok_or_else(|| ToolError::Execution(format!("column '{}' not found in data", group_by)))?;

    let value_columns: Vec<usize> = frame
        .numeric_columns()
        .into_iter()
        .filter(|&i| i != key_index)
        .collect();
    if value_columns.is_empty() {
        return Err(ToolError::Execution(
            "no numeric columns found for aggregation".to_string(),
        ));
    }

    let key_dtype = frame.dtype(key_index);
    let mut groups: BTreeMap<String, Vec<&Vec<String>>> = BTreeMap::new();
    for row in &frame.rows {
        let key = row[key_index].trim();
        if is_missing(key) {
            continue;
        }
        groups.entry(group_key(key, key_dtype)).or_default().push(row);
    }

    let data: Map<String, Value> = groups
        .iter()
        .map(|(key, rows)| {
            let values: Map<String, Value> = value_columns
                .iter()
                .map(|&i| {
                    let numbers: Vec<f64> = rows.iter().filter_map(|r| parse_number(&r[i])).collect();
                    (frame.columns[i].clone(), aggregation.apply(&numbers))
                })
                .collect();
            (key.clone(), Value::Object(values))
        })
        .collect();

    Ok(json!({
        "aggregation": aggregation.as_str(),
        "group_by": group_by,
        "shape": [data.len(), value_columns.len()],
        "data": data,
    }))
}

fn group_key(cell: &str, dtype: DType) -> String {
    match typed_value(cell, dtype) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Chart specification: a bar chart of value counts when `group_by` names a
/// column, otherwise per-column statistics for the numeric columns.
pub fn visualize(frame: &Frame, group_by: Option<&str>) -> Result<Value, ToolError> {
    if let Some(column) = group_by
        && let Some(index) = frame.column_index(column)
    {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for cell in frame.cells(index).filter(|c| !is_missing(c)) {
            *counts.entry(cell.trim().to_string()).or_default() += 1;
        }
        let mut points: Vec<(String, usize)> = counts.into_iter().collect();
        points.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let data: Vec<Value> = points
            .into_iter()
            .map(|(value, count)| json!({ (column): value, "count": count }))
            .collect();
        return Ok(json!({
            "visualization_type": "bar",
            "x_axis": column,
            "y_axis": "count",
            "data": data,
        }));
    }

    let stats = numeric_stats(frame);
    if stats.is_empty() {
        return Err(ToolError::Execution(
            "no valid columns found for visualization".to_string(),
        ));
    }
    Ok(json!({
        "visualization_type": "stats",
        "data": stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tabular::frame::parse_csv;

    const SALES: &str = "region,product,units,price\n\
        EU,apple,10,2.5\n\
        US,apple,4,3.0\n\
        EU,pear,6,1.5\n\
        APAC,pear,,2.0\n\
        US,fig,8,4.0\n";

    fn sales() -> Frame {
        parse_csv(SALES).unwrap()
    }

    #[test]
    fn test_summary_stats() {
        let out = summary(&sales());
        assert_eq!(out["shape"], json!([5, 4]));
        assert_eq!(out["dtypes"]["units"], "int64");
        assert_eq!(out["dtypes"]["region"], "object");
        assert_eq!(out["missing"]["units"], 1);
        assert_eq!(out["summary"]["units"]["count"], 4);
        assert_eq!(out["summary"]["units"]["mean"], 7.0);
        assert_eq!(out["summary"]["units"]["min"], 4.0);
        assert_eq!(out["summary"]["units"]["max"], 10.0);
        assert!(out["summary"].get("region").is_none());
        assert_eq!(out["sample"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_std_dev_sample() {
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138).abs() < 0.001);
        assert_eq!(std_dev(&[1.0]), None);
    }

    #[test]
    fn test_filter_numeric_and_text() {
        let frame = Filter::parse("units >= 6").unwrap().apply(sales()).unwrap();
        assert_eq!(frame.rows.len(), 3);

        let frame = Filter::parse("region == 'EU'").unwrap().apply(sales()).unwrap();
        assert_eq!(frame.rows.len(), 2);

        let frame = Filter::parse("region != \"EU\"").unwrap().apply(sales()).unwrap();
        assert_eq!(frame.rows.len(), 3);
    }

    #[test]
    fn test_filter_missing_never_matches() {
        let frame = Filter::parse("units < 100").unwrap().apply(sales()).unwrap();
        assert_eq!(frame.rows.len(), 4);
    }

    #[test]
    fn test_filter_backtick_column() {
        let frame = parse_csv("unit price,n\n1.5,1\n3.0,2\n").unwrap();
        let frame = Filter::parse("`unit price` > 2").unwrap().apply(frame).unwrap();
        assert_eq!(frame.rows, vec![vec!["3.0", "2"]]);
    }

    #[test]
    fn test_filter_errors() {
        assert!(Filter::parse("units").is_err());
        assert!(Filter::parse("units ~ 3").is_err());
        assert!(Filter::parse("nope == 1").unwrap().apply(sales()).is_err());
    }

    #[test]
    fn test_aggregate_sum_and_mean() {
        let out = aggregate(&sales(), Some("region"), Aggregation::Sum).unwrap();
        assert_eq!(out["data"]["EU"]["units"], 16.0);
        assert_eq!(out["data"]["US"]["price"], 7.0);
        assert_eq!(out["data"]["APAC"]["units"], 0.0);
        assert_eq!(out["shape"], json!([3, 2]));

        let out = aggregate(&sales(), Some("region"), Aggregation::Mean).unwrap();
        assert_eq!(out["data"]["EU"]["units"], 8.0);
        assert_eq!(out["data"]["APAC"]["units"], Value::Null);

        let out = aggregate(&sales(), Some("product"), Aggregation::Count).unwrap();
        assert_eq!(out["data"]["pear"]["units"], 1);
        assert_eq!(out["data"]["pear"]["price"], 2);
    }

    #[test]
    fn test_aggregate_requires_group_by() {
        let err = aggregate(&sales(), None, Aggregation::Sum).unwrap_err();
        assert!(matches!(err, ToolError::Validation { .. }));

        let err = aggregate(&sales(), Some("nope"), Aggregation::Sum).unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }

    #[test]
    fn test_visualize_bar_counts() {
        let out = visualize(&sales(), Some("product")).unwrap();
        assert_eq!(out["visualization_type"], "bar");
        assert_eq!(out["x_axis"], "product");
        assert_eq!(out["data"][0], json!({"product": "apple", "count": 2}));
        assert_eq!(out["data"][2], json!({"product": "fig", "count": 1}));
    }

    #[test]
    fn test_visualize_stats_fallback() {
        let out = visualize(&sales(), Some("unknown")).unwrap();
        assert_eq!(out["visualization_type"], "stats");
        assert_eq!(out["data"]["price"]["count"], 5);

        let text_only = parse_csv("a,b\nx,y\n").unwrap();
        assert!(visualize(&text_only, None).is_err());
    }
}
