//! A minimal string-backed data frame read with the `csv` crate.

use serde_json::{Map, Value, json};

/// Column-typed view of a cell, inferred from its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int,
    Float,
    Bool,
    Text,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Int => "int64",
            DType::Float => "float64",
            DType::Bool => "bool",
            DType::Text => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DType::Int | DType::Float)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn is_missing(cell: &str) -> bool {
    matches!(cell.trim(), "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None")
}

pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if is_missing(cell) {
        return None;
    }
    cell.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

impl Frame {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cells(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[index].as_str())
    }

    /// Infer a column's type from its non-missing cells.
    pub fn dtype(&self, index: usize) -> DType {
        let mut present = self.cells(index).filter(|c| !is_missing(c)).peekable();
        if present.peek().is_none() {
            return DType::Float;
        }

        let mut numeric = DType::Int;
        let mut all_bool = true;
        let mut all_numeric = true;
        for cell in present {
            let cell = cell.trim();
            all_bool &= parse_bool(cell).is_some();
            if numeric == DType::Int && cell.parse::<i64>().is_err() {
                numeric = DType::Float;
            }
            all_numeric &= parse_number(cell).is_some();
        }

        if all_numeric {
            numeric
        } else if all_bool {
            DType::Bool
        } else {
            DType::Text
        }
    }

    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| self.dtype(i).is_numeric())
            .collect()
    }

    pub fn numbers(&self, index: usize) -> Vec<f64> {
        self.cells(index).filter_map(parse_number).collect()
    }

    pub fn missing_count(&self, index: usize) -> usize {
        self.cells(index).filter(|c| is_missing(c)).count()
    }

    /// Keep only the named columns that exist, in the order given. If none
    /// exist the frame is returned unchanged.
    pub fn select(self, names: &[String]) -> Frame {
        let indices: Vec<usize> = names.iter().filter_map(|n| self.column_index(n)).collect();
        if indices.is_empty() {
            return self;
        }
        Frame {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    pub fn head(&self, n: usize) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Rows as JSON objects with typed values.
    pub fn records(&self) -> Vec<Value> {
        let dtypes: Vec<DType> = (0..self.columns.len()).map(|i| self.dtype(i)).collect();
        self.rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .zip(&dtypes)
                    .map(|((column, cell), dtype)| (column.clone(), typed_value(cell, *dtype)))
                    .collect();
                Value::Object(record)
            })
            .collect()
    }
}

pub fn typed_value(cell: &str, dtype: DType) -> Value {
    if is_missing(cell) {
        return Value::Null;
    }
    let cell = cell.trim();
    match dtype {
        DType::Int => cell.parse::<i64>().map(Value::from).unwrap_or_else(|_| json!(cell)),
        DType::Float => parse_number(cell).map(Value::from).unwrap_or(Value::Null),
        DType::Bool => parse_bool(cell).map(Value::from).unwrap_or(Value::Null),
        DType::Text => json!(cell),
    }
}

/// Parse CSV text with a header row.
///
/// Short rows are padded with empty cells and long rows truncated to the
/// header width. Blank lines are skipped.
pub fn parse_csv(text: &str) -> Result<Frame, String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| format!("invalid CSV header: {}", e))?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err("file has no header row".to_string());
    }
    let width = columns.len();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("invalid CSV record: {}", e))?;
        let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }
    Ok(Frame { columns, rows })
}
