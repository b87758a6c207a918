//! Typed result frames.
//!
//! The database hands back loosely typed rows: column names, a declared type
//! per column and JSON values. A [`Frame`] stores one typed vector per column,
//! with the query's time columns converted to UTC timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ast::QueryFormat;
use crate::error::{Error, Result};

/// A tabular result as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResult {
    pub columns: Vec<String>,
    pub types: Vec<String>,
    pub values: Vec<Vec<Value>>,
    /// Set by the store when the statement failed.
    pub error: String,
}

/// How the frame should be read by a consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    #[default]
    Table,
    TimeSeriesWide,
}

/// Values of a single column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum FieldValues {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Time(Vec<Option<DateTime<Utc>>>),
}

impl FieldValues {
    fn for_type(declared: &str, capacity: usize) -> Self {
        let declared = declared.to_lowercase();

        if declared.contains("int") {
            FieldValues::Int64(Vec::with_capacity(capacity))
        } else if ["real", "float", "double", "numeric"]
            .iter()
            .any(|t| declared.contains(t))
        {
            FieldValues::Float64(Vec::with_capacity(capacity))
        } else {
            // text, varchar, blob and anything unknown
            FieldValues::String(Vec::with_capacity(capacity))
        }
    }

    fn push(&mut self, value: &Value) {
        match self {
            FieldValues::Time(values) => values.push(parse_time(value)),
            FieldValues::Int64(values) => values.push(non_null(value).map(to_int64)),
            FieldValues::Float64(values) => values.push(non_null(value).map(to_float64)),
            FieldValues::String(values) => values.push(non_null(value).map(to_text)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Int64(v) => v.len(),
            FieldValues::Float64(v) => v.len(),
            FieldValues::String(v) => v.len(),
            FieldValues::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at `row` as JSON, `null` when missing.
    pub fn get(&self, row: usize) -> Value {
        let value = match self {
            FieldValues::Int64(v) => v.get(row).copied().flatten().map(Value::from),
            FieldValues::Float64(v) => v.get(row).copied().flatten().map(Value::from),
            FieldValues::String(v) => v.get(row).cloned().flatten().map(Value::from),
            FieldValues::Time(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(|t| Value::from(t.to_rfc3339())),
        };

        value.unwrap_or(Value::Null)
    }
}

/// One named column of a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub values: FieldValues,
}

/// A typed, column-oriented result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub kind: FrameKind,
    pub fields: Vec<Field>,
}

impl Frame {
    /// Convert a raw result. Columns listed in `time_columns` (compared
    /// case-insensitively) become timestamps regardless of declared type.
    pub fn from_result(result: &RawResult, time_columns: &[String]) -> Result<Self> {
        if !result.error.is_empty() {
            return Err(Error::Execution(result.error.clone()));
        }

        let time_columns: Vec<String> = time_columns.iter().map(|c| c.to_lowercase()).collect();
        let rows = result.values.len();

        let mut fields: Vec<Field> = result
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values = if time_columns.contains(&name.to_lowercase()) {
                    FieldValues::Time(Vec::with_capacity(rows))
                } else {
                    let declared = result.types.get(i).map(String::as_str).unwrap_or("");
                    FieldValues::for_type(declared, rows)
                };

                Field {
                    name: name.clone(),
                    values,
                }
            })
            .collect();

        for row in &result.values {
            for (i, field) in fields.iter_mut().enumerate() {
                field.values.push(row.get(i).unwrap_or(&Value::Null));
            }
        }

        Ok(Self {
            name: "response".to_string(),
            kind: FrameKind::Table,
            fields,
        })
    }

    /// Tag the frame for the requested query format.
    pub fn with_format(mut self, format: QueryFormat) -> Self {
        self.kind = match format {
            QueryFormat::Table => FrameKind::Table,
            QueryFormat::TimeSeries => FrameKind::TimeSeriesWide,
        };
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.fields.first().map(|f| f.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Row `index` as JSON values, in column order.
    pub fn row(&self, index: usize) -> Vec<Value> {
        self.fields.iter().map(|f| f.values.get(index)).collect()
    }
}

fn non_null(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        v => Some(v),
    }
}

fn to_int64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn to_float64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

/// Timestamps are epoch numbers or strings. Unreadable values map to the
/// Unix epoch, `null` stays `None`.
fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(n.as_f64().map(unix_to_time).unwrap_or_default()),
        Value::String(s) => Some(parse_time_str(s).unwrap_or_default()),
        _ => Some(DateTime::default()),
    }
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }

    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(t.and_utc());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Guess the epoch unit from the magnitude: seconds below 1e12,
/// milliseconds below 1e15, microseconds below 1e18, nanoseconds above.
fn unix_to_time(v: f64) -> DateTime<Utc> {
    let abs = v.abs();

    if abs < 1e12 {
        let secs = v.floor();
        let nanos = ((v - secs) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos).unwrap_or_default()
    } else if abs < 1e15 {
        from_scaled(v as i64, 1_000)
    } else if abs < 1e18 {
        from_scaled(v as i64, 1_000_000)
    } else {
        from_scaled(v as i64, 1_000_000_000)
    }
}

fn from_scaled(value: i64, per_second: i64) -> DateTime<Utc> {
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::from_timestamp(secs, nanos as u32).unwrap_or_default()
}
