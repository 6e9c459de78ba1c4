//! Total, tolerant column getters over a remote row.
//!
//! Every getter returns a value: missing, null or ill-typed columns fall back
//! to the type's default (or to the supplied one), never to an error.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::remote::Row;

#[derive(Debug, Clone, Copy)]
pub struct RowReader<'a> {
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    pub const fn new(row: &'a Row) -> Self {
        Self { row }
    }

    fn get(&self, column: &str) -> Option<&'a Value> {
        self.row.get(column).filter(|value| !value.is_null())
    }

    pub fn string(&self, column: &str) -> String {
        self.opt_string(column).unwrap_or_default()
    }

    pub fn opt_string(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// Text column where a blank value counts as absent.
    pub fn non_empty(&self, column: &str) -> Option<String> {
        self.opt_string(column)
            .filter(|text| !text.trim().is_empty())
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn opt_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value.round() as i64)),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn opt_u32(&self, column: &str) -> Option<u32> {
        self.opt_i64(column)
            .and_then(|value| u32::try_from(value).ok())
    }

    pub fn u32_or(&self, column: &str, default: u32) -> u32 {
        self.opt_u32(column).unwrap_or(default)
    }

    pub fn u32(&self, column: &str) -> u32 {
        self.u32_or(column, 0)
    }

    pub fn opt_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn f64_or(&self, column: &str, default: f64) -> f64 {
        self.opt_f64(column).unwrap_or(default)
    }

    pub fn bool_or(&self, column: &str, default: bool) -> bool {
        match self.get(column) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_i64().map_or(default, |value| value != 0),
            Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => true,
                "false" | "f" | "0" => false,
                _ => default,
            },
            _ => default,
        }
    }

    pub fn opt_timestamp(&self, column: &str) -> Option<DateTime<Utc>> {
        match self.get(column)? {
            Value::String(text) => parse_timestamp(text),
            Value::Number(number) => number
                .as_i64()
                .and_then(DateTime::from_timestamp_millis),
            _ => None,
        }
    }

    /// Timestamp column; unreadable values fall back to the Unix epoch.
    pub fn timestamp(&self, column: &str) -> DateTime<Utc> {
        self.opt_timestamp(column).unwrap_or_default()
    }

    /// Raw JSON column, `Value::Null` when absent.
    pub fn json(&self, column: &str) -> Value {
        self.get(column).cloned().unwrap_or(Value::Null)
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    // `timestamp without time zone` columns come back without an offset
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Render a timestamp the way it is written to remote rows.
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn opt_timestamp_value(at: Option<DateTime<Utc>>) -> Value {
    at.map_or(Value::Null, timestamp_value)
}
