//! Select query description

use serde_json::Value;

use super::Row;

/// Row filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// `column IS NULL`
    IsNull(String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Self::Eq(column, _) | Self::IsNull(column) => column,
        }
    }

    /// Evaluate the filter against an in-memory row.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Eq(column, expected) => row
                .get(column)
                .is_some_and(|value| loosely_equal(value, expected)),
            Self::IsNull(column) => row.get(column).map_or(true, Value::is_null),
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A select over one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.filters.push(Filter::IsNull(column.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }
}

/// Render a filter value the way it appears in a URL query or SQL literal.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// Remote rows may carry numbers as strings and vice versa.
fn loosely_equal(left: &Value, right: &Value) -> bool {
    left == right || (!left.is_null() && !right.is_null() && value_text(left) == value_text(right))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn eq_filter_matches_loosely_typed_values() {
        let candidate = row(json!({"session_id": "s1", "court_number": 2}));
        assert!(Query::new().eq("court_number", 2).matches(&candidate));
        assert!(Query::new().eq("court_number", "2").matches(&candidate));
        assert!(!Query::new().eq("court_number", 3).matches(&candidate));
    }

    #[test]
    fn is_null_filter_treats_missing_as_null() {
        let candidate = row(json!({"completed_at": null}));
        assert!(Query::new()
            .is_null("completed_at")
            .is_null("cancelled_at")
            .matches(&candidate));
        assert!(!Query::new()
            .is_null("completed_at")
            .matches(&row(json!({"completed_at": "2024-01-01T00:00:00Z"}))));
    }
}
