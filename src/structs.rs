use log::{Log, Metadata, Record as LogRecord, debug};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Simple logger implementation
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &LogRecord) {
        println!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

/// A single cell of a [`Frame`].
///
/// Values are dynamically typed: CSV extraction produces `Text` and `Null`,
/// and the transformer coerces numeric columns to `Number` in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit float.
    Number(f64),
    /// UTF-8 string.
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Coerce to `Number`, turning unparseable text into `Null`.
    pub fn coerce_number(&self) -> Value {
        match self {
            Value::Number(n) => Value::Number(*n),
            Value::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => Value::Number(n),
                Err(_) => Value::Null,
            },
            Value::Null => Value::Null,
        }
    }

    /// Descending sort order: larger values first, `Null` always last,
    /// numbers ranked above text when kinds are mixed.
    pub fn cmp_desc(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Number(a), Value::Number(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
            (Value::Text(a), Value::Text(b)) => b.cmp(a),
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
        }
    }
}

/// In-memory tabular dataset: ordered column names plus row-major storage.
///
/// There is no static schema; operations look columns up by name and decide
/// at runtime whether they can run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Row-major value storage, each row aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// A frame with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// New frame keeping only rows that match `predicate`, same columns.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Configuration for data transformation
///
/// Every field defaults to "disabled"; absent options mean the corresponding
/// step does not run.
#[derive(Debug, Clone, Default)]
pub struct TransformConfig {
    pub drop_duplicates: bool,
    pub category: Option<String>,
    pub aggregate_reviews: bool,
    pub columns_to_keep: Option<Vec<String>>,
    pub min_rating: Option<f64>,
    pub min_reviews: Option<f64>,
    pub sort_by: Option<Vec<String>>,
}

/// One diagnostic record per executed or skipped transform step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepEvent {
    DuplicatesDropped {
        apps_removed: usize,
        reviews_removed: usize,
    },
    DedupSkipped {
        reason: String,
    },
    ColumnCoerced {
        column: String,
        nulled: usize,
    },
    CategoryFiltered {
        category: String,
        kept: usize,
    },
    CategorySkipped {
        reason: String,
    },
    ReviewsAggregated {
        groups: usize,
    },
    ReviewsMerged {
        matched: usize,
    },
    ReviewsSkipped {
        reason: String,
    },
    ColumnsProjected {
        columns: Vec<String>,
    },
    ThresholdFiltered {
        kept: usize,
    },
    Sorted {
        keys: Vec<String>,
    },
    SortKeySkipped {
        column: String,
    },
}

/// Where the transformer reports step diagnostics.
///
/// The transformer emits to an injected sink instead of logging directly, so
/// callers (and tests) can capture the step-by-step record of a run.
pub trait EventSink {
    fn emit(&mut self, event: StepEvent);
}

/// Captures events in order; handy in tests.
impl EventSink for Vec<StepEvent> {
    fn emit(&mut self, event: StepEvent) {
        self.push(event);
    }
}

/// Forwards each event as a JSON line through the `log` facade.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: StepEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => debug!("{json}"),
            Err(_) => debug!("{event:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_number_parses_text_and_nulls_garbage() {
        assert_eq!(Value::Text("4.5".into()).coerce_number(), Value::Number(4.5));
        assert_eq!(Value::Text(" 1500 ".into()).coerce_number(), Value::Number(1500.0));
        assert_eq!(Value::Text("varies".into()).coerce_number(), Value::Null);
        assert_eq!(Value::Null.coerce_number(), Value::Null);
        assert_eq!(Value::Number(3.0).coerce_number(), Value::Number(3.0));
    }

    #[test]
    fn descending_order_puts_nulls_last() {
        let mut vals = vec![
            Value::Null,
            Value::Number(1.0),
            Value::Number(4.5),
            Value::Null,
            Value::Number(3.0),
        ];
        vals.sort_by(|a, b| a.cmp_desc(b));
        assert_eq!(
            vals,
            vec![
                Value::Number(4.5),
                Value::Number(3.0),
                Value::Number(1.0),
                Value::Null,
                Value::Null,
            ]
        );
    }

    #[test]
    fn filter_rows_preserves_columns() {
        let frame = Frame::new(
            vec!["A".into(), "B".into()],
            vec![
                vec![Value::Number(1.0), Value::Text("x".into())],
                vec![Value::Number(2.0), Value::Text("y".into())],
            ],
        );
        let filtered = frame.filter_rows(|row| row[0].as_number().unwrap_or(0.0) > 1.0);
        assert_eq!(filtered.columns, frame.columns);
        assert_eq!(filtered.row_count(), 1);
        assert_eq!(frame.row_count(), 2);
    }
}
