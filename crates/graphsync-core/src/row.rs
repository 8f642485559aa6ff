//! Row and scalar value model.
//!
//! A [`Row`] is an ordered column → [`Value`] mapping produced per query
//! result. Column order is preserved exactly as inserted, which is what makes
//! the generated property maps deterministic.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::cypher;
use crate::schema::ColumnType;

/// A scalar relational value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert the value to the representation of a column of type `ty`.
    ///
    /// Values that cannot be converted are returned unchanged.
    pub fn coerce(&self, ty: ColumnType) -> Value {
        match (ty, self) {
            (_, Value::Null) => Value::Null,

            (ColumnType::Integer, Value::Float(f)) if is_integral(*f) => Value::Int(*f as i64),
            (ColumnType::Integer, Value::Bool(b)) => Value::Int(i64::from(*b)),
            (ColumnType::Integer, Value::Text(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => self.clone(),
            },

            (ColumnType::Real, Value::Int(i)) => Value::Float(*i as f64),
            (ColumnType::Real, Value::Text(s)) => match s.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => self.clone(),
            },

            (ColumnType::Numeric, Value::Text(s)) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Value::Int(i)
                } else if let Ok(f) = trimmed.parse::<f64>() {
                    Value::Float(f)
                } else {
                    self.clone()
                }
            }

            (ColumnType::Text, Value::Int(i)) => Value::Text(i.to_string()),
            (ColumnType::Text, Value::Float(f)) => Value::Text(f.to_string()),
            (ColumnType::Text, Value::Bool(b)) => Value::Text(b.to_string()),

            (ColumnType::Boolean, Value::Int(0)) => Value::Bool(false),
            (ColumnType::Boolean, Value::Int(1)) => Value::Bool(true),
            (ColumnType::Boolean, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Value::Bool(true),
                "false" | "f" | "0" => Value::Bool(false),
                _ => self.clone(),
            },

            (ColumnType::Timestamp, Value::Text(s)) => match parse_timestamp(s) {
                Some(ts) => Value::Timestamp(ts),
                None => self.clone(),
            },

            _ => self.clone(),
        }
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// Parse RFC 3339 or the common `YYYY-MM-DD[ HH:MM:SS[.fff]]` SQL forms as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Renders the value as a Cypher literal.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cypher::literal(self))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// An ordered mapping from column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert a column. An existing column keeps its position and gets the new value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Projection onto `columns`, in the order given. Absent columns are skipped.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Row {
        columns
            .iter()
            .filter_map(|c| {
                let c = c.as_ref();
                self.get(c).map(|v| (c.to_string(), v.clone()))
            })
            .collect()
    }

    /// The `(column, value)` pairs for the given key columns.
    pub fn key<S: AsRef<str>>(&self, columns: &[S]) -> RowKey {
        RowKey(
            columns
                .iter()
                .filter_map(|c| {
                    let c = c.as_ref();
                    self.get(c).map(|v| (c.to_string(), v.clone()))
                })
                .collect(),
        )
    }

    /// The first column, identifying the row when its key columns are unknown.
    pub fn leading_key(&self) -> RowKey {
        RowKey(self.columns.iter().take(1).cloned().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Primary-key values identifying a row in error reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowKey(pub Vec<(String, Value)>);

impl RowKey {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<no key>");
        }
        for (i, (column, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", column, value)?;
        }
        Ok(())
    }
}
