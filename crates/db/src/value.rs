//! Scalar values, rows and result sets.
//!
//! A [`Row`] keeps columns in driver order. Column names are unique within a
//! row: when a driver reports the same name twice the later value replaces
//! the earlier one but keeps the earlier position (last-write-wins).

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::DbError;

// ---------------------------------------------------------------------------
// ScalarValue
// ---------------------------------------------------------------------------

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form used for comparisons and concatenation. `Null` has none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

/// JSON-native values serialise as themselves; dates become strings.
impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Date(_) | Self::DateTime(_) => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<serde_json::Value> for ScalarValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Text(nested.to_string()),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for ScalarValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDate> for ScalarValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveDateTime> for ScalarValue {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// Ordered column-name → value mapping for one result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, ScalarValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    /// Insert or replace a column. Returns the previous value on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: ScalarValue) -> Option<ScalarValue> {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ScalarValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, ScalarValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// ResultSet
// ---------------------------------------------------------------------------

/// Rows from a single query, in cursor order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Empty result with the driver-reported column list (duplicates kept).
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Append one row given its values in column order.
    pub fn push_values(&mut self, values: Vec<ScalarValue>) -> Result<(), DbError> {
        if values.len() != self.columns.len() {
            return Err(DbError::Query(format!(
                "row has {} values but the result has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        let row = self.columns.iter().cloned().zip(values).collect();
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duplicate_column_keeps_first_position_and_last_value() {
        let mut rs = ResultSet::new(vec!["id".into(), "name".into(), "id".into()]);
        rs.push_values(vec![ScalarValue::Int(1), "a".into(), ScalarValue::Int(2)]).unwrap();

        let row = &rs.rows()[0];
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(row.get("id"), Some(&ScalarValue::Int(2)));
        assert_eq!(rs.columns().len(), 3);
    }

    #[test]
    fn width_mismatch_is_a_query_error() {
        let mut rs = ResultSet::new(vec!["a".into()]);
        let err = rs.push_values(vec![]).unwrap_err();
        assert!(matches!(err, DbError::Query(_)));
        assert!(rs.is_empty());
    }

    #[test]
    fn dates_serialise_as_strings_and_order_is_kept() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let row: Row = vec![
            ("zeta", ScalarValue::Int(1)),
            ("alpha", ScalarValue::Date(date)),
            ("none", ScalarValue::Null),
        ]
        .into_iter()
        .collect();

        let text = serde_json::to_string(&row).unwrap();
        assert_eq!(text, r#"{"zeta":1,"alpha":"2024-03-09","none":null}"#);
    }

    #[test]
    fn json_params_map_onto_scalars() {
        let params: Vec<ScalarValue> = serde_json::from_value(json!(["active", 3, 1.5, true, null])).unwrap();
        assert_eq!(
            params,
            vec![
                ScalarValue::Text("active".into()),
                ScalarValue::Int(3),
                ScalarValue::Float(1.5),
                ScalarValue::Bool(true),
                ScalarValue::Null,
            ]
        );
    }
}
