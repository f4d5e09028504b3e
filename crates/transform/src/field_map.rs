//! Declarative field maps: `{output_field: source_field | derived_expression}`.
//!
//! A map is applied in declaration order, so the output record's key order is
//! the map's order. A `source` rule falls back to its typed default only when
//! the column is absent; a column that is present but null stays null.
//! `coalesce` is the rule that skips nulls.

use std::collections::HashSet;

use db::{Row, ScalarValue};
use serde::{Deserialize, Serialize};

use crate::{ExportRecord, RowTransformer, TransformError};

/// Value substituted when a source column is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// `""`
    String,
    /// `0`
    Number,
    /// `null`
    #[default]
    Null,
}

impl FieldType {
    pub fn default_value(self) -> ScalarValue {
        match self {
            Self::String => ScalarValue::Text(String::new()),
            Self::Number => ScalarValue::Int(0),
            Self::Null => ScalarValue::Null,
        }
    }
}

fn default_separator() -> String {
    " ".to_owned()
}

/// How one output field is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRule {
    /// Copy a column; use `default` when it is absent.
    Source {
        field: String,
        #[serde(default)]
        default: FieldType,
    },
    /// Always the same value.
    Constant { value: ScalarValue },
    /// Join the text of several columns. Missing or null columns are skipped.
    Concat {
        fields: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// First non-null column, else `default`.
    Coalesce {
        fields: Vec<String>,
        #[serde(default)]
        default: FieldType,
    },
}

impl FieldRule {
    fn apply(&self, row: &Row) -> ScalarValue {
        match self {
            Self::Source { field, default } => match row.get(field) {
                Some(value) => value.clone(),
                None => default.default_value(),
            },
            Self::Constant { value } => value.clone(),
            Self::Concat { fields, separator } => {
                let parts: Vec<String> = fields
                    .iter()
                    .filter_map(|f| row.get(f).and_then(ScalarValue::as_text))
                    .collect();
                ScalarValue::Text(parts.join(separator))
            }
            Self::Coalesce { fields, default } => fields
                .iter()
                .filter_map(|f| row.get(f))
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| default.default_value()),
        }
    }
}

/// One `output ← rule` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub output: String,
    #[serde(flatten)]
    pub rule: FieldRule,
}

/// Ordered list of field mappings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
    mappings: Vec<FieldMapping>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, output: impl Into<String>, rule: FieldRule) -> Self {
        self.mappings.push(FieldMapping { output: output.into(), rule });
        self
    }

    /// Copy `source` into `output`, `null` when missing.
    pub fn copy(self, output: impl Into<String>, source: impl Into<String>) -> Self {
        self.copy_or(output, source, FieldType::Null)
    }

    /// Copy `source` into `output`, typed default when missing.
    pub fn copy_or(self, output: impl Into<String>, source: impl Into<String>, default: FieldType) -> Self {
        self.map(output, FieldRule::Source { field: source.into(), default })
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn output_fields(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.output.as_str())
    }

    /// Reject empty or repeated output names and multi-source rules with no sources.
    pub fn validate(&self) -> Result<(), TransformError> {
        let mut seen = HashSet::new();
        for m in &self.mappings {
            if m.output.trim().is_empty() {
                return Err(TransformError::EmptyOutputField);
            }
            if !seen.insert(m.output.as_str()) {
                return Err(TransformError::DuplicateOutputField(m.output.clone()));
            }
            if let FieldRule::Concat { fields, .. } | FieldRule::Coalesce { fields, .. } = &m.rule {
                if fields.is_empty() {
                    return Err(TransformError::NoSourceFields(m.output.clone()));
                }
            }
        }
        Ok(())
    }
}

impl RowTransformer for FieldMap {
    fn transform(&self, row: &Row) -> ExportRecord {
        let mut record = Row::with_capacity(self.mappings.len());
        for m in &self.mappings {
            record.insert(m.output.clone(), m.rule.apply(row));
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, ScalarValue)]) -> Row {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn missing_source_uses_typed_default_instead_of_failing() {
        let map = FieldMap::new()
            .copy("id", "id")
            .copy_or("phone", "phone", FieldType::String)
            .copy_or("visits", "visit_count", FieldType::Number)
            .copy("notes", "notes");

        let record = map.transform(&row(&[("id", ScalarValue::Int(7))]));

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["id", "phone", "visits", "notes"]);
        assert_eq!(record.get("phone"), Some(&ScalarValue::Text(String::new())));
        assert_eq!(record.get("visits"), Some(&ScalarValue::Int(0)));
        assert_eq!(record.get("notes"), Some(&ScalarValue::Null));
    }

    #[test]
    fn present_null_is_copied_and_only_absent_columns_get_defaults() {
        let map = FieldMap::new()
            .copy_or("phone", "phone", FieldType::String)
            .copy_or("email", "email", FieldType::String);

        let record = map.transform(&row(&[("phone", ScalarValue::Null)]));

        assert_eq!(record.get("phone"), Some(&ScalarValue::Null));
        assert_eq!(record.get("email"), Some(&ScalarValue::Text(String::new())));
    }

    #[test]
    fn derived_rules_rename_join_and_coalesce() {
        let map = FieldMap::new()
            .copy("customer", "customer_name")
            .map(
                "location",
                FieldRule::Concat { fields: vec!["city".into(), "state".into(), "zip".into()], separator: ", ".into() },
            )
            .map(
                "contact",
                FieldRule::Coalesce { fields: vec!["email".into(), "phone".into()], default: FieldType::String },
            )
            .map("source", FieldRule::Constant { value: "warehouse".into() });

        let record = map.transform(&row(&[
            ("customer_name", "Ada".into()),
            ("city", "Austin".into()),
            ("state", ScalarValue::Null),
            ("zip", ScalarValue::Int(78701)),
            ("email", ScalarValue::Null),
            ("phone", "555-0100".into()),
        ]));

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "customer": "Ada",
                "location": "Austin, 78701",
                "contact": "555-0100",
                "source": "warehouse"
            })
        );
    }

    #[test]
    fn validate_rejects_duplicate_and_empty_outputs() {
        let dup = FieldMap::new().copy("id", "id").copy("id", "other_id");
        assert_eq!(dup.validate(), Err(TransformError::DuplicateOutputField("id".into())));

        let empty = FieldMap::new().copy(" ", "id");
        assert_eq!(empty.validate(), Err(TransformError::EmptyOutputField));

        let no_sources = FieldMap::new().map("x", FieldRule::Coalesce { fields: vec![], default: FieldType::Null });
        assert_eq!(no_sources.validate(), Err(TransformError::NoSourceFields("x".into())));
    }

    #[test]
    fn field_maps_load_from_json_in_declared_order() {
        let map: FieldMap = serde_json::from_value(json!([
            { "output": "name", "kind": "source", "field": "customer_name", "default": "string" },
            { "output": "id", "kind": "source", "field": "id" },
            { "output": "full", "kind": "concat", "fields": ["first", "last"] },
            { "output": "tier", "kind": "constant", "value": 2 }
        ]))
        .unwrap();

        assert!(map.validate().is_ok());
        assert_eq!(map.output_fields().collect::<Vec<_>>(), vec!["name", "id", "full", "tier"]);
        assert_eq!(
            map.mappings()[2].rule,
            FieldRule::Concat { fields: vec!["first".into(), "last".into()], separator: " ".into() }
        );
        assert_eq!(map.mappings()[3].rule, FieldRule::Constant { value: ScalarValue::Int(2) });
    }
}
