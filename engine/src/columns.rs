//! Column accumulation per record type.
//!
//! Records of one type rarely share an exact shape. The grid shows the union
//! of every field ever seen for the type, sorted by name. Column lists are
//! shared behind an `Arc` and only rebuilt when a genuinely new field shows
//! up, so a UI can skip re-rendering headers by pointer comparison.

use crate::classify::ContentKind;
use crate::flatten::FlatRow;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Shared, immutable list of column definitions.
pub type ColumnList = Arc<Vec<ColumnDef>>;

/// Definition of a grid column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Header label
    pub header_name: String,
    /// Row field shown in this column
    pub field: String,
    /// Content shape first observed for this field
    pub kind: ContentKind,
}

impl ColumnDef {
    /// Create a column whose header is the field name.
    pub fn new(field: impl Into<String>, kind: ContentKind) -> Self {
        let field = field.into();
        Self {
            header_name: field.clone(),
            field,
            kind,
        }
    }
}

/// Accumulated columns of one record type, plus the row signatures already
/// folded into them.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSchema {
    columns: ColumnList,
    seen: Arc<BTreeSet<Vec<String>>>,
}

impl TypeSchema {
    /// Build the schema from the first row seen for a type.
    pub fn from_first_row(row: &FlatRow, kinds: &BTreeMap<String, ContentKind>) -> Self {
        let fields = row
            .fields()
            .map(|field| (field.to_string(), kind_of(kinds, field)))
            .collect();

        Self {
            columns: build_columns(fields),
            seen: Arc::new(BTreeSet::from([row.signature()])),
        }
    }

    /// Fold another row of the same type into the schema.
    ///
    /// Returns `true` when the column list was replaced. On a known signature,
    /// or when the row adds no new field, the existing list is kept as is.
    pub fn observe(&mut self, row: &FlatRow, kinds: &BTreeMap<String, ContentKind>) -> bool {
        let signature = row.signature();
        if self.seen.contains(&signature) {
            return false;
        }

        let mut union: BTreeMap<String, ContentKind> = self
            .columns
            .iter()
            .map(|column| (column.field.clone(), column.kind))
            .collect();
        let current = union.len();
        for field in row.fields() {
            union
                .entry(field.to_string())
                .or_insert_with(|| kind_of(kinds, field));
        }

        Arc::make_mut(&mut self.seen).insert(signature);

        if union.len() == current {
            return false;
        }

        self.columns = build_columns(union);
        true
    }

    /// The current column list.
    pub fn columns(&self) -> &ColumnList {
        &self.columns
    }

    /// Field names of the current columns, ascending.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.field.as_str())
    }

    /// Whether rows with exactly these fields have been folded in already.
    pub fn has_seen(&self, fields: &[&str]) -> bool {
        let signature: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        self.seen.contains(&signature)
    }
}

fn kind_of(kinds: &BTreeMap<String, ContentKind>, field: &str) -> ContentKind {
    kinds.get(field).copied().unwrap_or(ContentKind::Unknown)
}

// BTreeMap iteration gives the lexicographic column order.
fn build_columns(fields: BTreeMap<String, ContentKind>) -> ColumnList {
    Arc::new(
        fields
            .into_iter()
            .map(|(field, kind)| ColumnDef::new(field, kind))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{field_kinds, flatten};
    use crate::Record;
    use serde_json::json;

    fn schema_for(record: &Record) -> TypeSchema {
        TypeSchema::from_first_row(&flatten(record), &field_kinds(record))
    }

    fn observe(schema: &mut TypeSchema, record: &Record) -> bool {
        schema.observe(&flatten(record), &field_kinds(record))
    }

    #[test]
    fn first_row_builds_sorted_columns() {
        let schema = schema_for(&Record::new(
            "B1",
            "TypeB",
            json!({"name": "Fred", "age": 64}),
        ));

        let fields: Vec<_> = schema.fields().collect();
        assert_eq!(fields, vec!["age", "id", "name", "type"]);
        assert_eq!(schema.columns()[0], ColumnDef::new("age", ContentKind::Number));
        assert_eq!(schema.columns()[2].header_name, "name");
        assert_eq!(schema.columns()[2].kind, ContentKind::String);
        assert!(schema.has_seen(&["age", "id", "name", "type"]));
    }

    #[test]
    fn known_signature_keeps_column_identity() {
        let mut schema = schema_for(&Record::new("B1", "TypeB", json!({"name": "Fred"})));
        let before = Arc::clone(schema.columns());

        let rebuilt = observe(
            &mut schema,
            &Record::new("B2", "TypeB", json!({"name": "James"})),
        );

        assert!(!rebuilt);
        assert!(Arc::ptr_eq(&before, schema.columns()));
    }

    #[test]
    fn subset_row_records_signature_without_rebuild() {
        let mut schema = schema_for(&Record::new(
            "E2",
            "TypeE",
            json!({"name": "Wilma", "age": 72}),
        ));
        let before = Arc::clone(schema.columns());

        let rebuilt = observe(&mut schema, &Record::new("E3", "TypeE", json!({"age": 18})));

        assert!(!rebuilt);
        assert!(Arc::ptr_eq(&before, schema.columns()));
        assert!(schema.has_seen(&["age", "id", "type"]));
    }

    #[test]
    fn new_field_rebuilds_union() {
        let mut schema = schema_for(&Record::new("E1", "TypeE", json!({"name": "Fred"})));
        let before = Arc::clone(schema.columns());

        let rebuilt = observe(
            &mut schema,
            &Record::new("E2", "TypeE", json!({"name": "Wilma", "age": 72})),
        );

        assert!(rebuilt);
        assert!(!Arc::ptr_eq(&before, schema.columns()));
        let fields: Vec<_> = schema.fields().collect();
        assert_eq!(fields, vec!["age", "id", "name", "type"]);
    }

    #[test]
    fn existing_column_keeps_first_kind() {
        let mut schema = schema_for(&Record::new("K1", "Kinds", json!({"v": 1})));
        observe(
            &mut schema,
            &Record::new("K2", "Kinds", json!({"v": "one", "w": true})),
        );

        let v = schema.columns().iter().find(|c| c.field == "v").unwrap();
        assert_eq!(v.kind, ContentKind::Number);
        let w = schema.columns().iter().find(|c| c.field == "w").unwrap();
        assert_eq!(w.kind, ContentKind::Boolean);
    }

    #[test]
    fn cloned_schema_is_independent() {
        let original = schema_for(&Record::new("A1", "T", json!({"x": 1})));
        let mut copy = original.clone();
        observe(&mut copy, &Record::new("A2", "T", json!({"x": 2, "y": "hi"})));

        assert_eq!(original.fields().count(), 3);
        assert_eq!(copy.fields().count(), 4);
        assert!(!original.has_seen(&["id", "type", "x", "y"]));
    }

    #[test]
    fn comma_in_field_name_does_not_hide_new_fields() {
        let mut schema = schema_for(&Record::new("R1", "T", json!({"a,b": 1})));

        let rebuilt = observe(&mut schema, &Record::new("R2", "T", json!({"a": 1, "b": 2})));

        assert!(rebuilt);
        let fields: Vec<_> = schema.fields().collect();
        assert_eq!(fields, vec!["a", "a,b", "b", "id", "type"]);
        assert!(schema.has_seen(&["a,b", "id", "type"]));
        assert!(schema.has_seen(&["a", "b", "id", "type"]));
    }

    #[test]
    fn column_def_wire_names() {
        let value = serde_json::to_value(ColumnDef::new("price", ContentKind::Number)).unwrap();
        assert_eq!(
            value,
            json!({"headerName": "price", "field": "price", "kind": "number"})
        );
    }
}
