//! Store - the normalized, grid-ready projection of a record feed.
//!
//! A [`StoreState`] is an immutable value. Applying a [`ChangeSet`] produces a
//! new state and leaves the old one intact. Partitions the change-set does not
//! touch are shared between the two states by `Arc`, so readers can detect
//! unchanged types with [`Arc::ptr_eq`] instead of comparing contents.

use crate::classify::{classify, ContentKind};
use crate::columns::{ColumnList, TypeSchema};
use crate::flatten::{field_kinds, flatten, FlatRow};
use crate::{ChangeSet, Record, RecordId, TypeName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Rows of one type keyed by record id.
pub type RowMap = Arc<BTreeMap<RecordId, Arc<FlatRow>>>;

/// Rows of one type ordered by record id.
pub type RowList = Arc<Vec<Arc<FlatRow>>>;

/// Which partitions an apply changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Types still present whose rows were rebuilt
    pub touched: Vec<TypeName>,
    /// Types that did not exist before the apply
    pub added: Vec<TypeName>,
    /// Types that existed before and are gone now
    pub removed: Vec<TypeName>,
    /// Number of puts applied
    pub puts: usize,
    /// Number of removes that found their record
    pub removes_applied: usize,
}

impl ApplyReport {
    /// Whether the set of known types changed.
    pub fn types_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Whether the apply changed nothing at all.
    pub fn is_noop(&self) -> bool {
        self.touched.is_empty() && self.removed.is_empty()
    }
}

/// The projection: records, ordered rows and columns per type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    /// Known type names, ascending
    types: Arc<Vec<TypeName>>,
    /// Source of truth per type; never holds an empty map
    records_by_type: HashMap<TypeName, RowMap>,
    /// Rows per type sorted by id, derived from `records_by_type`
    list_by_type: HashMap<TypeName, RowList>,
    /// Accumulated columns per type
    schemas: HashMap<TypeName, TypeSchema>,
    /// Top-level content shape of the record that created each type
    content_kind_by_type: HashMap<TypeName, ContentKind>,
}

impl StoreState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical empty state, regardless of what `self` holds.
    pub fn clear(&self) -> Self {
        Self::default()
    }

    /// Apply a change-set, returning the new state.
    pub fn apply(&self, changes: &ChangeSet) -> StoreState {
        self.apply_with_report(changes).0
    }

    /// Apply a change-set, returning the new state and what it changed.
    ///
    /// Puts are applied in order, then removes in order. A put for an id
    /// that is live under another type moves the record to the new type.
    pub fn apply_with_report(&self, changes: &ChangeSet) -> (StoreState, ApplyReport) {
        let mut pass = ApplyPass::new(self);

        for put in &changes.puts {
            pass.put(put);
        }
        for remove in &changes.removes {
            pass.remove(&remove.id);
        }

        pass.finish(self)
    }

    /// Known type names, ascending.
    pub fn types(&self) -> &Arc<Vec<TypeName>> {
        &self.types
    }

    /// Records of a type keyed by id.
    pub fn records(&self, type_name: &str) -> Option<&RowMap> {
        self.records_by_type.get(type_name)
    }

    /// Rows of a type ordered by id.
    pub fn rows(&self, type_name: &str) -> Option<&RowList> {
        self.list_by_type.get(type_name)
    }

    /// Columns of a type.
    pub fn columns(&self, type_name: &str) -> Option<&ColumnList> {
        self.schemas.get(type_name).map(TypeSchema::columns)
    }

    /// Content shape of a type.
    pub fn content_kind(&self, type_name: &str) -> Option<ContentKind> {
        self.content_kind_by_type.get(type_name).copied()
    }

    /// Find which type currently holds a record id.
    pub fn type_of(&self, id: &str) -> Option<&str> {
        self.records_by_type
            .iter()
            .find(|(_, records)| records.contains_key(id))
            .map(|(type_name, _)| type_name.as_str())
    }

    /// Look up a row by id across all types.
    pub fn row(&self, id: &str) -> Option<&Arc<FlatRow>> {
        self.records_by_type
            .values()
            .find_map(|records| records.get(id))
    }

    /// Total number of records.
    pub fn record_count(&self) -> usize {
        self.records_by_type.values().map(|r| r.len()).sum()
    }

    /// Whether the projection holds no records.
    pub fn is_empty(&self) -> bool {
        self.records_by_type.is_empty()
    }
}

/// Working copies for one apply. Cloning the top-level maps only clones
/// `Arc`s; a partition's map is copied the first time it is edited.
struct ApplyPass {
    records: HashMap<TypeName, RowMap>,
    schemas: HashMap<TypeName, TypeSchema>,
    content_kinds: HashMap<TypeName, ContentKind>,
    touched: BTreeSet<TypeName>,
    to_remove: BTreeSet<TypeName>,
    to_add: BTreeSet<TypeName>,
    puts: usize,
    removes_applied: usize,
}

impl ApplyPass {
    fn new(state: &StoreState) -> Self {
        Self {
            records: state.records_by_type.clone(),
            schemas: state.schemas.clone(),
            content_kinds: state.content_kind_by_type.clone(),
            touched: BTreeSet::new(),
            to_remove: BTreeSet::new(),
            to_add: BTreeSet::new(),
            puts: 0,
            removes_applied: 0,
        }
    }

    fn put(&mut self, record: &Record) {
        let type_name = &record.record_type;

        let previous = self
            .records
            .iter()
            .find(|(name, records)| *name != type_name && records.contains_key(&record.id))
            .map(|(name, _)| name.clone());
        if let Some(previous) = previous {
            self.remove_from(&previous, &record.id);
        }

        self.touched.insert(type_name.clone());
        self.to_remove.remove(type_name);

        let row = flatten(record);
        let kinds = field_kinds(record);

        if self.records.contains_key(type_name) {
            match self.schemas.get_mut(type_name) {
                Some(schema) => {
                    schema.observe(&row, &kinds);
                }
                None => {
                    self.schemas
                        .insert(type_name.clone(), TypeSchema::from_first_row(&row, &kinds));
                }
            }
        } else {
            self.to_add.insert(type_name.clone());
            self.schemas
                .insert(type_name.clone(), TypeSchema::from_first_row(&row, &kinds));
            self.content_kinds
                .insert(type_name.clone(), classify(&record.content));
        }

        let records = self.records.entry(type_name.clone()).or_default();
        Arc::make_mut(records).insert(record.id.clone(), Arc::new(row));
        self.puts += 1;
    }

    fn remove(&mut self, id: &str) {
        let found = self
            .records
            .iter()
            .find(|(_, records)| records.contains_key(id))
            .map(|(name, _)| name.clone());

        if let Some(type_name) = found {
            self.remove_from(&type_name, id);
            self.removes_applied += 1;
        }
    }

    fn remove_from(&mut self, type_name: &TypeName, id: &str) {
        let Some(records) = self.records.get_mut(type_name) else {
            return;
        };

        self.touched.insert(type_name.clone());
        Arc::make_mut(records).remove(id);

        if records.is_empty() {
            self.touched.remove(type_name);
            self.to_remove.insert(type_name.clone());
            self.to_add.remove(type_name);
            self.records.remove(type_name);
            self.schemas.remove(type_name);
            self.content_kinds.remove(type_name);
        }
    }

    fn finish(self, previous: &StoreState) -> (StoreState, ApplyReport) {
        // A type created and emptied within the same apply leaves the set as
        // it was, so compare against the previous state rather than trusting
        // the working sets alone.
        let added: Vec<TypeName> = self
            .to_add
            .iter()
            .filter(|name| !previous.records_by_type.contains_key(*name))
            .cloned()
            .collect();
        let removed: Vec<TypeName> = self
            .to_remove
            .iter()
            .filter(|name| previous.records_by_type.contains_key(*name))
            .cloned()
            .collect();

        let types = if added.is_empty() && removed.is_empty() {
            Arc::clone(&previous.types)
        } else {
            let mut names: Vec<TypeName> = self.records.keys().cloned().collect();
            names.sort();
            Arc::new(names)
        };

        let mut list_by_type = previous.list_by_type.clone();
        for type_name in &self.to_remove {
            list_by_type.remove(type_name);
        }
        for type_name in &self.touched {
            if let Some(records) = self.records.get(type_name) {
                let rows: Vec<Arc<FlatRow>> = records.values().cloned().collect();
                list_by_type.insert(type_name.clone(), Arc::new(rows));
            }
        }

        let report = ApplyReport {
            touched: self.touched.iter().cloned().collect(),
            added,
            removed,
            puts: self.puts,
            removes_applied: self.removes_applied,
        };

        let state = StoreState {
            types,
            records_by_type: self.records,
            list_by_type,
            schemas: self.schemas,
            content_kind_by_type: self.content_kinds,
        };

        (state, report)
    }
}
