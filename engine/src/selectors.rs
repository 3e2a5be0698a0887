//! Read accessors for presentation code.
//!
//! Returned structures are shared with the store state and must be treated as
//! read-only. Compare them with [`std::sync::Arc::ptr_eq`] to skip work for
//! partitions that did not change.

use crate::classify::ContentKind;
use crate::columns::ColumnList;
use crate::flatten::FlatRow;
use crate::store::{RowList, StoreState};
use crate::TypeName;
use std::sync::Arc;

/// Known type names, ascending.
pub fn list_types(state: &StoreState) -> &[TypeName] {
    state.types().as_slice()
}

/// Rows of a type ordered by id, or `None` for an unknown type.
pub fn list_records_for_type<'a>(state: &'a StoreState, type_name: &str) -> Option<&'a RowList> {
    state.rows(type_name)
}

/// Column definitions of a type, or `None` for an unknown type.
pub fn list_columns_for_type<'a>(
    state: &'a StoreState,
    type_name: &str,
) -> Option<&'a ColumnList> {
    state.columns(type_name)
}

/// Top-level content shape of a type.
pub fn content_kind_for_type(state: &StoreState, type_name: &str) -> Option<ContentKind> {
    state.content_kind(type_name)
}

/// A single row by record id, whatever its type.
pub fn record_for_id<'a>(state: &'a StoreState, id: &str) -> Option<&'a Arc<FlatRow>> {
    state.row(id)
}
