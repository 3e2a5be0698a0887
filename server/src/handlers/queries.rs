//! Query handlers - read-only views of a projection snapshot.

use std::sync::Arc;

use cachegrid_engine::{selectors, ColumnList, ContentKind, FlatRow, StoreState, TypeFilter};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::websocket::ServerMessage;

/// Query parameters for the type list.
#[derive(Debug, Default, Deserialize)]
pub struct TypesQuery {
    /// Regular expression matched against type names
    #[serde(default)]
    pub filter: Option<String>,
}

/// Response for the type list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypesResponse {
    /// Matching type names, ascending
    pub types: Vec<String>,
    /// Number of types before filtering
    pub total: usize,
}

/// Query parameters for a type's rows.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    /// Rows to skip
    #[serde(default)]
    pub offset: Option<usize>,
    /// Maximum number of rows to return (all when absent)
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response for a type's rows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsResponse {
    pub type_name: String,
    /// Rows sorted by id
    pub records: Vec<Arc<FlatRow>>,
    /// Number of rows in the type
    pub total: usize,
    /// Whether rows remain past this page
    pub has_more: bool,
}

/// Response for a type's columns.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub type_name: String,
    pub content_kind: Option<ContentKind>,
    pub columns: ColumnList,
}

/// Maximum page size for row queries.
const MAX_LIMIT: usize = 10_000;

/// List the known types, optionally filtered.
pub fn list_types(state: &StoreState, query: &TypesQuery) -> Result<TypesResponse> {
    let filter = match query.filter.as_deref() {
        Some(pattern) => TypeFilter::new(pattern)?,
        None => TypeFilter::all(),
    };

    let all = selectors::list_types(state);
    let types = filter
        .filter_types(all)
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(TypesResponse {
        types,
        total: all.len(),
    })
}

/// Rows of one type.
pub fn records_for_type(
    state: &StoreState,
    type_name: &str,
    query: &RecordsQuery,
) -> Result<RecordsResponse> {
    let rows = selectors::list_records_for_type(state, type_name)
        .ok_or_else(|| AppError::NotFound(format!("type {type_name}")))?;

    let total = rows.len();
    let offset = query.offset.unwrap_or(0).min(total);
    let limit = query.limit.map(|l| l.clamp(1, MAX_LIMIT)).unwrap_or(total);
    let end = offset.saturating_add(limit).min(total);

    Ok(RecordsResponse {
        type_name: type_name.to_string(),
        records: rows[offset..end].to_vec(),
        total,
        has_more: end < total,
    })
}

/// Columns of one type.
pub fn columns_for_type(state: &StoreState, type_name: &str) -> Result<ColumnsResponse> {
    let columns = selectors::list_columns_for_type(state, type_name)
        .ok_or_else(|| AppError::NotFound(format!("type {type_name}")))?;

    Ok(ColumnsResponse {
        type_name: type_name.to_string(),
        content_kind: selectors::content_kind_for_type(state, type_name),
        columns: Arc::clone(columns),
    })
}

/// Full rows and columns of a type as a dashboard message.
pub fn type_data(state: &StoreState, type_name: &str) -> Option<ServerMessage> {
    let records = selectors::list_records_for_type(state, type_name)?;
    let columns = selectors::list_columns_for_type(state, type_name)?;

    Some(ServerMessage::TypeData {
        type_name: type_name.to_string(),
        records: Arc::clone(records),
        columns: Arc::clone(columns),
        content_kind: selectors::content_kind_for_type(state, type_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachegrid_engine::{ChangeSet, Record};
    use serde_json::json;

    fn sample_state() -> StoreState {
        StoreState::new().apply(
            &ChangeSet::new()
                .put(Record::new("B2", "BuyOrder", json!({"qty": 2})))
                .put(Record::new("B1", "BuyOrder", json!({"qty": 1})))
                .put(Record::new("B3", "BuyOrder", json!({"qty": 3})))
                .put(Record::new("S1", "SellOrder", json!({"qty": 5})))
                .put(Record::new("I1", "Instrument", json!("EURUSD"))),
        )
    }

    #[test]
    fn test_list_types() {
        let state = sample_state();

        let all = list_types(&state, &TypesQuery::default()).unwrap();
        assert_eq!(all.types, vec!["BuyOrder", "Instrument", "SellOrder"]);
        assert_eq!(all.total, 3);

        let orders = list_types(
            &state,
            &TypesQuery {
                filter: Some(".*Order$".to_string()),
            },
        )
        .unwrap();
        assert_eq!(orders.types, vec!["BuyOrder", "SellOrder"]);
        assert_eq!(orders.total, 3);
    }

    #[test]
    fn test_invalid_filter() {
        let result = list_types(
            &sample_state(),
            &TypesQuery {
                filter: Some("(".to_string()),
            },
        );
        assert!(matches!(result, Err(AppError::Engine(_))));
    }

    #[test]
    fn test_records_paging() {
        let state = sample_state();

        let all = records_for_type(&state, "BuyOrder", &RecordsQuery::default()).unwrap();
        let ids: Vec<_> = all.records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["B1", "B2", "B3"]);
        assert!(!all.has_more);

        let page = records_for_type(
            &state,
            "BuyOrder",
            &RecordsQuery {
                offset: Some(1),
                limit: Some(1),
            },
        )
        .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id(), "B2");
        assert_eq!(page.total, 3);
        assert!(page.has_more);

        let past_end = records_for_type(
            &state,
            "BuyOrder",
            &RecordsQuery {
                offset: Some(10),
                limit: None,
            },
        )
        .unwrap();
        assert!(past_end.records.is_empty());
    }

    #[test]
    fn test_unknown_type_is_not_found() {
        let state = sample_state();
        assert!(matches!(
            records_for_type(&state, "Nope", &RecordsQuery::default()),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            columns_for_type(&state, "Nope"),
            Err(AppError::NotFound(_))
        ));
        assert!(type_data(&state, "Nope").is_none());
    }

    #[test]
    fn test_columns_and_type_data() {
        let state = sample_state();

        let columns = columns_for_type(&state, "Instrument").unwrap();
        assert_eq!(columns.content_kind, Some(ContentKind::String));
        let fields: Vec<_> = columns.columns.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["content", "id", "type"]);

        match type_data(&state, "BuyOrder") {
            Some(ServerMessage::TypeData { records, .. }) => {
                assert!(Arc::ptr_eq(&records, state.rows("BuyOrder").unwrap()))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
