//! # Cachegrid Engine
//!
//! An incremental normalization engine that turns a stream of record
//! change-sets into a grid-ready projection, one partition per record type.
//!
//! Records are self-describing: each has an id, a type and arbitrary JSON
//! content. The engine flattens every record into a row of scalar cells,
//! accumulates the union of fields seen per type into column definitions, and
//! keeps each type's rows sorted by id.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about sockets, files or threads
//! - **Immutable states**: applying a change-set returns a new [`StoreState`]
//! - **Referential stability**: partitions an apply does not touch are shared
//!   with the previous state, so `Arc::ptr_eq` tells a UI what to skip
//! - **Never fails on data**: odd content is rendered as text, unknown removes
//!   are ignored
//!
//! ## Core Concepts
//!
//! ### Records and change-sets
//!
//! A [`ChangeSet`] holds puts ([`Record`]s) and removes ([`RemovalRequest`]s).
//! Puts apply first, in order, then removes. A remove names only an id; the
//! type holding it is found by searching.
//!
//! ### Flattening
//!
//! [`flatten`] spreads object content into columns and renders nested values
//! as JSON text. Non-object content ends up in a single `content` column.
//!
//! ### Columns
//!
//! [`TypeSchema`] keeps the sorted union of fields per type. Columns only grow
//! while a type lives and are rebuilt only when a new field appears.
//!
//! ### Feed framing
//!
//! The [`frame`] module encodes change-sets into the feed's framed message
//! sequence and reassembles them with a [`FrameAssembler`].
//!
//! ## Quick Start
//!
//! ```rust
//! use cachegrid_engine::{selectors, ChangeSet, Record, StoreState};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let empty = StoreState::new();
//! let first = empty.apply(
//!     &ChangeSet::new().put(Record::new("A1", "T1", json!({"x": 1}))),
//! );
//! assert_eq!(selectors::list_types(&first), ["T1"]);
//!
//! let second = first.apply(
//!     &ChangeSet::new().put(Record::new("B1", "T2", json!("hello"))),
//! );
//!
//! // T1 was not touched, so its rows are shared with the previous state.
//! assert!(Arc::ptr_eq(
//!     selectors::list_records_for_type(&first, "T1").unwrap(),
//!     selectors::list_records_for_type(&second, "T1").unwrap(),
//! ));
//! ```

pub mod classify;
pub mod columns;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod frame;
pub mod record;
pub mod selectors;
pub mod store;

// Re-export main types at crate root
pub use classify::{classify, ContentKind};
pub use columns::{ColumnDef, ColumnList, TypeSchema};
pub use error::Error;
pub use filter::TypeFilter;
pub use flatten::{display_text, field_kinds, flatten, FlatRow};
pub use frame::{encode_frame, AssembledFrame, FeedMessage, FrameAssembler};
pub use record::{ChangeSet, Record, RemovalRequest};
pub use store::{ApplyReport, RowList, RowMap, StoreState};

/// Type aliases for clarity
pub type RecordId = String;
pub type TypeName = String;
