//! WebSocket support for feeds and dashboards.
//!
//! Feed connections stream framed change-sets into the projection. Dashboard
//! connections receive the type list and the rows of the type they follow,
//! pushed whenever those change.

mod manager;
mod protocol;

pub use manager::{ConnectionInfo, ConnectionKind, ConnectionManager};
pub use protocol::*;
