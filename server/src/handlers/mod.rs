//! Request handlers for queries, feeds and dashboards.

mod dashboard;
mod feed;
mod queries;

pub use dashboard::{handle_dashboard_connection, run_publisher};
pub use feed::handle_feed_connection;
pub use queries::*;
