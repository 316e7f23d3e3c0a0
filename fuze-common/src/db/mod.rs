//! SQLite initialization and schema maintenance

pub mod init;
pub mod schema;

pub use init::*;
pub use schema::{ColumnDefinition, SUBMISSIONS_TABLE, SUBMISSION_COLUMNS};
