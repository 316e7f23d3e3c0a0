//! HTTP API handlers for fuze-portal

pub mod health;
pub mod proxy;
pub mod statistics;
pub mod submissions;

pub use health::health_routes;
pub use proxy::{chat, transcribe};
pub use statistics::get_statistics;
pub use submissions::{
    create_submission, delete_submission, get_submission, list_submissions, update_submission,
};
