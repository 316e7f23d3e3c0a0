//! # FUZE Common Library
//!
//! Shared code for the FUZE submission portal including:
//! - The submission data model and partial field sets
//! - Configuration loading and root folder resolution
//! - SQLite initialization and schema synchronization
//! - The record store contract and its two backends

pub mod coerce;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use error::{Error, Result};
pub use models::{ExtractionStatus, Recommendation, Statistics, Submission, SubmissionFields};
pub use store::{open_store, StoreSettings, SubmissionStore};
