//! Transcript extraction: prompt construction, reply parsing and the
//! reconciliation pass that ties them to the record store

pub mod prompt;
pub mod reconcile;
pub mod reply;

pub use reconcile::{Outcome, ReconcileOptions, ReconcileReport, Reconciler};
pub use reply::{parse_reply, ReplyError};
