//! Watch2Give Results: the JSON result store and the dashboard read side.
//!
//! Runs append their final [`w2g_core::GiveState`] to a JSON array file via
//! [`JsonFileSink`]. The dashboard reads it back with [`read_records`],
//! folds it into a [`RunSummary`], and turns the plain-text run log into
//! [`ActivityEntry`] rows.

pub mod activity;
pub mod error;
pub mod json_file;
pub mod summary;

pub use activity::{
    parse_log_line, read_activity, time_ago, ActivityEntry, DEFAULT_ACTIVITY_LIMIT, TIMESTAMP_FORMAT,
};
pub use error::SinkError;
pub use json_file::{read_records, JsonFileSink};
pub use summary::{RunSummary, VendorRow};
