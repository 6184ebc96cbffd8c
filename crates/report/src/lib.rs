//! Consumers of a finished run.
//!
//! [`RunSummary`] derives min / max / average per series from a
//! [`resmon_core::HistorySnapshot`].  [`JsonReporter`] persists the raw
//! history and the summary; [`TextReporter`] prints the summary table.

pub mod json;
pub mod stats;
pub mod text;

#[cfg(test)]
mod testing;

pub use json::JsonReporter;
pub use stats::{RunSummary, SeriesStats, UnavailableCounts};
pub use text::{format_bytes, format_rate, format_summary, TextReporter};
