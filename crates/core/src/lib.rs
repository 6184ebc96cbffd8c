pub mod error;
pub mod history;
pub mod rate;
pub mod sample;
pub mod source;

pub use error::{MonitorError, Result};
pub use history::{HistorySnapshot, HistoryStore, RunEnd, RunMetadata};
pub use rate::{compute_rate, RateCalculator, RateError, RateReading};
pub use sample::{CpuRecord, DiskRecord, GpuRecord, MemoryRecord, NetworkRecord, Reading, Sample};
pub use source::{MetricSource, Reporter, TickContext};
