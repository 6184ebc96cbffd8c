//! Sampling engine for `resmon`.
//!
//! Wires the pieces of a run together:
//! - [`TickSchedule`]: fixed cadence anchored to run start
//! - [`Sampler`]: `Idle → Running → Finished`, sole writer of the history
//! - [`Pipeline`]: config validation, probe detection, hand-off to a reporter

pub mod pipeline;
pub mod sampler;
pub mod schedule;

pub use pipeline::Pipeline;
pub use sampler::{Observer, Progress, Sampler, SamplerState};
pub use schedule::{Tick, TickSchedule};
