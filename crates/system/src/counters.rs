use resmon_core::{RateCalculator, RateReading};
use std::time::Duration;

/// Two cumulative counters that are always read together
/// (sent/received, read/written).
#[derive(Debug, Default)]
pub struct CounterPair {
    first:  RateCalculator,
    second: RateCalculator,
}

impl CounterPair {
    pub fn observe(&mut self, first: u64, second: u64, at: Duration) -> (RateReading, RateReading) {
        (self.first.observe(first, at), self.second.observe(second, at))
    }
}
