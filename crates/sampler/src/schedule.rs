use std::time::Duration;

/// A tick slot chosen by [`TickSchedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Slot number; tick `i` is due at `i * interval` after run start.
    pub index:   u64,
    /// Offset from run start at which the tick should fire.
    pub due:     Duration,
    /// Earlier slots dropped because their probes would have fired late.
    pub skipped: u64,
}

/// Fixed cadence anchored to run start.
///
/// Slots are `0, interval, 2 * interval, …` up to `total_ticks - 1`.  When
/// the caller falls behind, the latest slot that has already passed fires
/// immediately and any older missed slots are dropped, so lateness never
/// accumulates and never produces a burst.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    interval:    Duration,
    total_ticks: u64,
    next:        u64,
}

impl TickSchedule {
    pub fn new(interval: Duration, total_ticks: u64) -> Self {
        Self {
            interval,
            total_ticks,
            next: 0,
        }
    }

    /// Offset of slot `index` from run start.
    pub fn boundary(&self, index: u64) -> Duration {
        let nanos = self.interval.as_nanos().saturating_mul(u128::from(index));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// The next slot to fire given the time already elapsed, or `None` once
    /// every slot has been used or has passed.
    pub fn next_tick(&mut self, elapsed: Duration) -> Option<Tick> {
        if self.next >= self.total_ticks {
            return None;
        }

        let mut index = self.next;
        let mut skipped = 0;
        if elapsed > self.boundary(index) && !self.interval.is_zero() {
            let latest = elapsed.as_nanos() / self.interval.as_nanos();
            let latest = u64::try_from(latest).unwrap_or(u64::MAX);
            if latest > index {
                skipped = latest - index;
                index = latest;
            }
        }
        if index >= self.total_ticks {
            self.next = self.total_ticks;
            return None;
        }

        self.next = index + 1;
        Some(Tick {
            index,
            due: self.boundary(index),
            skipped,
        })
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }
}
