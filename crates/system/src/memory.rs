use resmon_core::{MemoryRecord, MetricSource, Reading, TickContext};
use sysinfo::System;

/// Physical memory and swap usage.
#[derive(Debug)]
pub struct MemoryProbe {
    sys: System,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for MemoryProbe {
    type Record = MemoryRecord;

    fn id(&self) -> &'static str {
        "memory"
    }

    fn sample(&mut self, _tick: &TickContext) -> Reading<MemoryRecord> {
        self.sys.refresh_memory();

        // sysinfo reports zeros when it cannot read the platform's memory API.
        let total = self.sys.total_memory();
        if total == 0 {
            return Reading::Unavailable("platform memory API returned no data".into());
        }

        Reading::Available(MemoryRecord::new(
            self.sys.used_memory(),
            total,
            self.sys.available_memory(),
            self.sys.used_swap(),
            self.sys.total_swap(),
        ))
    }
}
