use crate::counters::CounterPair;
use resmon_core::{MetricSource, MonitorError, NetworkRecord, Reading, Result, TickContext};
use sysinfo::Networks;

/// Cumulative counters summed over every interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceTotals {
    pub bytes_sent:   u64,
    pub bytes_recv:   u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub interfaces:   usize,
}

/// Where interface counters come from.
pub trait InterfaceCounters: Send + std::fmt::Debug {
    fn read(&mut self) -> Result<InterfaceTotals>;
}

/// Interfaces as listed by sysinfo.
#[derive(Debug)]
pub struct SysinfoInterfaces {
    networks: Networks,
}

impl SysinfoInterfaces {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoInterfaces {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceCounters for SysinfoInterfaces {
    fn read(&mut self) -> Result<InterfaceTotals> {
        // true = drop interfaces that went away since the last refresh
        self.networks.refresh(true);

        let totals = self
            .networks
            .iter()
            .fold(InterfaceTotals::default(), |acc, (_, data)| InterfaceTotals {
                bytes_sent:   acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv:   acc.bytes_recv.saturating_add(data.total_received()),
                packets_sent: acc.packets_sent.saturating_add(data.total_packets_transmitted()),
                packets_recv: acc.packets_recv.saturating_add(data.total_packets_received()),
                interfaces:   acc.interfaces + 1,
            });

        if totals.interfaces == 0 {
            return Err(MonitorError::sensor("network", "no network interfaces found"));
        }
        Ok(totals)
    }
}

/// Upload/download throughput derived from interface byte totals.
#[derive(Debug)]
pub struct NetworkProbe<C = SysinfoInterfaces> {
    counters: C,
    rates:    CounterPair,
}

impl NetworkProbe {
    pub fn new() -> Self {
        Self::with_counters(SysinfoInterfaces::new())
    }
}

impl Default for NetworkProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: InterfaceCounters> NetworkProbe<C> {
    pub fn with_counters(counters: C) -> Self {
        Self {
            counters,
            rates: CounterPair::default(),
        }
    }
}

impl<C: InterfaceCounters> MetricSource for NetworkProbe<C> {
    type Record = NetworkRecord;

    fn id(&self) -> &'static str {
        "network"
    }

    fn sample(&mut self, tick: &TickContext) -> Reading<NetworkRecord> {
        let totals = match self.counters.read() {
            Ok(t) => t,
            Err(e) => return Reading::from(Err::<NetworkRecord, _>(e)),
        };
        let (upload, download) = self
            .rates
            .observe(totals.bytes_sent, totals.bytes_recv, tick.elapsed);

        Reading::Available(NetworkRecord {
            upload,
            download,
            bytes_sent_total:   totals.bytes_sent,
            bytes_recv_total:   totals.bytes_recv,
            packets_sent_total: totals.packets_sent,
            packets_recv_total: totals.packets_recv,
            interfaces:         totals.interfaces,
        })
    }
}
