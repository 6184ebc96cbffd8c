use resmon_core::{CpuRecord, MetricSource, MonitorError, Reading, Result, TickContext};
use sysinfo::{Components, System};

/// Sensor labels that identify the CPU package, checked in order.
const CPU_SENSOR_LABELS: &[&str] = &["coretemp", "package", "k10temp", "tctl", "cpu_thermal", "cpu"];

/// Source of a CPU temperature reading.
pub trait TemperatureSensor: Send + std::fmt::Debug {
    fn read_celsius(&mut self) -> Result<f32>;
}

/// Hardware sensors exposed through sysinfo (hwmon on Linux, SMC on macOS).
#[derive(Debug)]
pub struct ComponentSensor {
    components: Components,
}

impl ComponentSensor {
    /// `None` when the platform exposes no readable temperature sensor.
    pub fn detect() -> Option<Self> {
        let components = Components::new_with_refreshed_list();
        let any_reading = components.iter().any(|c| c.temperature().is_some());
        any_reading.then_some(Self { components })
    }
}

impl TemperatureSensor for ComponentSensor {
    fn read_celsius(&mut self) -> Result<f32> {
        self.components.refresh(false);
        let readings = self
            .components
            .iter()
            .filter_map(|c| Some((c.label().to_lowercase(), c.temperature()?)));
        pick_cpu_temperature(readings)
            .ok_or_else(|| MonitorError::sensor("cpu", "no temperature sensor reported a value"))
    }
}

/// Used when no sensor was found at startup.
#[derive(Debug, Default)]
pub struct NoSensor;

impl TemperatureSensor for NoSensor {
    fn read_celsius(&mut self) -> Result<f32> {
        Err(MonitorError::sensor("cpu", "no temperature sensor on this host"))
    }
}

/// Prefer a sensor whose label names the CPU package; otherwise take the
/// first finite reading.
fn pick_cpu_temperature(readings: impl Iterator<Item = (String, f32)>) -> Option<f32> {
    let readings: Vec<_> = readings.filter(|(_, t)| t.is_finite()).collect();
    CPU_SENSOR_LABELS
        .iter()
        .find_map(|want| {
            readings
                .iter()
                .find(|(label, _)| label.contains(want))
                .map(|(_, t)| *t)
        })
        .or_else(|| readings.first().map(|(_, t)| *t))
}

/// A failed read is "no temperature", never a default value.
fn read_temperature(sensor: &mut dyn TemperatureSensor) -> Option<f32> {
    sensor
        .read_celsius()
        .map_err(|e| tracing::trace!("{e}"))
        .ok()
}

#[cfg(target_os = "linux")]
const CPUFREQ_MAX: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq";

/// cpufreq reports kHz.
fn parse_khz(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .map(|khz| khz / 1000)
        .filter(|&mhz| mhz > 0)
}

/// sysinfo only exposes the current frequency.
fn max_frequency_mhz() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string(CPUFREQ_MAX)
            .ok()
            .and_then(|raw| parse_khz(&raw))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Average CPU utilisation plus package temperature.
#[derive(Debug)]
pub struct CpuProbe {
    sys:           System,
    sensor:        Box<dyn TemperatureSensor>,
    max_frequency: Option<u64>,
}

impl CpuProbe {
    /// Build a probe with the best temperature sensor this host offers.
    ///
    /// Blocks for sysinfo's minimum CPU update interval so the first tick
    /// reports a real utilisation figure.
    pub fn detect() -> Self {
        let sensor: Box<dyn TemperatureSensor> = match ComponentSensor::detect() {
            Some(sensor) => Box::new(sensor),
            None => {
                tracing::info!("No CPU temperature sensor found; temperature will be unavailable");
                Box::new(NoSensor)
            }
        };
        Self::with_sensor(sensor)
    }

    pub fn with_sensor(sensor: Box<dyn TemperatureSensor>) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        Self {
            sys,
            sensor,
            max_frequency: max_frequency_mhz(),
        }
    }
}

impl MetricSource for CpuProbe {
    type Record = CpuRecord;

    fn id(&self) -> &'static str {
        "cpu"
    }

    fn sample(&mut self, _tick: &TickContext) -> Reading<CpuRecord> {
        self.sys.refresh_cpu_all();
        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            return Reading::Unavailable("platform reported no CPUs".into());
        }

        let temperature = read_temperature(self.sensor.as_mut());
        let frequency = cpus.first().map(|c| c.frequency()).filter(|&mhz| mhz > 0);

        Reading::Available(
            CpuRecord::new(self.sys.global_cpu_usage(), temperature)
                .with_cores(cpus.len(), frequency)
                .with_max_frequency(self.max_frequency),
        )
    }
}
