use host_sentinel::config::{ActionConfig, MetricSpec, MonitorConfig};
use host_sentinel::core::metrics::ProcessInfo;

/// Builder for monitor configurations with no default metrics
pub struct TestConfigBuilder {
    config: MonitorConfig,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: MonitorConfig {
                interval_secs: 1.0,
                metrics: Vec::new(),
                latency_targets: Vec::new(),
                ..MonitorConfig::default()
            },
        }
    }

    pub fn metric(mut self, spec: MetricSpec) -> Self {
        self.config.metrics.push(spec);
        self
    }

    pub fn unknown_after(mut self, ticks: u32) -> Self {
        self.config.unknown_after = ticks;
        self
    }

    pub fn actions(mut self, actions: ActionConfig) -> Self {
        self.config.actions = actions;
        self
    }

    pub fn emit_readings(mut self) -> Self {
        self.config.emit_readings = true;
        self
    }

    pub fn build(self) -> MonitorConfig {
        self.config
    }
}

/// Process table with the given `(pid, name, cpu %)` rows
pub fn process_table(rows: &[(u32, &str, f64)]) -> Vec<ProcessInfo> {
    rows.iter().map(|&(pid, name, cpu)| ProcessInfo::new(pid, name, cpu, 100.0)).collect()
}
