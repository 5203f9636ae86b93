use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;

use super::*;
use crate::core::types::{MetricId, Unit};
use crate::error::BackendResult;
use crate::traits::MockMetricBackend;

/// Backend replaying a fixed script of outcomes; the last entry repeats
struct Scripted {
    name: &'static str,
    probe: bool,
    script: Mutex<VecDeque<Option<f64>>>,
    probes: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl Scripted {
    fn new(name: &'static str, script: &[Option<f64>]) -> Self {
        Self {
            name,
            probe: true,
            script: Mutex::new(script.iter().copied().collect()),
            probes: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    fn unprobeable(mut self) -> Self {
        self.probe = false;
        self
    }

    fn hanging(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl MetricBackend for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.probe
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = {
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.pop_front().flatten()
            } else {
                script.front().copied().flatten()
            }
        };
        match next {
            Some(value) => Ok(RawSample::new().with_value("gpu.utilization", value)),
            None => Err(BackendError::tool_missing(self.name)),
        }
    }
}

fn gpu_source() -> FallbackSource {
    FallbackSource::new(
        Resource::Gpu,
        vec![MetricDescriptor::new("gpu.utilization", Unit::Percent), MetricDescriptor::new("gpu.temperature", Unit::Celsius)],
    )
}

#[tokio::test]
async fn test_primary_backend_serves_sample() {
    let source = gpu_source().with_backend(Scripted::new("vendor-cli", &[Some(42.0)])).with_backend(Scripted::new("library", &[Some(1.0)]));

    let sample = source.sample().await.unwrap();
    assert_eq!(sample.backend, "vendor-cli");
    assert!(!sample.degraded);
    assert!(sample.switch.is_none());
    assert_eq!(sample.readings[0].value, 42.0);
    assert_eq!(sample.readings[0].unit, Unit::Percent);
    assert_eq!(sample.readings[0].backend, "vendor-cli");
    assert_eq!(sample.missing, vec![MetricId::new("gpu.temperature")]);
    assert!(!source.is_degraded());
}

#[tokio::test]
async fn test_falls_through_to_next_backend() {
    let source = gpu_source()
        .with_backend(Scripted::new("vendor-cli", &[None]))
        .with_backend(Scripted::new("os-interface", &[]).unprobeable())
        .with_backend(Scripted::new("library", &[Some(55.0)]));

    let sample = source.sample().await.unwrap();
    assert_eq!(sample.backend, "library");
    assert!(sample.degraded);
    assert!(source.is_degraded());
    assert_eq!(source.active_backend(), Some("library"));

    let switch = sample.switch.unwrap();
    assert_eq!(switch.from, None);
    assert_eq!(switch.to, "library");
    assert!(switch.degraded);

    // the switch is reported once, not on every tick
    let again = source.sample().await.unwrap();
    assert!(again.switch.is_none());
}

#[tokio::test]
async fn test_exhausted_chain_is_metric_unavailable() {
    let source = gpu_source().with_backend(Scripted::new("vendor-cli", &[None])).with_backend(Scripted::new("library", &[None]));

    let err = source.sample().await.unwrap_err();
    match err {
        Error::MetricUnavailable { metric, reason } => {
            assert_eq!(metric, "gpu");
            assert!(reason.contains("vendor-cli"));
            assert!(reason.contains("library"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!source.is_degraded());
}

#[tokio::test]
async fn test_restored_primary_reports_switch() {
    let source = gpu_source()
        .with_backend(Scripted::new("vendor-cli", &[None, Some(10.0)]))
        .with_backend(Scripted::new("library", &[Some(20.0)]));

    let degraded = source.sample().await.unwrap();
    assert_eq!(degraded.backend, "library");

    let restored = source.sample().await.unwrap();
    assert_eq!(restored.backend, "vendor-cli");
    let switch = restored.switch.unwrap();
    assert_eq!(switch.from.as_deref(), Some("library"));
    assert!(!switch.degraded);
    assert!(!source.is_degraded());
}

#[tokio::test]
async fn test_backend_probed_only_until_confirmed() {
    let primary = Scripted::new("vendor-cli", &[Some(1.0), None, Some(2.0)]);
    let probes = primary.probes.clone();
    let source = gpu_source().with_backend(primary).with_backend(Scripted::new("library", &[Some(9.0)]));

    source.sample().await.unwrap();
    assert_eq!(source.sample().await.unwrap().backend, "library");
    assert_eq!(probes.load(Ordering::SeqCst), 1);

    // after a failure the backend is probed again before use
    source.sample().await.unwrap();
    assert_eq!(probes.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hung_backend_times_out() {
    let source = gpu_source()
        .with_timeout(Duration::from_millis(200))
        .with_backend(Scripted::new("vendor-cli", &[Some(1.0)]).hanging(Duration::from_secs(30)))
        .with_backend(Scripted::new("library", &[Some(3.0)]));

    let started = tokio::time::Instant::now();
    let sample = source.sample().await.unwrap();
    assert_eq!(sample.backend, "library");
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_non_finite_values_are_rejected() {
    let source = gpu_source()
        .with_backend(Scripted::new("vendor-cli", &[Some(f64::NAN)]))
        .with_backend(Scripted::new("library", &[Some(4.0)]));

    let sample = source.sample().await.unwrap();
    assert_eq!(sample.backend, "library");
}

#[tokio::test]
async fn test_mocked_backend_failing_probe_is_never_sampled() {
    let mut backend = MockMetricBackend::new();
    backend.expect_name().return_const("vendor-cli".to_string());
    backend.expect_probe().times(1).returning(|| false);
    backend.expect_sample().never();

    let source = gpu_source().with_backend(backend);
    assert!(source.sample().await.is_err());
}

#[tokio::test]
async fn test_sample_metric_finds_single_reading() {
    let source = gpu_source().with_backend(Scripted::new("vendor-cli", &[Some(77.0)]));
    let reading = source.sample_metric(&MetricId::new("gpu.utilization")).await.unwrap();
    assert_eq!(reading.value, 77.0);

    let missing = source.sample_metric(&MetricId::new("gpu.temperature")).await;
    assert!(matches!(missing, Err(Error::MetricUnavailable { .. })));
}

#[test]
fn test_registry_rejects_duplicate_metric() {
    let mut registry = SourceRegistry::new();
    registry.register(gpu_source()).unwrap();
    assert!(registry.provides(&MetricId::new("gpu.temperature")));
    assert!(registry.register(gpu_source()).is_err());
    assert_eq!(registry.len(), 1);
}

#[test]
#[cfg(all(feature = "cpu", feature = "memory", feature = "gpu", feature = "disk", feature = "network", feature = "process"))]
fn test_default_registry_covers_every_resource() {
    let config = crate::config::MonitorConfig { backend_timeout_ms: 750, ..Default::default() };
    let registry = SourceRegistry::with_defaults(&config);
    let resources: Vec<Resource> = registry.sources().iter().map(|s| s.resource()).collect();
    assert_eq!(
        resources,
        vec![Resource::Cpu, Resource::Memory, Resource::Gpu, Resource::Disk, Resource::Network, Resource::Process]
    );
    for metric in ["cpu.usage", "cpu.temperature", "memory.usage", "gpu.utilization", "disk.usage", "net.latency_ms"] {
        assert!(registry.provides(&MetricId::new(metric)), "{metric}");
    }
    // the config reaches every source
    let cpu = registry.source_for(&MetricId::new("cpu.usage")).unwrap();
    assert_eq!(cpu.max_duration(), Some(Duration::from_millis(750) * 4));
}
