use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::*;
use crate::config::{ActionConfig, EvaluationBasis, MetricSpec, MonitorConfig};
use crate::core::metrics::{ProcessInfo, Reading};
use crate::core::types::{MetricId, Resource, Severity, Unit};
use crate::error::Error;
use crate::policy::{ActionKind, ActionPolicy, ActionResult, CorrectiveKind};
use crate::sink::{CollectingSink, SinkEvent};
use crate::source::{BackendSwitch, Sample};
use crate::traits::{ActionExecutor, MockActionExecutor};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_000 + secs)
}

fn cpu_config(spec: MetricSpec) -> MonitorConfig {
    MonitorConfig { metrics: vec![spec], ..MonitorConfig::default() }
}

fn core(config: MonitorConfig) -> (MonitorCore, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let core = MonitorCore::new(config, sink.clone()).unwrap();
    (core, sink)
}

fn cpu_reading(value: f64, secs: u64) -> Reading {
    Reading::with_timestamp("cpu.usage", value, Unit::Percent, "proc-stat", at(secs))
}

fn cpu_sample(values: &[(&str, f64)], missing: &[&str], switch: Option<BackendSwitch>) -> Sample {
    Sample {
        readings: values
            .iter()
            .map(|(id, v)| Reading::with_timestamp(*id, *v, Unit::Percent, "sysinfo", at(0)))
            .collect(),
        processes: None,
        backend: "sysinfo".to_string(),
        degraded: true,
        switch,
        missing: missing.iter().map(|id| MetricId::new(*id)).collect(),
        timestamp: at(0),
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let spec = MetricSpec::new("cpu.usage", 98.0, 85.0, Unit::Percent);
    let result = MonitorCore::new(cpu_config(spec), Arc::new(CollectingSink::new()));
    assert!(matches!(result, Err(Error::ConfigInvalid(_))));
}

#[tokio::test]
async fn test_debounced_warning_transition() {
    let spec = MetricSpec::new("cpu.usage", 85.0, 98.0, Unit::Percent).with_debounce(3);
    let (core, sink) = core(cpu_config(spec));

    for (tick, value) in [80.0, 86.0, 87.0].into_iter().enumerate() {
        let counts = core.evaluate_reading(&cpu_reading(value, tick as u64), false, None).await;
        assert_eq!(counts.transitions, 0);
    }
    let counts = core.evaluate_reading(&cpu_reading(88.0, 3), false, None).await;
    assert_eq!(counts.transitions, 1);

    let transitions = sink.transitions();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].new_severity, Severity::Warning);
    assert_eq!(transitions[0].timestamp, at(3));

    let snapshot = core.snapshot(&MetricId::new("cpu.usage")).unwrap();
    assert_eq!(snapshot.severity, Severity::Warning);
    assert_eq!(snapshot.history_len, 4);
    assert_eq!(snapshot.min, Some(80.0));
    assert_eq!(snapshot.max, Some(88.0));
    assert_eq!(snapshot.backend.as_deref(), Some("proc-stat"));
    assert_eq!(snapshot.last_transition, Some(at(3)));
}

#[tokio::test]
async fn test_unknown_notified_once() {
    let spec = MetricSpec::new("gpu.temperature", 80.0, 90.0, Unit::Celsius);
    let config = MonitorConfig { unknown_after: 3, ..cpu_config(spec) };
    let (core, sink) = core(config);
    let gpu = MetricId::new("gpu.temperature");

    for tick in 0..5 {
        core.mark_unavailable([&gpu], "all backends failed", at(tick)).await;
        let unknowns = sink.events().iter().filter(|e| matches!(e, SinkEvent::Unknown(_))).count();
        assert_eq!(unknowns, usize::from(tick >= 2), "tick {}", tick + 1);
    }
    assert!(core.status().get(&gpu).unwrap().unknown);

    // notify is on by default
    let kinds: Vec<ActionKind> = sink.actions().iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ActionKind::Log, ActionKind::Notify]);

    core.evaluate_reading(&Reading::with_timestamp("gpu.temperature", 60.0, Unit::Celsius, "nvml", at(6)), false, None).await;
    assert!(sink.events().iter().any(|e| matches!(e, SinkEvent::Restored(r) if r.missed_ticks == 5)));
    assert!(!core.status().get(&gpu).unwrap().unknown);
}

#[tokio::test]
async fn test_sample_with_switch_and_missing_metric() {
    let config = MonitorConfig {
        metrics: vec![
            MetricSpec::new("gpu.utilization", 90.0, 98.0, Unit::Percent),
            MetricSpec::new("gpu.power_watts", 250.0, 300.0, Unit::Watts),
        ],
        unknown_after: 1,
        ..MonitorConfig::default()
    };
    let (core, sink) = core(config);
    let switch = BackendSwitch { from: Some("rocm-smi".into()), to: "amdgpu-sysfs".into(), degraded: true };
    let sample = cpu_sample(&[("gpu.utilization", 40.0), ("gpu.clock_mhz", 1800.0)], &["gpu.power_watts"], Some(switch));

    let counts = core.evaluate_sample(Resource::Gpu, &sample, None).await;
    assert_eq!(counts.readings, 1);
    assert_eq!(counts.unavailable, 1);

    let events = sink.events();
    assert!(matches!(&events[0], SinkEvent::BackendDegraded(c) if c.resource == Resource::Gpu && c.to == "amdgpu-sysfs"));
    assert!(events.iter().any(|e| matches!(e, SinkEvent::Unknown(u) if u.reason.contains("sysinfo"))));

    let status = core.status();
    assert_eq!(status.degraded_metrics(), vec![&MetricId::new("gpu.utilization")]);
    assert_eq!(status.unknown_metrics(), vec![&MetricId::new("gpu.power_watts")]);
}

#[tokio::test]
async fn test_readings_forwarded_when_enabled() {
    let spec = MetricSpec::new("cpu.usage", 85.0, 98.0, Unit::Percent);
    let (core, sink) = core(MonitorConfig { emit_readings: true, ..cpu_config(spec) });

    core.evaluate_sample(Resource::Cpu, &cpu_sample(&[("cpu.usage", 12.0)], &[], None), None).await;
    assert!(matches!(&sink.events()[0], SinkEvent::Reading(r) if r.value == 12.0));
}

#[tokio::test]
async fn test_average_basis_smooths_spikes() {
    let spec = MetricSpec::new("cpu.usage", 85.0, 98.0, Unit::Percent)
        .with_debounce(1)
        .with_evaluation(EvaluationBasis::Average(3));
    let (core, sink) = core(cpu_config(spec));

    core.evaluate_reading(&cpu_reading(10.0, 0), false, None).await;
    core.evaluate_reading(&cpu_reading(10.0, 1), false, None).await;
    core.evaluate_reading(&cpu_reading(100.0, 2), false, None).await;
    assert!(sink.transitions().is_empty());

    core.evaluate_reading(&cpu_reading(100.0, 3), false, None).await;
    core.evaluate_reading(&cpu_reading(100.0, 4), false, None).await;
    assert_eq!(sink.transitions().last().map(|t| t.new_severity), Some(Severity::Critical));
}

#[tokio::test]
async fn test_critical_escalation_runs_corrective_action() {
    let spec = MetricSpec::new("cpu.usage", 85.0, 98.0, Unit::Percent)
        .with_debounce(1)
        .with_corrective(CorrectiveKind::LowerPriority);
    let config = MonitorConfig {
        actions: ActionConfig { lower_priority: true, ..ActionConfig::default() },
        ..cpu_config(spec)
    };

    let mut executor = MockActionExecutor::new();
    executor.expect_lower_priority().withf(|pid, inc| *pid == 4242 && *inc == 10).times(1).returning(|_, _| Ok(()));
    let policy = ActionPolicy::from_config(&config).with_executor(Box::new(executor));
    let (core, sink) = core(config);
    let core = core.with_policy(policy);

    let processes: Arc<[ProcessInfo]> = Arc::from(vec![
        ProcessInfo::new(4242, "stress", 390.0, 20.0),
        ProcessInfo::new(77, "editor", 3.0, 400.0),
    ]);
    let counts = core.evaluate_reading(&cpu_reading(99.5, 0), false, Some(&processes)).await;
    assert_eq!(counts.transitions, 1);
    assert_eq!(counts.actions, 3);

    let corrective = sink.actions().into_iter().find(|a| a.kind == ActionKind::LowerPriority).unwrap();
    assert_eq!(corrective.result, ActionResult::Success);
    assert!(corrective.target.contains("stress"));
    assert_eq!(core.action_log().len(), 3);
}

#[test]
fn test_status_in_config_order() {
    let (core, _) = core(MonitorConfig::default());
    let status = core.status();
    let ids: Vec<&MetricId> = status.metrics.iter().map(|m| m.id()).collect();
    let configured: Vec<&MetricId> = core.metric_ids().collect();
    assert_eq!(ids, configured);
    assert_eq!(status.worst_severity(), Severity::Normal);
    assert!(status.metrics.iter().all(|m| m.latest.is_none()));
}

#[tokio::test]
async fn test_unconfigured_metrics_are_ignored() {
    let spec = MetricSpec::new("cpu.usage", 85.0, 98.0, Unit::Percent);
    let (core, sink) = core(cpu_config(spec));
    let counts = core
        .evaluate_reading(&Reading::with_timestamp("disk.usage", 99.0, Unit::Percent, "statvfs", at(0)), false, None)
        .await;
    assert_eq!(counts, EvaluationCounts::default());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_status_report_serializes_to_json() {
    let spec = MetricSpec::new("cpu.usage", 85.0, 98.0, Unit::Percent).with_debounce(1);
    let (core, _) = core(cpu_config(spec));
    core.evaluate_reading(&cpu_reading(99.0, 0), false, None).await;

    let json: serde_json::Value = serde_json::to_value(core.status()).unwrap();
    let metric = &json["metrics"][0];
    assert_eq!(metric["spec"]["id"], "cpu.usage");
    assert_eq!(metric["severity"], "critical");
    assert_eq!(metric["history_len"], 1);
    assert!(json["generated_at"].is_u64());
}

/// Blocks inside `reclaim_memory` until released from another thread
struct StalledExecutor {
    entered: parking_lot::Mutex<mpsc::Sender<()>>,
    release: parking_lot::Mutex<mpsc::Receiver<()>>,
}

impl ActionExecutor for StalledExecutor {
    fn lower_priority(&self, _pid: u32, _increment: i32) -> crate::error::Result<()> {
        Ok(())
    }

    fn reclaim_memory(&self) -> crate::error::Result<()> {
        let _ = self.entered.lock().send(());
        let _ = self.release.lock().recv();
        Ok(())
    }
}

#[tokio::test]
async fn test_slow_executor_does_not_block_the_runtime() {
    let spec = MetricSpec::new("memory.usage", 90.0, 95.0, Unit::Percent)
        .with_debounce(1)
        .with_corrective(CorrectiveKind::ReclaimMemory);
    let config = MonitorConfig {
        actions: ActionConfig { reclaim_memory: true, ..ActionConfig::default() },
        metrics: vec![spec],
        ..MonitorConfig::default()
    };
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let executor = StalledExecutor {
        entered: parking_lot::Mutex::new(entered_tx),
        release: parking_lot::Mutex::new(release_rx),
    };
    let policy = ActionPolicy::from_config(&config).with_executor(Box::new(executor));
    let (core, sink) = core(config);
    let core = Arc::new(core.with_policy(policy));

    let evaluating = Arc::clone(&core);
    let task = tokio::spawn(async move {
        let reading = Reading::with_timestamp("memory.usage", 97.0, Unit::Percent, "meminfo", at(0));
        evaluating.evaluate_reading(&reading, false, None).await
    });

    // the single runtime thread stays free while the executor is stuck
    tokio::task::spawn_blocking(move || entered_rx.recv()).await.unwrap().unwrap();
    let memory = MetricId::new("memory.usage");
    assert_eq!(core.snapshot(&memory).unwrap().severity, Severity::Critical);
    assert!(core.action_log().is_empty());

    release_tx.send(()).unwrap();
    let counts = task.await.unwrap();
    assert_eq!(counts.transitions, 1);
    let reclaim = sink.actions().into_iter().find(|a| a.kind == ActionKind::ReclaimMemory).unwrap();
    assert_eq!(reclaim.result, ActionResult::Success);
    assert_eq!(core.action_log().len(), 3);
}
