use std::time::Duration;

use super::*;
use crate::config::MonitorConfig;
use crate::core::types::MetricId;
use crate::error::BackendError;
use crate::traits::MetricBackend;

#[test]
fn test_latency_stats() {
    let (mean, jitter) = latency_stats(&[10.0, 20.0, 30.0]).unwrap();
    assert_eq!(mean, 20.0);
    assert_eq!(jitter, 10.0);

    assert_eq!(latency_stats(&[5.0]), Some((5.0, 0.0)));
    assert_eq!(latency_stats(&[]), None);
}

#[test]
fn test_failed_attempts_count_as_one_second() {
    let (mean, _) = latency_stats(&[20.0, FAILED_ATTEMPT_MS, 20.0]).unwrap();
    assert!((mean - 346.666).abs() < 0.01);
}

#[tokio::test]
async fn test_connect_to_local_listener() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept = tokio::spawn(async move {
        for _ in 0..PROBE_ATTEMPTS {
            let _ = listener.accept().await;
        }
    });

    let backend = TcpConnectBackend::new(addr.to_string());
    assert!(backend.probe().await);
    let sample = backend.sample().await.unwrap();
    accept.await.unwrap();

    let latency = sample.values.iter().find(|(id, _)| id == &MetricId::new(NET_LATENCY_MS)).unwrap().1;
    assert!(latency >= 0.0 && latency < FAILED_ATTEMPT_MS);
}

#[tokio::test]
async fn test_unreachable_target_fails() {
    // bind then drop to get a port nobody listens on
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let backend = TcpConnectBackend::new(addr.to_string()).with_attempt_timeout(Duration::from_millis(200));
    let err = backend.sample().await.unwrap_err();
    assert!(matches!(err, BackendError::Io(_) | BackendError::Timeout(_)));
}

#[test]
fn test_one_backend_per_target() {
    let config = MonitorConfig {
        latency_targets: vec!["127.0.0.1:1".into(), "127.0.0.1:2".into()],
        ..MonitorConfig::default()
    };
    let source = default_source(&config);
    assert_eq!(source.backend_names(), vec!["tcp-connect 127.0.0.1:1", "tcp-connect 127.0.0.1:2"]);
}
