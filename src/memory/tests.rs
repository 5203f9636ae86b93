use super::backends::{parse_meminfo, MemInfo};
use super::*;
use crate::core::types::MetricId;
use crate::traits::MetricBackend;

const MEMINFO: &str = "\
MemTotal:        8000000 kB
MemFree:          500000 kB
MemAvailable:    2000000 kB
Buffers:          100000 kB
Cached:          1000000 kB
SwapTotal:       1000000 kB
SwapFree:         750000 kB
";

fn value(sample: &crate::source::RawSample, id: &str) -> Option<f64> {
    sample.values.iter().find(|(m, _)| m == &MetricId::new(id)).map(|(_, v)| *v)
}

#[test]
fn test_parse_meminfo() {
    let info = parse_meminfo(MEMINFO).unwrap();
    assert_eq!(
        info,
        MemInfo { total_kib: 8_000_000, available_kib: 2_000_000, swap_total_kib: 1_000_000, swap_free_kib: 750_000 }
    );

    let sample = info.into_sample().unwrap();
    assert_eq!(value(&sample, MEMORY_USAGE), Some(75.0));
    assert_eq!(value(&sample, MEMORY_SWAP_USAGE), Some(25.0));
    assert!((value(&sample, MEMORY_USED_MB).unwrap() - 6_000_000.0 / 1024.0).abs() < 1e-9);
}

#[test]
fn test_parse_meminfo_without_mem_available() {
    let legacy = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 50 kB\nCached: 250 kB\n";
    let info = parse_meminfo(legacy).unwrap();
    assert_eq!(info.available_kib, 400);
    assert_eq!(info.swap_total_kib, 0);

    let sample = info.into_sample().unwrap();
    assert_eq!(value(&sample, MEMORY_SWAP_USAGE), None);
}

#[test]
fn test_parse_meminfo_requires_total() {
    assert!(parse_meminfo("MemFree: 100 kB\n").is_err());
    let zero = MemInfo { total_kib: 0, available_kib: 0, swap_total_kib: 0, swap_free_kib: 0 };
    assert!(zero.into_sample().is_err());
}

#[tokio::test]
async fn test_meminfo_backend_reads_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), MEMINFO).unwrap();
    let backend = ProcMeminfoBackend::with_path(file.path());
    assert!(backend.probe().await);
    let sample = backend.sample().await.unwrap();
    assert_eq!(value(&sample, MEMORY_USAGE), Some(75.0));
}
