use std::collections::HashSet;

use super::backends::{is_partition_of, parse_diskstats, read_whole_disks, statvfs_usage};
use super::*;
use crate::core::types::MetricId;
use crate::traits::MetricBackend;

const DISKSTATS_A: &str = "\
   8       0 sda 1000 0 4000 0 500 0 6000 0 0 0 0
   8       1 sda1 900 0 3500 0 450 0 5500 0 0 0 0
 259       0 nvme0n1 10 0 100 0 10 0 200 0 0 0 0
 259       1 nvme0n1p1 10 0 100 0 10 0 200 0 0 0 0
   7       0 loop0 5 0 99999 0 0 0 0 0 0 0 0
 253       0 dm-0 5 0 8888 0 0 0 7777 0 0 0 0
";

#[test]
fn test_diskstats_counts_whole_disks_only() {
    // sda: 4000 + 6000, nvme0n1: 100 + 200
    assert_eq!(parse_diskstats(DISKSTATS_A, None).unwrap(), 10_300);

    let listed: HashSet<String> = ["sda", "nvme0n1", "loop0"].map(String::from).into();
    assert_eq!(parse_diskstats(DISKSTATS_A, Some(&listed)).unwrap(), 10_300);
}

const DISKSTATS_SIMILAR_NAMES: &str = "\
   8       0 sda 1 0 1000 0 1 0 2000 0 0 0 0
   8       1 sda1 1 0 500 0 1 0 500 0 0 0 0
  65     160 sdaa 1 0 30 0 1 0 40 0 0 0 0
 259       0 nvme0n1 1 0 100 0 1 0 200 0 0 0 0
 259       1 nvme0n1p1 1 0 100 0 1 0 200 0 0 0 0
 259      12 nvme0n10 1 0 7 0 1 0 3 0 0 0 0
";

#[test]
fn test_diskstats_keeps_disks_sharing_a_name_prefix() {
    // sda 3000, sdaa 70, nvme0n1 300, nvme0n10 10
    assert_eq!(parse_diskstats(DISKSTATS_SIMILAR_NAMES, None).unwrap(), 3_380);

    let listed: HashSet<String> = ["sda", "sdaa", "nvme0n1", "nvme0n10"].map(String::from).into();
    assert_eq!(parse_diskstats(DISKSTATS_SIMILAR_NAMES, Some(&listed)).unwrap(), 3_380);

    // only what sysfs lists counts
    let listed: HashSet<String> = ["sdaa"].map(String::from).into();
    assert_eq!(parse_diskstats(DISKSTATS_SIMILAR_NAMES, Some(&listed)).unwrap(), 70);
    let listed: HashSet<String> = ["vda"].map(String::from).into();
    assert!(parse_diskstats(DISKSTATS_SIMILAR_NAMES, Some(&listed)).is_err());
}

#[test]
fn test_partition_names() {
    assert!(is_partition_of("sda1", "sda"));
    assert!(is_partition_of("sda15", "sda"));
    assert!(is_partition_of("nvme0n1p2", "nvme0n1"));
    assert!(is_partition_of("mmcblk0p1", "mmcblk0"));
    assert!(!is_partition_of("sdaa", "sda"));
    assert!(!is_partition_of("sda", "sda"));
    assert!(!is_partition_of("nvme0n10", "nvme0n1"));
    assert!(!is_partition_of("nvme0n1p", "nvme0n1"));
}

#[tokio::test]
async fn test_whole_disks_come_from_sys_block() {
    let dir = tempfile::tempdir().unwrap();
    for disk in ["sda", "sdaa", "nvme0n10"] {
        std::fs::create_dir(dir.path().join(disk)).unwrap();
    }
    let disks = read_whole_disks(dir.path()).await.unwrap();
    assert_eq!(disks, HashSet::from(["sda", "sdaa", "nvme0n10"].map(String::from)));

    assert_eq!(read_whole_disks(&dir.path().join("missing")).await, None);
    let empty = tempfile::tempdir().unwrap();
    assert_eq!(read_whole_disks(empty.path()).await, None);
}

#[test]
fn test_diskstats_without_disks_is_an_error() {
    assert!(parse_diskstats("", None).is_err());
    assert!(parse_diskstats("   7 0 loop0 1 0 1 0 1 0 1 0 0 0 0\n", None).is_err());
}

#[cfg(unix)]
#[test]
fn test_statvfs_usage_of_temp_dir() {
    let dir = tempfile::tempdir().unwrap();
    let usage = statvfs_usage(dir.path()).unwrap();
    assert!((0.0..=100.0).contains(&usage));
}

#[cfg(unix)]
#[test]
fn test_statvfs_missing_path() {
    assert!(statvfs_usage(std::path::Path::new("/nonexistent/host-sentinel")).is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_throughput_needs_two_samples() {
    let dir = tempfile::tempdir().unwrap();
    let stats = dir.path().join("diskstats");
    std::fs::write(&stats, DISKSTATS_A).unwrap();
    let sys_block = dir.path().join("block");
    for disk in ["sda", "nvme0n1"] {
        std::fs::create_dir_all(sys_block.join(disk)).unwrap();
    }
    let backend = StatvfsDiskBackend::with_diskstats(dir.path(), &stats).with_sys_block(&sys_block);
    assert!(backend.probe().await);

    let first = backend.sample().await.unwrap();
    let io = MetricId::new(DISK_IO_MB_S);
    assert!(first.values.iter().all(|(id, _)| id != &io));

    std::fs::write(&stats, DISKSTATS_A.replace("sda 1000 0 4000", "sda 1000 0 6048")).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let second = backend.sample().await.unwrap();
    let (_, rate) = second.values.iter().find(|(id, _)| id == &io).unwrap();
    assert!(*rate > 0.0);
}
