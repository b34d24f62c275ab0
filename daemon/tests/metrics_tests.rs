use procwatch_daemon::collector::{CpuSample, MemSample};
use procwatch_daemon::metrics::{cpu_percentage, memory_metrics};

#[test]
fn test_cpu_percentage_of_uptime() {
    let sample = CpuSample { utime: 300, stime: 100, cutime: 50, cstime: 50 };
    // 500 ticks over 100 s at 100 ticks/s
    let pct = cpu_percentage(&sample, Some(100.0), 100).unwrap();
    assert!((pct - 5.0).abs() < 1e-9);
}

#[test]
fn test_cpu_percentage_monotonic_in_ticks() {
    let mut previous = 0.0;
    for ticks in (0..2000).step_by(50) {
        let sample = CpuSample { utime: ticks, stime: ticks / 2, cutime: 0, cstime: 1 };
        let pct = cpu_percentage(&sample, Some(3600.0), 100).unwrap();
        assert!(pct >= 0.0);
        assert!(pct >= previous);
        previous = pct;
    }
}

#[test]
fn test_cpu_percentage_unavailable() {
    let sample = CpuSample { utime: 10, stime: 10, cutime: 0, cstime: 0 };
    assert_eq!(cpu_percentage(&sample, None, 100), None);
    assert_eq!(cpu_percentage(&sample, Some(0.0), 100), None);
    assert_eq!(cpu_percentage(&sample, Some(-5.0), 100), None);
    assert_eq!(cpu_percentage(&sample, Some(10.0), 0), None);
}

#[test]
fn test_cpu_percentage_zero_ticks_is_zero() {
    let sample = CpuSample::default();
    assert_eq!(cpu_percentage(&sample, Some(10.0), 100), Some(0.0));
}

#[test]
fn test_memory_metrics() {
    let sample = MemSample { total_pages: 150, resident_pages: 100, pss_kb: None, uss_kb: None };
    let metrics = memory_metrics(&sample, 4096, Some(1_000_000));
    assert_eq!(metrics.resident_bytes, 409_600);
    assert_eq!(metrics.virtual_bytes, 204_800);
    assert_eq!(metrics.total_bytes, Some(4_096_000_000));
    assert_eq!(metrics.percentage, Some(409_600.0 / 4_096_000_000.0 * 100.0));
    assert_eq!(metrics.pss_bytes, None);
    assert_eq!(metrics.uss_bytes, None);
}

#[test]
fn test_memory_metrics_share_sizes_in_bytes() {
    let sample = MemSample { total_pages: 10, resident_pages: 5, pss_kb: Some(12), uss_kb: Some(8) };
    let metrics = memory_metrics(&sample, 4096, Some(100));
    assert_eq!(metrics.pss_bytes, Some(12 * 1024));
    assert_eq!(metrics.uss_bytes, Some(8 * 1024));
}

#[test]
fn test_memory_metrics_without_physical_pages() {
    let sample = MemSample { total_pages: 150, resident_pages: 100, pss_kb: None, uss_kb: None };
    for physical in [None, Some(0)] {
        let metrics = memory_metrics(&sample, 4096, physical);
        assert_eq!(metrics.resident_bytes, 409_600);
        assert_eq!(metrics.total_bytes, None);
        assert_eq!(metrics.percentage, None);
    }
}

#[test]
fn test_memory_metrics_resident_above_total() {
    let sample = MemSample { total_pages: 10, resident_pages: 12, pss_kb: None, uss_kb: None };
    let metrics = memory_metrics(&sample, 4096, Some(100));
    assert_eq!(metrics.virtual_bytes, 0);
}
