use procwatch_daemon::collector::{
    DuplicatePolicy, LinuxProcessCollector, ProcessLocator, SampleReader, SystemInfo,
};
use procwatch_daemon::error::SampleError;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_process(root: &Path, pid: u32, cmdline: &[u8], comm: &str, ticks: [u64; 4], start: u64) {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("cmdline"), cmdline).unwrap();
    let stat = format!(
        "{} ({}) S 1 {} {} 0 -1 4194304 10 0 0 0 {} {} {} {} 20 0 1 0 {} 123456 50\n",
        pid, comm, pid, pid, ticks[0], ticks[1], ticks[2], ticks[3], start
    );
    fs::write(dir.join("stat"), stat).unwrap();
    fs::write(dir.join("statm"), "150 100 20 5 0 60 0\n").unwrap();
}

fn current_exe_name() -> String {
    let arg0 = std::env::args().next().unwrap();
    Path::new(&arg0).file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn test_locate_finds_current_process() {
    let collector = LinuxProcessCollector::new();
    let pid = collector.locate(&current_exe_name());
    assert!(pid.is_some(), "Should find the test binary by name");
}

#[test]
fn test_read_samples_for_current_process() {
    let collector = LinuxProcessCollector::new();
    let pid = std::process::id();
    assert!(collector.read_cpu_sample(pid).is_ok());
    let mem = collector.read_mem_sample(pid).unwrap();
    assert!(mem.resident_pages > 0);
    assert!(mem.total_pages >= mem.resident_pages);
}

#[test]
fn test_read_sample_for_invalid_pid() {
    let collector = LinuxProcessCollector::new();
    let err = collector.read_cpu_sample(999999999).unwrap_err();
    assert!(matches!(err, SampleError::ProcessGone { pid: 999999999 }));
    assert!(collector.read_mem_sample(999999999).is_err());
}

#[test]
fn test_system_constants() {
    let collector = LinuxProcessCollector::new();
    assert!(collector.uptime_seconds().unwrap() > 0.0);
    assert!(collector.clock_ticks() > 0);
    assert!(collector.page_size() > 0);
    assert!(collector.physical_pages().unwrap() > 0);
}

#[test]
fn test_locate_matches_base_name_exactly() {
    let dir = tempdir().unwrap();
    write_process(dir.path(), 100, b"/usr/sbin/nginx\0-g\0daemon off;\0", "nginx", [1, 2, 3, 4], 10);
    write_process(dir.path(), 200, b"/usr/bin/nginx-debug\0", "nginx-debug", [1, 2, 3, 4], 20);
    write_process(dir.path(), 300, b"redis-server\0", "redis-server", [1, 2, 3, 4], 30);
    let collector = LinuxProcessCollector::with_root(dir.path());

    assert_eq!(collector.locate("nginx"), Some(100));
    assert_eq!(collector.locate("redis-server"), Some(300));
    assert_eq!(collector.locate("Nginx"), None);
    assert_eq!(collector.locate("usr"), None);
}

#[test]
fn test_locate_skips_unreadable_candidates() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("400")).unwrap();
    fs::create_dir_all(dir.path().join("self")).unwrap();
    let collector = LinuxProcessCollector::with_root(dir.path());
    assert_eq!(collector.locate("anything"), None);
}

#[test]
fn test_newest_policy_prefers_latest_start() {
    let dir = tempdir().unwrap();
    write_process(dir.path(), 100, b"/opt/app/worker\0", "worker", [0; 4], 500);
    write_process(dir.path(), 200, b"/opt/app/worker\0", "worker", [0; 4], 900);
    write_process(dir.path(), 300, b"/opt/app/worker\0", "worker", [0; 4], 700);
    let collector = LinuxProcessCollector::with_root(dir.path()).with_policy(DuplicatePolicy::Newest);
    assert_eq!(collector.locate("worker"), Some(200));

    let first = LinuxProcessCollector::with_root(dir.path());
    assert!(matches!(first.locate("worker"), Some(100 | 200 | 300)));
}

#[test]
fn test_cpu_sample_with_spaces_in_command_name() {
    let dir = tempdir().unwrap();
    write_process(dir.path(), 100, b"tmux\0", "tmux: server (1)", [11, 22, 33, 44], 10);
    let collector = LinuxProcessCollector::with_root(dir.path());
    let sample = collector.read_cpu_sample(100).unwrap();
    assert_eq!(sample.utime, 11);
    assert_eq!(sample.stime, 22);
    assert_eq!(sample.cutime, 33);
    assert_eq!(sample.cstime, 44);
    assert_eq!(sample.self_ticks(), 33);
    assert_eq!(sample.children_ticks(), 77);
    assert_eq!(sample.total_ticks(), 110);
}

#[test]
fn test_truncated_stat_is_malformed() {
    let dir = tempdir().unwrap();
    let proc_dir = dir.path().join("100");
    fs::create_dir_all(&proc_dir).unwrap();
    fs::write(proc_dir.join("stat"), "100 (short) S 1 100 100 0\n").unwrap();
    fs::write(proc_dir.join("statm"), "garbage\n").unwrap();
    let collector = LinuxProcessCollector::with_root(dir.path());

    assert!(matches!(
        collector.read_cpu_sample(100),
        Err(SampleError::Malformed { file: "stat", .. })
    ));
    assert!(matches!(
        collector.read_mem_sample(100),
        Err(SampleError::Malformed { file: "statm", .. })
    ));
}

#[test]
fn test_mem_sample_reads_statm_and_smaps_rollup() {
    let dir = tempdir().unwrap();
    write_process(dir.path(), 100, b"app\0", "app", [0; 4], 10);
    let rollup = "55d0c0000000-7ffd00000000 ---p 00000000 00:00 0 [rollup]\n\
                  Rss:                 400 kB\n\
                  Pss:                 250 kB\n\
                  Private_Clean:        40 kB\n\
                  Private_Dirty:       160 kB\n";
    fs::write(dir.path().join("100/smaps_rollup"), rollup).unwrap();
    let collector = LinuxProcessCollector::with_root(dir.path());

    let mem = collector.read_mem_sample(100).unwrap();
    assert_eq!(mem.total_pages, 150);
    assert_eq!(mem.resident_pages, 100);
    assert_eq!(mem.pss_kb, Some(250));
    assert_eq!(mem.uss_kb, Some(200));
}

#[test]
fn test_mem_sample_without_smaps_rollup() {
    let dir = tempdir().unwrap();
    write_process(dir.path(), 100, b"app\0", "app", [0; 4], 10);
    let collector = LinuxProcessCollector::with_root(dir.path());
    let mem = collector.read_mem_sample(100).unwrap();
    assert_eq!(mem.pss_kb, None);
    assert_eq!(mem.uss_kb, None);
}

#[test]
fn test_uptime_from_alternate_root() {
    let dir = tempdir().unwrap();
    let collector = LinuxProcessCollector::with_root(dir.path());
    assert_eq!(collector.uptime_seconds(), None);

    fs::write(dir.path().join("uptime"), "12345.67 54321.00\n").unwrap();
    assert_eq!(collector.uptime_seconds(), Some(12345.67));
}
