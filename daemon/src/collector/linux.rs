use super::{CpuSample, DuplicatePolicy, MemSample, ProcessLocator, SampleReader, SystemInfo};
use crate::error::SampleError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

// Field positions in /proc/<pid>/stat, counted from the state field (field 3).
const STAT_UTIME: usize = 11;
const STAT_STIME: usize = 12;
const STAT_CUTIME: usize = 13;
const STAT_CSTIME: usize = 14;
const STAT_STARTTIME: usize = 19;

pub struct LinuxProcessCollector {
    proc_root: PathBuf,
    page_size: u64,
    clock_ticks: u64,
    physical_pages: Option<u64>,
    policy: DuplicatePolicy,
}

impl LinuxProcessCollector {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Collector reading from an alternate proc mount.
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let clock_ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        let phys_pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
        Self {
            proc_root: proc_root.into(),
            page_size: if page_size > 0 { page_size as u64 } else { 4096 },
            clock_ticks: if clock_ticks > 0 { clock_ticks as u64 } else { 100 },
            physical_pages: (phys_pages > 0).then_some(phys_pages as u64),
            policy: DuplicatePolicy::First,
        }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn pid_dir(&self, pid: u32) -> PathBuf {
        self.proc_root.join(pid.to_string())
    }

    /// Base name of the first cmdline token, or None if unreadable.
    fn command_name(&self, pid: u32) -> Option<String> {
        let raw = fs::read(self.pid_dir(pid).join("cmdline")).ok()?;
        let first = raw.split(|b| *b == 0).next().unwrap_or_default();
        let first = String::from_utf8_lossy(first);
        let base = match first.rfind('/') {
            Some(pos) => &first[pos + 1..],
            None => &first[..],
        };
        Some(base.to_string())
    }

    fn read_stat_fields(&self, pid: u32) -> Result<Vec<String>, SampleError> {
        let path = self.pid_dir(pid).join("stat");
        let content = read_proc_file(pid, &path)?;
        // comm may contain spaces and parens; the fixed fields start after the last ')'
        let rest = match content.rfind(')') {
            Some(pos) => &content[pos + 1..],
            None => return Err(SampleError::malformed(pid, "stat", "missing command name")),
        };
        Ok(rest.split_whitespace().map(str::to_string).collect())
    }

    fn start_time(&self, pid: u32) -> Option<u64> {
        let fields = self.read_stat_fields(pid).ok()?;
        fields.get(STAT_STARTTIME)?.parse().ok()
    }

    fn live_pids(&self) -> Vec<u32> {
        let mut pids = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.proc_root) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(pid) = name.parse::<u32>() {
                        if pid != 0 {
                            pids.push(pid);
                        }
                    }
                }
            }
        }
        pids
    }

    fn read_smaps_rollup(&self, pid: u32) -> (Option<u64>, Option<u64>) {
        let content = match fs::read_to_string(self.pid_dir(pid).join("smaps_rollup")) {
            Ok(content) => content,
            Err(_) => return (None, None),
        };
        let mut pss = None;
        let mut private_clean = None;
        let mut private_dirty = None;
        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let value = value.parse::<u64>().ok();
            match key {
                "Pss:" => pss = value,
                "Private_Clean:" => private_clean = value,
                "Private_Dirty:" => private_dirty = value,
                _ => {}
            }
        }
        let uss = match (private_clean, private_dirty) {
            (Some(clean), Some(dirty)) => Some(clean + dirty),
            _ => None,
        };
        (pss, uss)
    }
}

impl Default for LinuxProcessCollector {
    fn default() -> Self { Self::new() }
}

impl ProcessLocator for LinuxProcessCollector {
    fn locate(&self, name: &str) -> Option<u32> {
        let mut matches = self
            .live_pids()
            .into_iter()
            .filter(|pid| self.command_name(*pid).as_deref() == Some(name));

        match self.policy {
            DuplicatePolicy::First => matches.next(),
            DuplicatePolicy::Newest => matches
                .filter_map(|pid| self.start_time(pid).map(|start| (start, pid)))
                .max_by_key(|(start, _)| *start)
                .map(|(_, pid)| pid),
        }
    }
}

impl SampleReader for LinuxProcessCollector {
    fn read_cpu_sample(&self, pid: u32) -> Result<CpuSample, SampleError> {
        let fields = self.read_stat_fields(pid)?;
        if fields.len() <= STAT_CSTIME {
            return Err(SampleError::malformed(
                pid,
                "stat",
                format!("expected at least {} fields, got {}", STAT_CSTIME + 3, fields.len() + 2),
            ));
        }
        let field = |idx: usize| -> Result<u64, SampleError> {
            fields[idx]
                .parse()
                .map_err(|_| SampleError::malformed(pid, "stat", format!("bad tick count {:?}", fields[idx])))
        };
        Ok(CpuSample {
            utime: field(STAT_UTIME)?,
            stime: field(STAT_STIME)?,
            cutime: field(STAT_CUTIME)?,
            cstime: field(STAT_CSTIME)?,
        })
    }

    fn read_mem_sample(&self, pid: u32) -> Result<MemSample, SampleError> {
        let path = self.pid_dir(pid).join("statm");
        let content = read_proc_file(pid, &path)?;
        let mut parts = content.split_whitespace();
        let mut next_pages = |what: &str| -> Result<u64, SampleError> {
            parts
                .next()
                .ok_or_else(|| SampleError::malformed(pid, "statm", format!("missing {} pages", what)))?
                .parse()
                .map_err(|_| SampleError::malformed(pid, "statm", format!("bad {} pages", what)))
        };
        let total_pages = next_pages("total")?;
        let resident_pages = next_pages("resident")?;
        let (pss_kb, uss_kb) = self.read_smaps_rollup(pid);
        trace!(pid, total_pages, resident_pages, "read statm");
        Ok(MemSample { total_pages, resident_pages, pss_kb, uss_kb })
    }
}

impl SystemInfo for LinuxProcessCollector {
    fn uptime_seconds(&self) -> Option<f64> {
        let content = fs::read_to_string(self.proc_root.join("uptime")).ok()?;
        content.split_whitespace().next()?.parse().ok()
    }

    fn clock_ticks(&self) -> u64 {
        self.clock_ticks
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }

    fn physical_pages(&self) -> Option<u64> {
        self.physical_pages
    }
}

fn read_proc_file(pid: u32, path: &Path) -> Result<String, SampleError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SampleError::ProcessGone { pid },
        _ => SampleError::Io { path: path.to_path_buf(), source: e },
    })
}
