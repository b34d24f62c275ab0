//! Process lookup and raw counter sampling (reads /proc on Linux)

pub mod linux;

pub use linux::LinuxProcessCollector;

use crate::error::SampleError;
use std::str::FromStr;

/// Cumulative CPU ticks for one process, straight from its stat record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSample {
    pub utime: u64,
    pub stime: u64,
    pub cutime: u64,
    pub cstime: u64,
}

impl CpuSample {
    pub fn self_ticks(&self) -> u64 {
        self.utime + self.stime
    }

    pub fn children_ticks(&self) -> u64 {
        self.cutime + self.cstime
    }

    pub fn total_ticks(&self) -> u64 {
        self.self_ticks() + self.children_ticks()
    }
}

/// Page counts for one process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemSample {
    pub total_pages: u64,
    pub resident_pages: u64,
    /// Proportional set size in kB, when smaps_rollup is readable.
    pub pss_kb: Option<u64>,
    /// Private_Clean + Private_Dirty in kB, when smaps_rollup is readable.
    pub uss_kb: Option<u64>,
}

/// Which process wins when several live processes share a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// First match in /proc enumeration order.
    #[default]
    First,
    /// Match with the latest start time.
    Newest,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(DuplicatePolicy::First),
            "newest" => Ok(DuplicatePolicy::Newest),
            other => Err(other.to_string()),
        }
    }
}

pub trait ProcessLocator: Send + Sync {
    /// Resolve a process name to a live pid. Unreadable candidates count as non-matches.
    fn locate(&self, name: &str) -> Option<u32>;
}

pub trait SampleReader: Send + Sync {
    fn read_cpu_sample(&self, pid: u32) -> Result<CpuSample, SampleError>;
    fn read_mem_sample(&self, pid: u32) -> Result<MemSample, SampleError>;
}

/// Read-only system-wide constants and counters.
pub trait SystemInfo: Send + Sync {
    fn uptime_seconds(&self) -> Option<f64>;
    fn clock_ticks(&self) -> u64;
    fn page_size(&self) -> u64;
    fn physical_pages(&self) -> Option<u64>;
}

/// Everything a monitor loop needs from the OS.
pub trait ProcessSource: ProcessLocator + SampleReader + SystemInfo {}

impl<T: ProcessLocator + SampleReader + SystemInfo> ProcessSource for T {}
