//! Derived CPU and memory metrics

use crate::collector::{CpuSample, MemSample};

/// Memory figures for one sample. `None` means the value could not be derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryMetrics {
    pub resident_bytes: u64,
    /// Non-resident portion of the address space.
    pub virtual_bytes: u64,
    pub total_bytes: Option<u64>,
    pub pss_bytes: Option<u64>,
    pub uss_bytes: Option<u64>,
    pub percentage: Option<f64>,
}

/// Lifetime-average CPU usage: ticks consumed by the process and its reaped
/// children over ticks elapsed since boot, as a percentage.
pub fn cpu_percentage(sample: &CpuSample, uptime_seconds: Option<f64>, ticks_per_second: u64) -> Option<f64> {
    let uptime = uptime_seconds.filter(|u| u.is_finite() && *u > 0.0)?;
    if ticks_per_second == 0 {
        return None;
    }
    let system_ticks = ticks_per_second as f64 * uptime;
    Some(sample.total_ticks() as f64 / system_ticks * 100.0)
}

pub fn memory_metrics(sample: &MemSample, page_size: u64, physical_pages: Option<u64>) -> MemoryMetrics {
    let resident_bytes = sample.resident_pages * page_size;
    let virtual_bytes = sample.total_pages.saturating_sub(sample.resident_pages) * page_size;
    let total_bytes = physical_pages.filter(|p| *p > 0).map(|p| p * page_size);
    let percentage = total_bytes.map(|total| resident_bytes as f64 / total as f64 * 100.0);

    MemoryMetrics {
        resident_bytes,
        virtual_bytes,
        total_bytes,
        pss_bytes: sample.pss_kb.map(|kb| kb * 1024),
        uss_bytes: sample.uss_kb.map(|kb| kb * 1024),
        percentage,
    }
}
