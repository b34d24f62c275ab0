//! Scripted stand-in for /proc used by the monitor tests

#![allow(dead_code)]

use procwatch_daemon::collector::{CpuSample, MemSample, ProcessLocator, SampleReader, SystemInfo};
use procwatch_daemon::error::SampleError;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct ScriptedSource {
    script: Mutex<VecDeque<Option<u32>>>,
    last: Mutex<Option<u32>>,
    pub cpu: CpuSample,
    pub mem: MemSample,
    pub fail_reads: bool,
    pub uptime: Option<f64>,
}

impl ScriptedSource {
    /// Each `locate` call pops the next result; the last one repeats once the script runs out.
    pub fn new(script: &[Option<u32>]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            last: Mutex::new(None),
            cpu: CpuSample { utime: 100, stime: 50, cutime: 30, cstime: 20 },
            mem: MemSample { total_pages: 150, resident_pages: 100, pss_kb: Some(300), uss_kb: None },
            fail_reads: false,
            uptime: Some(10.0),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_reads = true;
        self
    }
}

impl ProcessLocator for ScriptedSource {
    fn locate(&self, _name: &str) -> Option<u32> {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = next;
        }
        *last
    }
}

impl SampleReader for ScriptedSource {
    fn read_cpu_sample(&self, pid: u32) -> Result<CpuSample, SampleError> {
        if self.fail_reads {
            return Err(SampleError::ProcessGone { pid });
        }
        Ok(self.cpu)
    }

    fn read_mem_sample(&self, pid: u32) -> Result<MemSample, SampleError> {
        if self.fail_reads {
            return Err(SampleError::ProcessGone { pid });
        }
        Ok(self.mem)
    }
}

impl SystemInfo for ScriptedSource {
    fn uptime_seconds(&self) -> Option<f64> {
        self.uptime
    }

    fn clock_ticks(&self) -> u64 {
        100
    }

    fn page_size(&self) -> u64 {
        4096
    }

    fn physical_pages(&self) -> Option<u64> {
        Some(1_000_000)
    }
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
