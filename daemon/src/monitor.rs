//! Per-target sampling loop with restart detection

use crate::collector::ProcessSource;
use crate::metrics::{cpu_percentage, memory_metrics};
use crate::writer::{CpuRecord, FoundRecord, MemRecord, OutputFormat, RestartRecord, TargetLogs};
use chrono::{DateTime, Local};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;
use tokio::task::block_in_place;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const CYCLE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Cycles between CPU samples.
    pub cpu_interval: u32,
    /// Cycles between memory samples.
    pub mem_interval: u32,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            cpu_interval: 1,
            mem_interval: 5,
            output_dir: PathBuf::from("."),
            format: OutputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not found since the monitor started.
    Searching,
    Tracking,
}

/// Mutable state of one monitored target, owned by its task.
#[derive(Debug, Clone)]
pub struct TargetState {
    pub name: String,
    pub pid: Option<u32>,
    /// Stamped on every sample row until the next identity change.
    pub last_change: DateTime<Local>,
    pub phase: Phase,
    pub cycles: u64,
    cpu_counter: u32,
    mem_counter: u32,
}

impl TargetState {
    fn new(name: &str, pid: Option<u32>, now: DateTime<Local>) -> Self {
        Self {
            name: name.to_string(),
            pid,
            last_change: now,
            phase: if pid.is_some() { Phase::Tracking } else { Phase::Searching },
            cycles: 0,
            cpu_counter: 0,
            mem_counter: 0,
        }
    }

    pub fn cpu_counter(&self) -> u32 {
        self.cpu_counter
    }

    pub fn mem_counter(&self) -> u32 {
        self.mem_counter
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub restarted: bool,
    pub cpu_written: bool,
    pub mem_written: bool,
    pub found: bool,
}

pub struct ProcessMonitor<S> {
    state: TargetState,
    settings: MonitorSettings,
    source: Arc<S>,
    logs: TargetLogs,
}

impl<S: ProcessSource> ProcessMonitor<S> {
    /// Open the target's logs and perform the initial lookup.
    pub fn new(name: &str, settings: MonitorSettings, source: Arc<S>, now: DateTime<Local>) -> io::Result<Self> {
        let logs = TargetLogs::create(&settings.output_dir, name, settings.format)?;
        let pid = source.locate(name);
        match pid {
            Some(pid) => info!("Process {} found with pid {}", name, pid),
            None => error!("Process {} not found", name),
        }
        Ok(Self {
            state: TargetState::new(name, pid, now),
            settings,
            source,
            logs,
        })
    }

    pub fn state(&self) -> &TargetState {
        &self.state
    }

    pub fn logs(&self) -> &TargetLogs {
        &self.logs
    }

    /// Run one cycle.
    pub fn step(&mut self, now: DateTime<Local>) -> CycleReport {
        let mut report = CycleReport::default();
        self.state.cycles += 1;

        let resolved = self.source.locate(&self.state.name);
        if resolved != self.state.pid {
            info!(
                "PID changed for process {}: {:?} -> {:?}",
                self.state.name, self.state.pid, resolved
            );
            self.state.pid = resolved;
            self.state.last_change = now;
            let record = RestartRecord::new(&now, resolved);
            if let Err(e) = self.logs.restarts.append(&record) {
                error!("Failed to write restart record for {}: {}", self.state.name, e);
            }
            report.restarted = true;
        } else if resolved.is_none() {
            warn!("Process {} not found", self.state.name);
        }

        self.state.cpu_counter += 1;
        if self.state.cpu_counter >= self.settings.cpu_interval {
            report.cpu_written = self.sample_cpu();
            self.state.cpu_counter = 0;
        }

        self.state.mem_counter += 1;
        if self.state.mem_counter >= self.settings.mem_interval {
            report.mem_written = self.sample_mem();
            self.state.mem_counter = 0;
        }

        if self.state.phase == Phase::Searching {
            // Deliberately reuses the lookup from the top of this cycle rather than
            // scanning /proc a second time.
            if let Some(pid) = self.state.pid {
                self.state.last_change = now;
                let marker = FoundRecord::new(&now, pid);
                for log in [&mut self.logs.cpu, &mut self.logs.mem] {
                    if let Err(e) = log.append(&marker) {
                        error!("Failed to write FOUND marker to {:?}: {}", log.path(), e);
                    }
                }
                info!("Process {} found with pid {}", self.state.name, pid);
                self.state.phase = Phase::Tracking;
                report.found = true;
            }
        }

        report
    }

    fn sample_cpu(&mut self) -> bool {
        let Some(pid) = self.state.pid else {
            error!("Failed to read CPU usage for process {}", self.state.name);
            return false;
        };
        let sample = match self.source.read_cpu_sample(pid) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Skipping CPU sample for {}: {}", self.state.name, e);
                return false;
            }
        };
        let percentage = cpu_percentage(&sample, self.source.uptime_seconds(), self.source.clock_ticks());
        if percentage.is_none() {
            debug!("CPU usage unavailable for {}", self.state.name);
        }
        let record = CpuRecord::new(&self.state.last_change, pid, percentage);
        match self.logs.cpu.append(&record) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to write CPU record for {}: {}", self.state.name, e);
                false
            }
        }
    }

    fn sample_mem(&mut self) -> bool {
        let Some(pid) = self.state.pid else {
            error!("Failed to read memory usage for process {}", self.state.name);
            return false;
        };
        let sample = match self.source.read_mem_sample(pid) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Skipping memory sample for {}: {}", self.state.name, e);
                return false;
            }
        };
        let metrics = memory_metrics(&sample, self.source.page_size(), self.source.physical_pages());
        let record = MemRecord::new(&self.state.last_change, pid, &metrics);
        match self.logs.mem.append(&record) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to write memory record for {}: {}", self.state.name, e);
                false
            }
        }
    }

    /// `step` blocks on /proc reads and fsync; on a multi-threaded runtime keep
    /// that off the worker so other targets' ticks are not delayed.
    fn step_off_worker(&mut self, now: DateTime<Local>) -> CycleReport {
        match Handle::current().runtime_flavor() {
            RuntimeFlavor::MultiThread => block_in_place(|| self.step(now)),
            _ => self.step(now),
        }
    }

    /// Step once per cycle until `shutdown` flips to true or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> TargetState {
        let mut ticker = interval(CYCLE_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.step_off_worker(Local::now());
                }
            }
        }

        debug!("Monitor for {} stopped after {} cycles", self.state.name, self.state.cycles);
        self.state
    }
}
