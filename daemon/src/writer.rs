//! Append-only per-target log files in CSV or JSON-lines form

use crate::error::ConfigError;
use crate::metrics::MemoryMetrics;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Written in place of a value that could not be derived.
pub const UNAVAILABLE: i64 = -1;

/// ctime-style, independent of the process locale.
pub const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

pub const RESTART_REASON: &str = "RESTARTED";
pub const FOUND_EVENT: &str = "FOUND";

pub const CPU_COLUMNS: &[&str] = &["Timestamp", "PID", "Value"];
pub const MEM_COLUMNS: &[&str] = &[
    "Timestamp",
    "PID",
    "RSS Memory",
    "Virtual Memory",
    "Total Memory",
    "PSS Memory",
    "USS Memory",
    "Memory Percentage",
];
pub const RESTART_COLUMNS: &[&str] = &["Timestamp", "PID", "Reason"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Cpu,
    Memory,
    Restarts,
}

impl LogKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            LogKind::Cpu => "cpu",
            LogKind::Memory => "mem",
            LogKind::Restarts => "restarts",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            LogKind::Cpu => CPU_COLUMNS,
            LogKind::Memory => MEM_COLUMNS,
            LogKind::Restarts => RESTART_COLUMNS,
        }
    }
}

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn pid_field(pid: Option<u32>) -> i64 {
    pid.map(i64::from).unwrap_or(UNAVAILABLE)
}

fn bytes_field(bytes: Option<u64>) -> i64 {
    bytes.and_then(|b| i64::try_from(b).ok()).unwrap_or(UNAVAILABLE)
}

/// A single log line. JSON keys follow the header column names.
pub trait Record: Serialize {
    fn csv_fields(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "PID")]
    pub pid: i64,
    #[serde(rename = "Value")]
    pub value: f64,
}

impl CpuRecord {
    pub fn new(ts: &DateTime<Local>, pid: u32, percentage: Option<f64>) -> Self {
        Self {
            timestamp: format_timestamp(ts),
            pid: i64::from(pid),
            value: percentage.unwrap_or(UNAVAILABLE as f64),
        }
    }
}

impl Record for CpuRecord {
    fn csv_fields(&self) -> Vec<String> {
        vec![self.timestamp.clone(), self.pid.to_string(), self.value.to_string()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "PID")]
    pub pid: i64,
    #[serde(rename = "RSS Memory")]
    pub rss: i64,
    #[serde(rename = "Virtual Memory")]
    pub virtual_memory: i64,
    #[serde(rename = "Total Memory")]
    pub total: i64,
    #[serde(rename = "PSS Memory")]
    pub pss: i64,
    #[serde(rename = "USS Memory")]
    pub uss: i64,
    #[serde(rename = "Memory Percentage")]
    pub percentage: f64,
}

impl MemRecord {
    pub fn new(ts: &DateTime<Local>, pid: u32, metrics: &MemoryMetrics) -> Self {
        Self {
            timestamp: format_timestamp(ts),
            pid: i64::from(pid),
            rss: bytes_field(Some(metrics.resident_bytes)),
            virtual_memory: bytes_field(Some(metrics.virtual_bytes)),
            total: bytes_field(metrics.total_bytes),
            pss: bytes_field(metrics.pss_bytes),
            uss: bytes_field(metrics.uss_bytes),
            percentage: metrics.percentage.unwrap_or(UNAVAILABLE as f64),
        }
    }
}

impl Record for MemRecord {
    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.pid.to_string(),
            self.rss.to_string(),
            self.virtual_memory.to_string(),
            self.total.to_string(),
            self.pss.to_string(),
            self.uss.to_string(),
            self.percentage.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "PID")]
    pub pid: i64,
    #[serde(rename = "Reason")]
    pub reason: String,
}

impl RestartRecord {
    pub fn new(ts: &DateTime<Local>, pid: Option<u32>) -> Self {
        Self {
            timestamp: format_timestamp(ts),
            pid: pid_field(pid),
            reason: RESTART_REASON.to_string(),
        }
    }
}

impl Record for RestartRecord {
    fn csv_fields(&self) -> Vec<String> {
        vec![self.timestamp.clone(), self.pid.to_string(), self.reason.clone()]
    }
}

/// Marker written to the CPU and memory logs when a target is first found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "PID")]
    pub pid: i64,
    #[serde(rename = "Event")]
    pub event: String,
}

impl FoundRecord {
    pub fn new(ts: &DateTime<Local>, pid: u32) -> Self {
        Self {
            timestamp: format_timestamp(ts),
            pid: i64::from(pid),
            event: FOUND_EVENT.to_string(),
        }
    }
}

impl Record for FoundRecord {
    fn csv_fields(&self) -> Vec<String> {
        vec![self.timestamp.clone(), self.pid.to_string(), self.event.clone()]
    }
}

pub fn render_line<R: Record>(record: &R, format: OutputFormat) -> io::Result<String> {
    let mut line = match format {
        OutputFormat::Csv => record.csv_fields().join(","),
        OutputFormat::Json => serde_json::to_string(record)?,
    };
    line.push('\n');
    Ok(line)
}

pub fn render_header(columns: &[&str], format: OutputFormat) -> io::Result<String> {
    let mut line = match format {
        OutputFormat::Csv => columns.join(","),
        OutputFormat::Json => serde_json::to_string(&serde_json::json!({ "columns": columns }))?,
    };
    line.push('\n');
    Ok(line)
}

/// One open log file. Every write reaches the disk before returning.
pub struct LogFile {
    path: PathBuf,
    file: File,
    format: OutputFormat,
}

impl LogFile {
    /// Create (truncating) `<dir>/<target>_<kind>.<ext>` and write its header.
    pub fn create(dir: &Path, target: &str, kind: LogKind, format: OutputFormat) -> io::Result<Self> {
        let path = dir.join(format!("{}_{}.{}", target, kind.suffix(), format.extension()));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut log = Self { path, file, format };
        let header = render_header(kind.columns(), format)?;
        log.write_synced(&header)?;
        Ok(log)
    }

    pub fn append<R: Record>(&mut self, record: &R) -> io::Result<()> {
        let line = render_line(record, self.format)?;
        self.write_synced(&line)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_synced(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

/// The three logs owned by one monitored target.
pub struct TargetLogs {
    pub cpu: LogFile,
    pub mem: LogFile,
    pub restarts: LogFile,
}

impl TargetLogs {
    pub fn create(dir: &Path, target: &str, format: OutputFormat) -> io::Result<Self> {
        Ok(Self {
            cpu: LogFile::create(dir, target, LogKind::Cpu, format)?,
            mem: LogFile::create(dir, target, LogKind::Memory, format)?,
            restarts: LogFile::create(dir, target, LogKind::Restarts, format)?,
        })
    }
}
