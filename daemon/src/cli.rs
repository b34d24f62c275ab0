//! Command-line flags, layered over the config file

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Log CPU and memory usage of named processes")]
pub struct Cli {
    /// Process name to monitor; repeat for several.
    #[arg(short = 'p', long = "process")]
    pub processes: Vec<String>,

    #[arg(short = 'd', long)]
    pub output_dir: Option<PathBuf>,

    /// Seconds between CPU samples.
    #[arg(short = 'c', long)]
    pub cpu_interval: Option<u32>,

    /// Seconds between memory samples.
    #[arg(short = 'm', long)]
    pub mem_interval: Option<u32>,

    /// Output format: csv or json.
    #[arg(short = 'f', long)]
    pub format: Option<String>,

    /// Which pid wins when names collide: first or newest.
    #[arg(long)]
    pub duplicate_policy: Option<String>,

    #[arg(long)]
    pub log_level: Option<String>,

    /// Config file; defaults to the per-user config path when present.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Flags given on the command line replace the file's values.
    pub fn apply(&self, config: &mut Config) {
        if !self.processes.is_empty() {
            config.monitor.processes = self.processes.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.monitor.output_dir = dir.clone();
        }
        if let Some(secs) = self.cpu_interval {
            config.monitor.cpu_interval = secs;
        }
        if let Some(secs) = self.mem_interval {
            config.monitor.mem_interval = secs;
        }
        if let Some(format) = &self.format {
            config.monitor.format = format.clone();
        }
        if let Some(policy) = &self.duplicate_policy {
            config.monitor.duplicate_policy = policy.clone();
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
    }
}
