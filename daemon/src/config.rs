//! Configuration management (TOML)

use crate::collector::DuplicatePolicy;
use crate::error::ConfigError;
use crate::monitor::MonitorSettings;
use crate::writer::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub processes: Vec<String>,
    pub output_dir: PathBuf,
    pub cpu_interval: u32,
    pub mem_interval: u32,
    pub format: String,
    pub duplicate_policy: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            processes: vec![],
            output_dir: PathBuf::from("."),
            cpu_interval: 1,
            mem_interval: 5,
            format: "csv".to_string(),
            duplicate_policy: "first".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "procwatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn format(&self) -> Result<OutputFormat, ConfigError> {
        self.monitor.format.parse()
    }

    pub fn duplicate_policy(&self) -> Result<DuplicatePolicy, ConfigError> {
        self.monitor
            .duplicate_policy
            .parse()
            .map_err(ConfigError::InvalidPolicy)
    }

    /// Check everything that must hold before any monitor starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.processes.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        let mut seen = HashSet::new();
        for name in &self.monitor.processes {
            if name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            // matched against the cmdline base name, and used in log file names
            if name.contains('/') || name == "." || name == ".." {
                return Err(ConfigError::InvalidName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName(name.clone()));
            }
        }
        if self.monitor.cpu_interval == 0 {
            return Err(ConfigError::InvalidInterval { name: "cpu" });
        }
        if self.monitor.mem_interval == 0 {
            return Err(ConfigError::InvalidInterval { name: "memory" });
        }
        self.format()?;
        self.duplicate_policy()?;
        if !is_writable_dir(&self.monitor.output_dir) {
            return Err(ConfigError::Unwritable(self.monitor.output_dir.clone()));
        }
        Ok(())
    }

    pub fn monitor_settings(&self) -> Result<MonitorSettings, ConfigError> {
        self.validate()?;
        Ok(MonitorSettings {
            cpu_interval: self.monitor.cpu_interval,
            mem_interval: self.monitor.mem_interval,
            output_dir: self.monitor.output_dir.clone(),
            format: self.format()?,
        })
    }
}

fn is_writable_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}
