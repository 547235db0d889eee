use accounting::{AccountingPolicy, ThresholdPolicy, TrafficMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Day of month the period rolls over, clamped to 1..=28
    #[serde(default = "default_monthly_reset_day")]
    pub monthly_reset_day: i32,

    #[serde(default = "default_network_interface")]
    pub network_interface: String,

    /// in, out, max or both
    #[serde(default)]
    pub traffic_mode: TrafficMode,

    #[serde(default = "default_warning_threshold_gb")]
    pub warning_threshold_gb: f64,

    #[serde(default = "default_check_interval_seconds")]
    pub check_interval_seconds: u64,

    /// Directory holding traffic_stats.json
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Leave empty to only log notifications
    #[serde(default)]
    pub telegram_bot_token: String,

    #[serde(default)]
    pub telegram_chat_ids: Vec<i64>,

    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Power the host off once the warning threshold is reached
    #[serde(default)]
    pub shutdown_on_warning: bool,

    #[serde(default = "default_shutdown_command")]
    pub shutdown_command: Vec<String>,

    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,

    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log directory for file-based logging, stdout when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log file name for file-based logging
    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_monthly_reset_day() -> i32 {
    1
}

fn default_network_interface() -> String {
    "eth0".to_string()
}

fn default_warning_threshold_gb() -> f64 {
    1000.0
}

fn default_check_interval_seconds() -> u64 {
    300
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_server_name() -> String {
    "MyServer".to_string()
}

fn default_shutdown_command() -> Vec<String> {
    vec!["shutdown".to_string(), "-h".to_string(), "now".to_string()]
}

fn default_notify_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "trafficwatch.log".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monthly_reset_day: default_monthly_reset_day(),
            network_interface: default_network_interface(),
            traffic_mode: TrafficMode::default(),
            warning_threshold_gb: default_warning_threshold_gb(),
            check_interval_seconds: default_check_interval_seconds(),
            data_dir: default_data_dir(),
            telegram_bot_token: String::new(),
            telegram_chat_ids: Vec::new(),
            server_name: default_server_name(),
            shutdown_on_warning: false,
            shutdown_command: default_shutdown_command(),
            notify_timeout_secs: default_notify_timeout_secs(),
            log_level: default_log_level(),
            log_dir: None,
            log_file: default_log_file(),
            log_format: LogFormat::default(),
        }
    }
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: MonitorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Loads `path`, writing a default configuration there first if the file
    /// does not exist yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "check_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if !self.warning_threshold_gb.is_finite() || self.warning_threshold_gb < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "warning_threshold_gb must be a non-negative number, got {}",
                self.warning_threshold_gb
            )));
        }
        if self.network_interface.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "network_interface must not be empty".to_string(),
            ));
        }
        if self.shutdown_on_warning && self.shutdown_command.is_empty() {
            return Err(ConfigError::Invalid(
                "shutdown_command must not be empty when shutdown_on_warning is set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn accounting_policy(&self) -> AccountingPolicy {
        AccountingPolicy {
            reset_day: self.monthly_reset_day,
            threshold: ThresholdPolicy::new(self.traffic_mode, self.warning_threshold_gb),
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}
