use serde::{Deserialize, Serialize};

use crate::workbook::SheetNames;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    /// SQLite file backing the workbook. `~` expands to the home directory.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub sheets: SheetNames,
    #[serde(default = "default_duplicate_window")]
    pub duplicate_window_secs: u64,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
    #[serde(default = "default_requested_by")]
    pub requested_by: String,
    #[serde(default = "default_notes")]
    pub notes: String,
    #[serde(default)]
    pub sweep: SweepConfig,
}

fn default_duplicate_window() -> u64 {
    10
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_lock_timeout() -> u64 {
    5000
}

fn default_requested_by() -> String {
    "external-trigger".to_string()
}

fn default_notes() -> String {
    "auto-generated".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database: None,
            sheets: SheetNames::default(),
            duplicate_window_secs: default_duplicate_window(),
            worker_count: default_worker_count(),
            lock_timeout_ms: default_lock_timeout(),
            requested_by: default_requested_by(),
            notes: default_notes(),
            sweep: SweepConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
    /// How often a lock-timeout ERROR row is picked up again. 0 keeps every
    /// ERROR terminal.
    #[serde(default)]
    pub max_error_retries: u32,
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_sweep_interval(),
            max_error_retries: 0,
        }
    }
}
