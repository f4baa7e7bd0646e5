use std::time::Duration;

use crate::config::Config;
use crate::workbook::SheetNames;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sheets: SheetNames,
    pub duplicate_window_secs: u64,
    pub lock_timeout: Duration,
    pub requested_by: String,
    pub notes: String,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sheets: config.sheets.clone(),
            duplicate_window_secs: config.duplicate_window_secs,
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            requested_by: config.requested_by.clone(),
            notes: config.notes.clone(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
