//! Startup settings for the sequencer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::sequencing::{notes, STEPS_PER_BAR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[cfg(feature = "serde")]
    #[error("config is not valid JSON")]
    Parse(#[from] serde_json::Error),
    #[error("step count must be a positive multiple of 16, got {0}")]
    Steps(usize),
    #[error("at least one row is required")]
    NoRows,
    #[error("row '{0}' is not a pitch")]
    BadRow(String),
    #[error("row '{0}' appears more than once")]
    DuplicateRow(String),
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    pub steps: usize,
    /// Pitch labels, top row first
    pub rows: Vec<String>,
    pub tempo_bpm: f64,
    pub swing_percent: f64,
    /// Settle time before a fresh transport start
    pub start_delay_ms: u64,
    pub export_dir: PathBuf,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            steps: 32,
            rows: notes::default_rows(),
            tempo_bpm: crate::project::DEFAULT_TEMPO_BPM,
            swing_percent: 0.0,
            start_delay_ms: 50,
            export_dir: PathBuf::from("."),
        }
    }
}

impl SequencerConfig {
    /// Read `path`, falling back to defaults when the file does not exist
    #[cfg(feature = "serde")]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Self::from_json(&data)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps == 0 || self.steps % STEPS_PER_BAR != 0 {
            return Err(ConfigError::Steps(self.steps));
        }
        if self.rows.is_empty() {
            return Err(ConfigError::NoRows);
        }
        let mut seen = HashSet::new();
        for row in &self.rows {
            let key = notes::note_number(row).ok_or_else(|| ConfigError::BadRow(row.clone()))?;
            if !seen.insert(key) {
                return Err(ConfigError::DuplicateRow(row.clone()));
            }
        }
        if !self.tempo_bpm.is_finite() {
            return Err(ConfigError::NotFinite("tempo"));
        }
        if !self.swing_percent.is_finite() {
            return Err(ConfigError::NotFinite("swing"));
        }
        Ok(())
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}
