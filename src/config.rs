//! Processor configuration
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Files are TOML or JSON, chosen by extension.

use crate::aggregator::StandHoursZero;
use crate::catalog::CanonicalMetric;
use crate::error::ComputeError;
use crate::features::RingGoals;
use crate::timezone::LocalZone;
use crate::trend::{DEFAULT_TRACKED, DEFAULT_TREND_WINDOW};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config files looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["healthsync.toml", "healthsync.json"];

/// Largest accepted trend window, in days
pub const MAX_TREND_WINDOW: usize = 3660;

/// Settings for one processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Zone that defines calendar days and clock hours
    pub timezone: LocalZone,
    /// Rolling-average window in days
    pub trend_window: usize,
    /// Metrics included in the chart time series
    pub tracked: Vec<CanonicalMetric>,
    pub stand_hours_zero: StandHoursZero,
    pub ring_goals: RingGoals,
    /// Only exports ingested within this many days are used; all when unset.
    /// Windowing is left to the caller, see `ExportWindow::default()` for 365 days.
    pub window_days: Option<u32>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            timezone: LocalZone::default(),
            trend_window: DEFAULT_TREND_WINDOW,
            tracked: DEFAULT_TRACKED.to_vec(),
            stand_hours_zero: StandHoursZero::default(),
            ring_goals: RingGoals::default(),
            window_days: None,
        }
    }
}

impl ProcessorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ComputeError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ComputeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ComputeError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ComputeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let parse: fn(&str) -> Result<Self, ComputeError> =
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => Self::from_toml_str,
                Some("json") => Self::from_json_str,
                Some(ext) => {
                    return Err(ComputeError::InvalidConfig(format!(
                        "unsupported config extension: {ext}"
                    )))
                }
                None => {
                    return Err(ComputeError::InvalidConfig(format!(
                        "config file has no extension: {}",
                        path.display()
                    )))
                }
            };
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        parse(&content)
    }

    /// Load `path`, else the first default file present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ComputeError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        for name in DEFAULT_CONFIG_FILES {
            let candidate = PathBuf::from(name);
            if candidate.exists() {
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.trend_window == 0 {
            return Err(ComputeError::InvalidConfig(
                "trend_window must be at least 1".to_string(),
            ));
        }
        if self.trend_window > MAX_TREND_WINDOW {
            return Err(ComputeError::InvalidConfig(format!(
                "trend_window must be at most {MAX_TREND_WINDOW}, got {}",
                self.trend_window
            )));
        }
        if self.window_days == Some(0) {
            return Err(ComputeError::InvalidConfig(
                "window_days must be at least 1".to_string(),
            ));
        }
        let goals = [
            ("move_kcal", self.ring_goals.move_kcal),
            ("exercise_minutes", self.ring_goals.exercise_minutes),
            ("stand_hours", self.ring_goals.stand_hours),
        ];
        for (name, goal) in goals {
            if !(goal.is_finite() && goal > 0.0) {
                return Err(ComputeError::InvalidConfig(format!(
                    "ring goal {name} must be positive, got {goal}"
                )));
            }
        }
        Ok(())
    }
}
