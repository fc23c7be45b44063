use std::{
    fs::File,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    LaptraceError,
    laps::correction::{DEFAULT_FUEL_LOAD, DEFAULT_MAX_LAPS, MAX_FUEL_LOAD},
    stats::{DEFAULT_HAMPEL_THRESHOLD, DEFAULT_HAMPEL_WINDOW, HampelParams},
};

const CONFIG_DIR_NAME: &str = "laptrace";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_STDDEV_THRESHOLD: f64 = 3.0;
pub const DEFAULT_ROLLING_WINDOW: usize = 3;
pub const DEFAULT_SEGMENT_COUNT: usize = 25;

/// Tunable defaults for the analysis commands.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub hampel_window: usize,
    pub hampel_threshold: f64,
    pub stddev_threshold: f64,
    pub fuel_load: f64,
    /// Shortest race distance the fuel correction assumes
    pub max_laps: u32,
    pub rolling_window: usize,
    /// Mini-sectors used for equal-length segmentation
    pub segment_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hampel_window: DEFAULT_HAMPEL_WINDOW,
            hampel_threshold: DEFAULT_HAMPEL_THRESHOLD,
            stddev_threshold: DEFAULT_STDDEV_THRESHOLD,
            fuel_load: DEFAULT_FUEL_LOAD,
            max_laps: DEFAULT_MAX_LAPS,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            segment_count: DEFAULT_SEGMENT_COUNT,
        }
    }
}

impl AnalysisConfig {
    pub fn default_path() -> Result<PathBuf, LaptraceError> {
        Ok(dirs::config_dir()
            .ok_or(LaptraceError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Reads the config from the user's config directory, `None` when no file was saved yet.
    pub fn from_local_file() -> Result<Option<Self>, LaptraceError> {
        let config_path = Self::default_path()?;
        if config_path.exists() {
            Self::load(&config_path).map(Some)
        } else {
            debug!("No config file at {:?}", config_path);
            Ok(None)
        }
    }

    pub fn load(path: &Path) -> Result<Self, LaptraceError> {
        let file = File::open(path).map_err(|e| LaptraceError::ConfigIOError { source: e })?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| LaptraceError::ConfigParseError { source: e })?;
        config.validate()?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self) -> Result<(), LaptraceError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), LaptraceError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LaptraceError::ConfigIOError { source: e })?;
        }
        let file = File::create(path).map_err(|e| LaptraceError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| LaptraceError::ConfigSerializeError { source: e })
    }

    pub fn validate(&self) -> Result<(), LaptraceError> {
        if self.hampel_window == 0 || self.rolling_window == 0 || self.segment_count == 0 {
            return Err(LaptraceError::invalid(
                "hampel_window, rolling_window and segment_count must be at least 1",
            ));
        }
        if !(self.hampel_threshold > 0.0 && self.stddev_threshold > 0.0) {
            return Err(LaptraceError::invalid("thresholds must be positive"));
        }
        if !(0.0..=MAX_FUEL_LOAD).contains(&self.fuel_load) {
            return Err(LaptraceError::invalid(format!(
                "fuel load {} is outside 0-{}",
                self.fuel_load, MAX_FUEL_LOAD
            )));
        }
        if self.max_laps == 0 {
            return Err(LaptraceError::invalid("max_laps must be at least 1"));
        }
        Ok(())
    }

    pub fn hampel_params(&self) -> HampelParams {
        HampelParams {
            window: self.hampel_window,
            threshold: self.hampel_threshold,
        }
    }
}
