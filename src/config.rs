// config.rs

use crate::midi_file::Microseconds;
use ::config::{Config, Environment, File, FileFormat};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Width of the scoring window centred on a note's start.
pub const NOTE_WINDOW_US: Microseconds = 330_000;
/// 120 BPM, in effect before the first tempo change.
pub const DEFAULT_TEMPO_US: u32 = 500_000;
pub const DEFAULT_LEAD_IN_US: Microseconds = 5_500_000;
pub const DEFAULT_LEAD_OUT_US: Microseconds = 1_000_000;
pub const DEFAULT_REFRESH_RATE: u32 = 65;
/// Song time spanned by the falling-notes area.
pub const DEFAULT_SHOW_DURATION_US: Microseconds = 3_250_000;
pub const MIN_SPEED: u32 = 0;
pub const MAX_SPEED: u32 = 400;
pub const BEATS_PER_BAR: u64 = 4;
/// Upper bound on generated bar lines, several hours of music at any
/// sensible tempo.
pub const MAX_BAR_LINES: usize = 100_000;
/// How often a lost device is retried.
pub const RECONNECT_INTERVAL_US: Microseconds = 2_000_000;

const ENV_PREFIX: &str = "KEYFALL";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not read settings: {0}")]
    Read(#[from] ::config::ConfigError),
    #[error("could not serialise settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("could not write settings: {0}")]
    Io(#[from] io::Error),
}

/// Values remembered between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub last_file: Option<PathBuf>,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    /// Simulation ticks per second.
    pub refresh_rate: u32,
    /// Playback speed in percent.
    pub speed: u32,
    pub lead_in_ms: u32,
    pub lead_out_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            last_file: None,
            input_device: None,
            output_device: None,
            refresh_rate: DEFAULT_REFRESH_RATE,
            speed: 100,
            lead_in_ms: (DEFAULT_LEAD_IN_US / 1000) as u32,
            lead_out_ms: (DEFAULT_LEAD_OUT_US / 1000) as u32,
        }
    }
}

impl Settings {
    /// `$HOME/.config/keyfall/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("keyfall")
                .join("settings.toml"),
        )
    }

    /// Loads from the default location, falling back to defaults when
    /// there is no home directory.
    pub fn load() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Defaults, overridden by `path` if it exists, overridden by
    /// `KEYFALL_*` environment variables.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        debug!("Reading settings from {}", path.display());
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings.clamped())
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, toml::to_string(self)?)?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn lead_in_us(&self) -> Microseconds {
        Microseconds::from(self.lead_in_ms) * 1000
    }

    pub fn lead_out_us(&self) -> Microseconds {
        Microseconds::from(self.lead_out_ms) * 1000
    }

    fn clamped(mut self) -> Self {
        self.speed = self.speed.clamp(MIN_SPEED, MAX_SPEED);
        self.refresh_rate = self.refresh_rate.max(1);
        self
    }
}
