//! Results of finished songs, kept between runs.

use crate::judge::ScoreStats;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("stats file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not access stats file: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongResult {
    pub song: String,
    pub played_at: DateTime<Utc>,
    pub score: f64,
    pub hits: u32,
    pub misses: u32,
    pub stray_notes: u32,
    pub longest_combo: u32,
    /// Percent; `None` if no note was judged.
    pub average_speed: Option<f64>,
}

impl SongResult {
    pub fn from_stats(song: impl Into<String>, stats: &ScoreStats) -> Self {
        SongResult {
            song: song.into(),
            played_at: Utc::now(),
            score: stats.score,
            hits: stats.notes_user_actually_played,
            misses: stats.misses(),
            stray_notes: stats.stray_notes,
            longest_combo: stats.longest_combo,
            average_speed: stats.average_speed(),
        }
    }
}

/// Append-only list of results stored as a JSON array.
pub struct SavedStats {
    path: PathBuf,
}

impl SavedStats {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.local/share/keyfall/stats.json`
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("keyfall")
                .join("stats.json"),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<SongResult>, StatsError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn append(&self, result: SongResult) -> Result<(), StatsError> {
        let mut results = self.load()?;
        info!("Saving result for '{}': {:.0} points", result.song, result.score);
        results.push(result);

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&results)?)?;
        Ok(())
    }

    /// Highest score recorded for `song`.
    pub fn best_score(&self, song: &str) -> Result<Option<f64>, StatsError> {
        Ok(self
            .load()?
            .iter()
            .filter(|r| r.song == song)
            .map(|r| r.score)
            .fold(None, |best, s| Some(best.map_or(s, |b: f64| b.max(s)))))
    }
}
