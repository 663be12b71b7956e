use serde::{Deserialize, Serialize};

/// Running totals for one play-through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub score: f64,
    pub total_notes_user_pressed: u32,
    pub notes_user_could_have_played: u32,
    pub notes_user_actually_played: u32,
    pub stray_notes: u32,
    pub longest_combo: u32,
    /// Sum of the playback speed at every judged note; divided by
    /// `notes_user_could_have_played` it gives the average speed.
    pub speed_integral: u64,
}

/// Score multiplier for a hit made with `combo` consecutive hits behind it.
/// Grows by a tenth per chained hit, capped at five.
pub fn multiplier(combo: u32) -> f64 {
    (1.0 + f64::from(combo) / 10.0).min(5.0)
}

impl ScoreStats {
    /// Books a hit made while `combo` notes were already chained.
    pub fn record_hit(&mut self, combo: u32, speed: u32) {
        self.notes_user_could_have_played += 1;
        self.notes_user_actually_played += 1;
        self.speed_integral += u64::from(speed);
        self.score += 100.0 * multiplier(combo) * (f64::from(speed) / 100.0);
        self.longest_combo = self.longest_combo.max(combo + 1);
    }

    pub fn record_miss(&mut self, speed: u32) {
        self.notes_user_could_have_played += 1;
        self.speed_integral += u64::from(speed);
    }

    pub fn misses(&self) -> u32 {
        self.notes_user_could_have_played - self.notes_user_actually_played
    }

    /// Average playback speed over the judged notes, in percent.
    pub fn average_speed(&self) -> Option<f64> {
        match self.notes_user_could_have_played {
            0 => None,
            n => Some(self.speed_integral as f64 / f64::from(n)),
        }
    }

    pub fn hit_ratio(&self) -> Option<f64> {
        match self.notes_user_could_have_played {
            0 => None,
            n => Some(f64::from(self.notes_user_actually_played) / f64::from(n)),
        }
    }
}
