use super::{FrameView, Presenter};
use crate::stats::SongResult;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Resolution of the song progress bar.
const PROGRESS_STEPS: u64 = 1000;

pub fn create_song_progress(song: &str) -> ProgressBar {
    let pb = ProgressBar::new(PROGRESS_STEPS);
    let style =
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan}] {percent:>3}% {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("⣀⣤⣦⣶⣷⣿ ");
    pb.set_style(style);
    pb.set_prefix(song.to_string());
    pb
}

/// Terminal presenter: one progress bar with score and combo.
pub struct ProgressPresenter {
    bar: ProgressBar,
}

impl ProgressPresenter {
    pub fn new(song: &str) -> Self {
        Self {
            bar: create_song_progress(song),
        }
    }

    /// A presenter that draws nothing, for tests and scripted runs.
    pub fn hidden(song: &str) -> Self {
        let bar = create_song_progress(song);
        bar.set_draw_target(ProgressDrawTarget::hidden());
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Presenter for ProgressPresenter {
    fn present(&mut self, view: &FrameView<'_>) {
        self.bar
            .set_position((view.percentage * PROGRESS_STEPS as f64).round() as u64);

        let state = if view.paused {
            " [paused]"
        } else if view.waiting {
            " [waiting]"
        } else {
            ""
        };
        let looping = if view.loop_region.is_some() { " [loop]" } else { "" };
        self.bar.set_message(format!(
            "score {:.0}  combo {}  speed {}%{}{}",
            view.score, view.combo, view.speed, looping, state
        ));
    }

    fn finish(&mut self, result: &SongResult) {
        self.bar.finish_with_message(format!(
            "score {:.0}  hits {}  misses {}  stray {}  best combo {}",
            result.score, result.hits, result.misses, result.stray_notes, result.longest_combo
        ));
    }
}
