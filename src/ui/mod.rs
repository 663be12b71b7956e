//! User interface components
//!
//! The core hands a [`FrameView`] snapshot to a [`Presenter`] once per
//! frame; presenters only read it. keyfall ships a terminal presenter built
//! on indicatif that shows song progress, score and combo.

mod progress;

pub use progress::{create_song_progress, ProgressPresenter};

use crate::midi_file::{Microseconds, TranslatedNote};
use crate::stats::SongResult;
use std::collections::BTreeSet;

/// Everything needed to draw one frame.
#[derive(Debug, Clone)]
pub struct FrameView<'a> {
    pub song: &'a str,
    pub position: Microseconds,
    /// How much song time the falling-notes area spans.
    pub show_duration: Microseconds,
    /// Live notes of visible tracks, in start order.
    pub notes: Vec<&'a TranslatedNote>,
    pub bar_lines: &'a [Microseconds],
    pub percentage: f64,
    pub score: f64,
    pub combo: u32,
    pub speed: u32,
    pub paused: bool,
    /// The song is holding for the player.
    pub waiting: bool,
    /// Keys held on the input device.
    pub pressed: &'a BTreeSet<u8>,
    pub loop_region: Option<(Microseconds, Microseconds)>,
}

impl<'a> FrameView<'a> {
    /// Notes overlapping `[position, position + show_duration]`.
    pub fn visible_notes(&self) -> impl Iterator<Item = &'a TranslatedNote> + '_ {
        let from = self.position;
        let to = self.position + self.show_duration;
        self.notes
            .iter()
            .copied()
            .filter(move |n| n.end >= from && n.start <= to)
    }

    pub fn is_pressed(&self, note_id: u8) -> bool {
        self.pressed.contains(&note_id)
    }

    /// Bar lines inside the visible area.
    pub fn visible_bar_lines(&self) -> impl Iterator<Item = Microseconds> + '_ {
        let from = self.position;
        let to = self.position + self.show_duration;
        self.bar_lines
            .iter()
            .copied()
            .filter(move |&b| b >= from && b <= to)
    }
}

pub trait Presenter {
    fn present(&mut self, view: &FrameView<'_>);

    fn finish(&mut self, _result: &SongResult) {}
}
