//! Live judging of the player's input
//!
//! The judge owns the play-through copy of the song's notes and decides,
//! for every key the player presses, which note (if any) it hits. It also
//! retires notes that have scrolled past, keeps the combo and score, and
//! drives the bar retry loop.
//!
//! Known limitation: held keys are tracked by pitch only, so the same
//! pitch pressed on two input channels at once confuses Note-Off matching.

mod notes;
mod retry;
mod score;

pub use notes::{is_elapsed, NoteArena};
pub use retry::RetryTracker;
pub use score::{multiplier, ScoreStats};

use crate::config::NOTE_WINDOW_US;
use crate::midi::MidiMessage;
use crate::midi_file::{Microseconds, MidiFile, NoteState, TranslatedNote};
use log::{debug, trace};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// How a track takes part in a play-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackMode {
    /// The computer plays it.
    #[default]
    Played,
    PlayedButHidden,
    NotPlayed,
    /// The player plays it; hits are echoed to the output.
    YouPlay,
    YouPlaySilently,
    /// Like `YouPlay`, and the song waits for every note.
    Learning,
    LearningSilently,
}

impl TrackMode {
    pub fn is_user(self) -> bool {
        matches!(
            self,
            TrackMode::YouPlay
                | TrackMode::YouPlaySilently
                | TrackMode::Learning
                | TrackMode::LearningSilently
        )
    }

    pub fn is_learning(self) -> bool {
        matches!(self, TrackMode::Learning | TrackMode::LearningSilently)
    }

    /// Whether the player's hits on this track are sent to the output.
    pub fn echoes_input(self) -> bool {
        matches!(self, TrackMode::YouPlay | TrackMode::Learning)
    }

    pub fn is_visible(self) -> bool {
        !matches!(self, TrackMode::PlayedButHidden | TrackMode::NotPlayed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackSettings {
    pub mode: TrackMode,
    /// Replay a bar when one of this track's notes is missed.
    pub retry: bool,
}

impl TrackSettings {
    pub fn is_retry_on(&self) -> bool {
        self.retry && self.mode.is_user()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeConfig {
    /// Full width of the scoring window around a note's start.
    pub window: Microseconds,
    /// Pitches the player's keyboard can produce; user notes outside are
    /// played by the computer instead.
    pub keyboard_range: RangeInclusive<u8>,
    /// Without an input device nothing is ever marked missed.
    pub input_enabled: bool,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            window: NOTE_WINDOW_US,
            keyboard_range: 21..=108,
            input_enabled: true,
        }
    }
}

/// A hit key whose Note-Off is still to come.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveNote {
    note_id: u8,
    channel: u8,
    echo: bool,
}

pub struct Judge {
    config: JudgeConfig,
    tracks: Vec<TrackSettings>,
    arena: NoteArena,
    stats: ScoreStats,
    combo: u32,
    active: Vec<ActiveNote>,
    /// Keys the player is holding down, hit or not.
    pressed: BTreeSet<u8>,
    required: BTreeSet<u8>,
    retry: RetryTracker,
    waiting_after_retry: bool,
}

impl Judge {
    pub fn new(
        file: &MidiFile,
        tracks: Vec<TrackSettings>,
        config: JudgeConfig,
        position: Microseconds,
    ) -> Self {
        let mut judge = Self {
            config,
            tracks,
            arena: NoteArena::default(),
            stats: ScoreStats::default(),
            combo: 0,
            active: Vec::new(),
            pressed: BTreeSet::new(),
            required: BTreeSet::new(),
            retry: RetryTracker::default(),
            waiting_after_retry: false,
        };
        judge.restart(file, position);
        judge
    }

    fn half_window(&self) -> Microseconds {
        self.config.window / 2
    }

    fn track(&self, track_id: usize) -> TrackSettings {
        self.tracks.get(track_id).copied().unwrap_or_default()
    }

    fn initial_state(&self, note: &TranslatedNote) -> NoteState {
        if self.track(note.track_id).mode.is_user()
            && self.config.keyboard_range.contains(&note.note_id)
        {
            NoteState::UserPlayable
        } else {
            NoteState::AutoPlayed
        }
    }

    fn fresh_notes(&self, file: &MidiFile) -> Vec<TranslatedNote> {
        file.notes()
            .iter()
            .map(|n| {
                let state = self.initial_state(n);
                TranslatedNote {
                    state,
                    retry_state: state,
                    ..*n
                }
            })
            .collect()
    }

    fn clear_live_state(&mut self) {
        self.active.clear();
        self.pressed.clear();
        self.required.clear();
        self.waiting_after_retry = false;
        self.combo = 0;
    }

    /// New play-through from `position`: fresh note states and totals.
    pub fn restart(&mut self, file: &MidiFile, position: Microseconds) {
        self.stats = ScoreStats::default();
        self.seek(file, position);
    }

    /// Fresh note states from `position`, keeping the totals.
    pub fn seek(&mut self, file: &MidiFile, position: Microseconds) {
        self.clear_live_state();
        self.arena = NoteArena::new(self.fresh_notes(file), self.half_window(), position);
        self.retry.reset(file.bar_lines(), position);
    }

    /// Rebuilds the notes for a bar retry that rewinds to `position`.
    ///
    /// Each note remembers the state it had in `retry_state`. On tracks
    /// with retry on, notes that were hit stay hit; everything else that
    /// has not yet scrolled past is played again.
    pub fn rebuild_for_retry(&mut self, file: &MidiFile, position: Microseconds) {
        let half = self.half_window();
        let previous = std::mem::take(&mut self.arena);

        let notes = file
            .notes()
            .iter()
            .enumerate()
            .map(|(i, original)| {
                let prior = previous.get(i).map_or(NoteState::AutoPlayed, |n| n.state);
                let keep_hit =
                    self.track(original.track_id).is_retry_on() && prior == NoteState::UserHit;
                let state = if is_elapsed(original, half, position) {
                    prior
                } else if keep_hit {
                    NoteState::UserHit
                } else {
                    self.initial_state(original)
                };
                TranslatedNote {
                    state,
                    retry_state: prior,
                    ..*original
                }
            })
            .collect();

        self.arena = NoteArena::new(notes, half, position);
        self.retry.reset(file.bar_lines(), position);
        self.active.clear();
        self.required.clear();
        self.combo = 0;
        self.waiting_after_retry = true;
        debug!("Notes rebuilt for retry at {}us", position);
    }

    /// Judges a key press. Returns the message to echo to the output,
    /// sounding the hit note at the velocity written in the file.
    pub fn note_on(&mut self, note_id: u8, now: Microseconds, speed: u32) -> Option<MidiMessage> {
        self.pressed.insert(note_id);
        self.stats.total_notes_user_pressed += 1;
        if self.required.remove(&note_id) {
            self.waiting_after_retry = false;
        }

        let half = self.half_window();
        let mut best: Option<(usize, Microseconds)> = None;
        for (index, note) in self.arena.live_notes() {
            if note.start - half > now {
                break;
            }
            if note.state != NoteState::UserPlayable || note.note_id != note_id {
                continue;
            }
            if now > note.start + half {
                continue;
            }
            let distance = (note.start - now).abs();
            if best.map_or(true, |(_, closest)| distance < closest) {
                best = Some((index, distance));
            }
        }

        let Some((index, _)) = best else {
            self.stats.stray_notes += 1;
            trace!("Stray key {} at {}us", note_id, now);
            return None;
        };

        let note = self.arena.get_mut(index)?;
        note.state = NoteState::UserHit;
        let channel = note.channel;
        let velocity = note.velocity;
        let echo = self
            .tracks
            .get(note.track_id)
            .map_or(false, |t| t.mode.echoes_input());

        self.stats.record_hit(self.combo, speed);
        self.combo += 1;
        self.active.push(ActiveNote {
            note_id,
            channel,
            echo,
        });
        trace!("Hit {} at {}us, combo {}", note_id, now, self.combo);

        echo.then_some(MidiMessage::NoteOn {
            channel,
            note: note_id,
            velocity,
        })
    }

    /// Releases the oldest held hit on `note_id`.
    pub fn note_off(&mut self, note_id: u8) -> Option<MidiMessage> {
        self.pressed.remove(&note_id);
        let position = self.active.iter().position(|a| a.note_id == note_id)?;
        let active = self.active.remove(position);
        active.echo.then_some(MidiMessage::NoteOff {
            channel: active.channel,
            note: note_id,
            velocity: 0,
        })
    }

    /// Marks notes whose window has passed as missed and retires notes
    /// that have fully scrolled past.
    pub fn sweep(&mut self, now: Microseconds, speed: u32) {
        let half = self.half_window();
        let input_enabled = self.config.input_enabled;
        let tracks = &self.tracks;
        let stats = &mut self.stats;
        let combo = &mut self.combo;
        let mut missed_on_retry_track = false;

        self.arena.sweep(now, |note| {
            let window_end = note.start + half;
            if input_enabled && note.state == NoteState::UserPlayable && window_end < now {
                note.state = NoteState::UserMissed;
                if tracks.get(note.track_id).map_or(false, TrackSettings::is_retry_on) {
                    missed_on_retry_track = true;
                }
            }

            let retire = note.end < now && window_end < now;
            if retire && note.state == NoteState::UserMissed {
                *combo = 0;
                stats.record_miss(speed);
            }
            retire
        });

        if missed_on_retry_track && !self.waiting_after_retry {
            self.retry.arm();
        }
    }

    /// Rewind target if a bar line with a retry pending was just crossed.
    pub fn check_retry(&mut self, file: &MidiFile, now: Microseconds) -> Option<Microseconds> {
        self.retry.check(file.bar_lines(), now)
    }

    /// Holds the song until `note_id` is pressed.
    pub fn require(&mut self, note_id: u8) {
        self.required.insert(note_id);
    }

    pub fn has_required(&self) -> bool {
        !self.required.is_empty()
    }

    pub fn required_notes(&self) -> &BTreeSet<u8> {
        &self.required
    }

    pub fn pressed_notes(&self) -> &BTreeSet<u8> {
        &self.pressed
    }

    pub fn is_waiting_after_retry(&self) -> bool {
        self.waiting_after_retry
    }

    pub fn reset_combo(&mut self) {
        self.combo = 0;
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn stats(&self) -> &ScoreStats {
        &self.stats
    }

    pub fn notes(&self) -> &NoteArena {
        &self.arena
    }

    pub fn track_settings(&self) -> &[TrackSettings] {
        &self.tracks
    }

    pub fn retry_tracker(&self) -> &RetryTracker {
        &self.retry
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// The note a file event at `start` belongs to.
    pub fn find_note(
        &self,
        track_id: usize,
        note_id: u8,
        start: Microseconds,
    ) -> Option<&TranslatedNote> {
        self.arena
            .find(track_id, note_id, start)
            .and_then(|i| self.arena.get(i))
    }
}
