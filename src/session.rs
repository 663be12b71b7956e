//! One loaded song being played.
//!
//! [`Session`] owns everything a play-through needs and advances it one
//! frame at a time from [`Session::update`]. It never blocks and never
//! fails: device trouble only makes the frame quieter.

use crate::config::{MAX_SPEED, MIN_SPEED, RECONNECT_INTERVAL_US};
use crate::judge::{Judge, JudgeConfig, TrackMode, TrackSettings};
use crate::midi::{MidiDeviceContext, MidiEngine, MidiMessage};
use crate::midi_file::{EventKind, Microseconds, MidiFile, NoteState, CHANNELS};
use crate::stats::SongResult;
use crate::transport::{DueEvent, Transport};
use crate::ui::FrameView;
use log::{debug, info};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Per track; missing entries default to [`TrackMode::Played`].
    pub tracks: Vec<TrackSettings>,
    pub speed: u32,
    pub lead_in: Microseconds,
    pub lead_out: Microseconds,
    pub judge: JudgeConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            speed: 100,
            lead_in: crate::config::DEFAULT_LEAD_IN_US,
            lead_out: crate::config::DEFAULT_LEAD_OUT_US,
            judge: JudgeConfig::default(),
        }
    }
}

pub struct Session<E: MidiEngine> {
    file: MidiFile,
    devices: MidiDeviceContext<E>,
    transport: Transport,
    judge: Judge,
    speed: u32,
    paused: bool,
    /// Notes of user tracks the computer is sounding, by (track, pitch).
    auto_sounding: HashSet<(usize, u8)>,
    /// Practice loop: playback jumps back to the start once past the end.
    loop_region: Option<(Microseconds, Microseconds)>,
    /// Time spent unplugged since the last reconnect attempt.
    since_reconnect: Microseconds,
    result_taken: bool,
}

impl<E: MidiEngine> Session<E> {
    pub fn new(file: MidiFile, devices: MidiDeviceContext<E>, options: SessionOptions) -> Self {
        let mut tracks = options.tracks;
        tracks.resize(file.tracks().len(), TrackSettings::default());

        let mut config = options.judge;
        config.input_enabled &= devices.has_input();

        let mut transport = Transport::new(&file);
        transport.reset(options.lead_in, options.lead_out);
        let judge = Judge::new(&file, tracks, config, transport.position());

        let mut session = Self {
            file,
            devices,
            transport,
            judge,
            speed: options.speed.clamp(MIN_SPEED, MAX_SPEED),
            paused: false,
            auto_sounding: HashSet::new(),
            loop_region: None,
            since_reconnect: 0,
            result_taken: false,
        };
        session.resync_output();
        info!("Session started for '{}'", session.file.name());
        session
    }

    /// Runs one simulation tick covering `elapsed` wall-clock microseconds.
    pub fn update(&mut self, elapsed: Microseconds) {
        let input = self.devices.drain_input();

        let delta = if self.paused || self.judge.has_required() {
            0
        } else {
            elapsed.max(0).saturating_mul(Microseconds::from(self.speed)) / 100
        };

        let due = self.transport.update(&self.file, delta);
        route_events(&due, &mut self.judge, &mut self.devices, &mut self.auto_sounding);

        let now = self.transport.position();
        for msg in input {
            let reply = match msg {
                MidiMessage::NoteOn { note, velocity, .. } if velocity > 0 => {
                    self.judge.note_on(note, now, self.speed)
                }
                MidiMessage::NoteOn { note, .. } | MidiMessage::NoteOff { note, .. } => {
                    self.judge.note_off(note)
                }
                _ => None,
            };
            if let Some(reply) = reply {
                self.devices.send(reply);
            }
        }

        self.judge.sweep(now, self.speed);

        if let Some(target) = self.judge.check_retry(&self.file, now) {
            // One frame early so the checkpoint bar line is crossed again.
            let rewind = target - delta.max(1);
            self.judge.rebuild_for_retry(&self.file, rewind);
            self.transport.go_to(&self.file, rewind);
            self.resync_output();
        }

        if self.judge.has_required() {
            self.judge.reset_combo();
        }

        if let Some((start, end)) = self.loop_region {
            if self.transport.position() > end {
                debug!("Loop end passed, back to {}us", start);
                self.seek_to(start);
            }
        }
    }

    /// Starts the song over with fresh totals.
    pub fn restart(&mut self) {
        self.transport
            .reset(self.transport.lead_in(), self.transport.lead_out());
        self.judge.restart(&self.file, self.transport.position());
        self.result_taken = false;
        self.resync_output();
    }

    pub fn seek_to(&mut self, position: Microseconds) {
        let earliest = self.file.dead_air().saturating_sub(self.transport.lead_in());
        let latest = self.file.song_end().saturating_add(self.transport.lead_out());
        let position = position.clamp(earliest, latest.max(earliest));

        self.transport.go_to(&self.file, position);
        self.judge.seek(&self.file, position);
        self.resync_output();
    }

    pub fn seek_relative(&mut self, milliseconds: i64) {
        self.seek_to(
            self.transport
                .position()
                .saturating_add(milliseconds.saturating_mul(1000)),
        );
    }

    /// Repeats `[start, end]` until [`Session::clear_loop`]. The bounds
    /// may be given in either order.
    pub fn set_loop(&mut self, start: Microseconds, end: Microseconds) {
        let region = (start.min(end), start.max(end));
        info!("Looping {}us to {}us", region.0, region.1);
        self.loop_region = Some(region);
    }

    pub fn clear_loop(&mut self) {
        self.loop_region = None;
    }

    pub fn loop_region(&self) -> Option<(Microseconds, Microseconds)> {
        self.loop_region
    }

    /// Seeks to a fraction (`0.0..=1.0`) of the song, dead air excluded.
    pub fn seek_percentage(&mut self, fraction: f64) {
        let offset = (self.file.song_length() as f64 * fraction.clamp(0.0, 1.0)) as Microseconds;
        self.seek_to(self.file.dead_air() + offset);
    }

    pub fn set_speed(&mut self, percent: u32) {
        self.speed = percent.clamp(MIN_SPEED, MAX_SPEED);
        debug!("Speed set to {}%", self.speed);
    }

    pub fn adjust_speed(&mut self, delta: i32) {
        self.set_speed(self.speed.saturating_add_signed(delta));
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn set_paused(&mut self, paused: bool) {
        if paused && !self.paused {
            self.silence();
        }
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_song_over(&self) -> bool {
        self.transport.is_song_over()
    }

    /// The song's result, handed out once after the song is over.
    pub fn take_result(&mut self) -> Option<SongResult> {
        if self.result_taken || !self.is_song_over() {
            return None;
        }
        self.result_taken = true;
        Some(SongResult::from_stats(self.file.name(), self.judge.stats()))
    }

    /// Reopens devices after a hot-plug event.
    pub fn reconnect(&mut self) -> bool {
        self.since_reconnect = 0;
        let ok = self.devices.reconnect();
        if ok {
            self.resync_output();
        }
        ok
    }

    /// Called every frame with the wall-clock time that passed. While the
    /// device is unplugged, tries to reconnect every
    /// [`RECONNECT_INTERVAL_US`]. Returns whether a reconnect succeeded.
    pub fn poll_reconnect(&mut self, elapsed: Microseconds) -> bool {
        if !self.devices.is_unplugged() {
            self.since_reconnect = 0;
            return false;
        }
        self.since_reconnect = self.since_reconnect.saturating_add(elapsed.max(0));
        if self.since_reconnect < RECONNECT_INTERVAL_US {
            return false;
        }
        self.reconnect()
    }

    /// Read-only snapshot for drawing.
    pub fn view(&self, show_duration: Microseconds) -> FrameView<'_> {
        let tracks = self.judge.track_settings();
        let notes = self
            .judge
            .notes()
            .live_notes()
            .map(|(_, note)| note)
            .filter(|note| {
                tracks
                    .get(note.track_id)
                    .map_or(true, |t| t.mode.is_visible())
            })
            .collect();

        FrameView {
            song: self.file.name(),
            position: self.transport.position(),
            show_duration,
            notes,
            bar_lines: self.file.bar_lines(),
            percentage: self.transport.percentage_complete(),
            score: self.judge.stats().score,
            combo: self.judge.combo(),
            speed: self.speed,
            paused: self.paused,
            waiting: self.judge.has_required(),
            pressed: self.judge.pressed_notes(),
            loop_region: self.loop_region,
        }
    }

    pub fn file(&self) -> &MidiFile {
        &self.file
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn judge(&self) -> &Judge {
        &self.judge
    }

    pub fn devices(&self) -> &MidiDeviceContext<E> {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut MidiDeviceContext<E> {
        &mut self.devices
    }

    fn silence(&mut self) {
        self.devices.reset_all_notes();
        self.auto_sounding.clear();
    }

    /// Brings the output in line with the current position: nothing
    /// sounding and every channel on the program it would have by now.
    fn resync_output(&mut self) {
        self.silence();
        let programs = self
            .file
            .program_map()
            .programs_at(self.transport.position().max(0));
        for (channel, program) in (0u8..).zip(programs.iter().take(CHANNELS)) {
            self.devices.send(MidiMessage::ProgramChange {
                channel,
                program: *program,
            });
        }
    }
}

/// Sends file events to the output according to each track's mode and
/// holds the song for notes the player has to play first.
fn route_events<E: MidiEngine>(
    due: &[DueEvent<'_>],
    judge: &mut Judge,
    devices: &mut MidiDeviceContext<E>,
    auto_sounding: &mut HashSet<(usize, u8)>,
) {
    for item in due {
        let settings = judge
            .track_settings()
            .get(item.track_id)
            .copied()
            .unwrap_or_default();

        let is_note = matches!(
            item.event.kind,
            EventKind::NoteOn { .. } | EventKind::NoteOff { .. }
        );
        if !is_note {
            if settings.mode != TrackMode::NotPlayed {
                if let Some(msg) = item.event.to_message() {
                    devices.send(msg);
                }
            }
            continue;
        }

        let Some(note_id) = item.event.note_number() else {
            continue;
        };
        let Some(msg) = item.event.to_message() else {
            continue;
        };

        match settings.mode {
            TrackMode::Played | TrackMode::PlayedButHidden => devices.send(msg),
            TrackMode::NotPlayed => {}
            _ if item.event.is_note_on() => {
                let Some(note) = judge.find_note(item.track_id, note_id, item.time) else {
                    continue;
                };
                match note.state {
                    NoteState::AutoPlayed => {
                        devices.send(msg);
                        auto_sounding.insert((item.track_id, note_id));
                    }
                    NoteState::UserHit if note.retry_state == NoteState::UserHit => {
                        devices.send(msg);
                        auto_sounding.insert((item.track_id, note_id));
                    }
                    NoteState::UserPlayable => {
                        let waiting = judge.is_waiting_after_retry() && settings.is_retry_on();
                        if settings.mode.is_learning() || waiting {
                            judge.require(note_id);
                        }
                    }
                    _ => {}
                }
            }
            _ => {
                if auto_sounding.remove(&(item.track_id, note_id)) {
                    devices.send(msg);
                }
            }
        }
    }
}
