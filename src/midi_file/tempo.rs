//! Tempo timeline and pulse to wall-clock conversion.

use super::event::{EventKind, MetaEvent, MidiEvent};
use super::note::Microseconds;
use crate::config::DEFAULT_TEMPO_US;
use log::warn;
use std::collections::BTreeMap;

/// Latest song time a pulse converts to. Leaves headroom so window,
/// lead-out and frame arithmetic on song times cannot overflow.
pub const MAX_TIME_US: Microseconds = Microseconds::MAX / 4;

/// Removes every tempo change from `tracks`, returning them keyed by
/// absolute pulse.
///
/// The delta of a removed event is added to the event that followed it so
/// every remaining event keeps its absolute position. When several tracks
/// set the tempo at the same pulse the first one seen wins.
pub fn extract_tempo_events(tracks: &mut [Vec<MidiEvent>]) -> BTreeMap<u64, u32> {
    let mut tempo_events = BTreeMap::new();

    for track in tracks.iter_mut() {
        let mut pulses: u64 = 0;
        let mut carried: u32 = 0;
        let mut kept = Vec::with_capacity(track.len());

        for mut event in track.drain(..) {
            pulses += u64::from(event.delta_pulses);

            if let Some(tempo) = event.tempo() {
                tempo_events.entry(pulses).or_insert(tempo);
                carried = carried.saturating_add(event.delta_pulses);
            } else {
                event.delta_pulses = event.delta_pulses.saturating_add(carried);
                carried = 0;
                kept.push(event);
            }
        }

        if carried > 0 {
            kept.push(MidiEvent::new(
                carried,
                EventKind::Meta(MetaEvent::EndOfTrack),
            ));
        }

        *track = kept;
    }

    tempo_events
}

/// Materialises extracted tempo changes as an ordinary track.
pub fn build_tempo_track(tempo_events: &BTreeMap<u64, u32>) -> Vec<MidiEvent> {
    let mut previous = 0u64;
    let mut events: Vec<MidiEvent> = tempo_events
        .iter()
        .map(|(&pulse, &tempo)| {
            let delta = u32::try_from(pulse - previous).unwrap_or(u32::MAX);
            previous = pulse;
            MidiEvent::new(delta, EventKind::Meta(MetaEvent::TempoChange(tempo)))
        })
        .collect();

    events.push(MidiEvent::new(0, EventKind::Meta(MetaEvent::EndOfTrack)));
    events
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TempoSegment {
    pulse: u64,
    tempo: u32,
    /// Wall-clock time at which this segment begins.
    start: Microseconds,
}

/// Converts absolute pulse positions to microseconds.
///
/// Before the first tempo change the tempo is 120 BPM.
#[derive(Debug, Clone)]
pub struct TempoMap {
    pulses_per_quarter_note: u16,
    segments: Vec<TempoSegment>,
}

impl TempoMap {
    pub fn new(tempo_events: &BTreeMap<u64, u32>, pulses_per_quarter_note: u16) -> Self {
        let pulses_per_quarter_note = if pulses_per_quarter_note == 0 {
            warn!("File declares 0 pulses per quarter note, using 1");
            1
        } else {
            pulses_per_quarter_note
        };

        let mut segments = Vec::with_capacity(tempo_events.len());
        let mut previous_pulse = 0u64;
        let mut running_tempo = DEFAULT_TEMPO_US;
        let mut elapsed: Microseconds = 0;

        for (&pulse, &tempo) in tempo_events {
            let gap = span(pulse - previous_pulse, running_tempo, pulses_per_quarter_note);
            elapsed = elapsed.saturating_add(gap).min(MAX_TIME_US);
            segments.push(TempoSegment {
                pulse,
                tempo,
                start: elapsed,
            });
            previous_pulse = pulse;
            running_tempo = tempo;
        }

        Self {
            pulses_per_quarter_note,
            segments,
        }
    }

    pub fn pulses_per_quarter_note(&self) -> u16 {
        self.pulses_per_quarter_note
    }

    pub fn tempo_changes(&self) -> usize {
        self.segments.len()
    }

    /// Tempo in effect at `pulse`, in microseconds per quarter note.
    pub fn tempo_at(&self, pulse: u64) -> u32 {
        let idx = self.segments.partition_point(|s| s.pulse <= pulse);
        match idx {
            0 => DEFAULT_TEMPO_US,
            _ => self.segments[idx - 1].tempo,
        }
    }

    pub fn pulses_to_microseconds(&self, pulse: u64) -> Microseconds {
        let idx = self.segments.partition_point(|s| s.pulse <= pulse);
        if idx == 0 {
            return span(pulse, DEFAULT_TEMPO_US, self.pulses_per_quarter_note);
        }

        let segment = &self.segments[idx - 1];
        let offset = span(pulse - segment.pulse, segment.tempo, self.pulses_per_quarter_note);
        segment.start.saturating_add(offset).min(MAX_TIME_US)
    }
}

/// `(pulses / ppqn) * tempo`, floored to whole microseconds and capped at
/// [`MAX_TIME_US`].
fn span(pulses: u64, tempo: u32, pulses_per_quarter_note: u16) -> Microseconds {
    let us = u128::from(pulses) * u128::from(tempo) / u128::from(pulses_per_quarter_note);
    Microseconds::try_from(us).map_or(MAX_TIME_US, |us| us.min(MAX_TIME_US))
}
