use super::event::{EventKind, MidiEvent};
use super::tempo::TempoMap;
use log::debug;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Wall-clock song time. Signed: the transport runs negative during lead-in.
pub type Microseconds = i64;

/// Judging state of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NoteState {
    /// Played by the computer; never judged.
    #[default]
    AutoPlayed,
    UserPlayable,
    UserHit,
    UserMissed,
}

/// A sounding interval of one pitch on one track.
///
/// `T` is the time base: pulses straight out of the file, or microseconds
/// after tempo translation. Equality and ordering only look at
/// `(start, end, note_id, track_id)`.
#[derive(Debug, Clone, Copy)]
pub struct Note<T> {
    pub start: T,
    pub end: T,
    pub note_id: u8,
    pub track_id: usize,
    pub channel: u8,
    pub velocity: u8,
    pub state: NoteState,
    /// `state` as it was when the most recent bar retry was decided.
    pub retry_state: NoteState,
}

pub type PulseNote = Note<u64>;
pub type TranslatedNote = Note<Microseconds>;

impl<T: Copy + Ord> Note<T> {
    pub fn key(&self) -> (T, T, u8, usize) {
        (self.start, self.end, self.note_id, self.track_id)
    }
}

impl<T: Copy + Ord> PartialEq for Note<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T: Copy + Ord> Eq for Note<T> {}

impl<T: Copy + Ord> PartialOrd for Note<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Copy + Ord> Ord for Note<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PulseNote {
    pub fn translate(&self, tempo: &TempoMap) -> TranslatedNote {
        Note {
            start: tempo.pulses_to_microseconds(self.start),
            end: tempo.pulses_to_microseconds(self.end),
            note_id: self.note_id,
            track_id: self.track_id,
            channel: self.channel,
            velocity: self.velocity,
            state: self.state,
            retry_state: self.retry_state,
        }
    }
}

impl TranslatedNote {
    pub fn duration(&self) -> Microseconds {
        self.end - self.start
    }
}

/// Notes in ascending `(start, end, note_id, track_id)` order with
/// duplicates of that key removed.
#[derive(Debug, Clone, Default)]
pub struct NoteSet<T> {
    notes: Vec<Note<T>>,
}

impl<T: Copy + Ord> NoteSet<T> {
    pub fn new(mut notes: Vec<Note<T>>) -> Self {
        notes.sort();
        notes.dedup();
        Self { notes }
    }

    pub fn as_slice(&self) -> &[Note<T>] {
        &self.notes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note<T>> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn first(&self) -> Option<&Note<T>> {
        self.notes.first()
    }

    pub fn last(&self) -> Option<&Note<T>> {
        self.notes.last()
    }
}

struct OpenNote {
    channel: u8,
    velocity: u8,
    start: u64,
}

/// Pairs NoteOn/NoteOff events of one track into notes.
///
/// `pulses[i]` is the absolute pulse position of `events[i]`. A repeated
/// NoteOn on a sounding pitch closes the earlier note first; notes still
/// open at the end of the track are dropped.
pub fn extract_notes(track_id: usize, events: &[MidiEvent], pulses: &[u64]) -> Vec<PulseNote> {
    let mut open: HashMap<u8, OpenNote> = HashMap::new();
    let mut notes = Vec::new();

    for (event, &pulse) in events.iter().zip(pulses) {
        let Some(note_id) = event.note_number() else {
            continue;
        };

        if let Some(active) = open.remove(&note_id) {
            notes.push(Note {
                start: active.start,
                end: pulse,
                note_id,
                track_id,
                channel: active.channel,
                velocity: active.velocity,
                state: NoteState::AutoPlayed,
                retry_state: NoteState::AutoPlayed,
            });
        }

        if let EventKind::NoteOn {
            channel, velocity, ..
        } = event.kind
        {
            if velocity > 0 {
                open.insert(
                    note_id,
                    OpenNote {
                        channel,
                        velocity,
                        start: pulse,
                    },
                );
            }
        }
    }

    if !open.is_empty() {
        debug!(
            "Track {}: dropping {} note(s) left open at end of track",
            track_id,
            open.len()
        );
    }

    notes
}
