//! Song position and event delivery
//!
//! The transport knows nothing about speed or pausing: the caller scales
//! (or zeroes) the elapsed time before calling [`Transport::update`].

use crate::config::{DEFAULT_LEAD_IN_US, DEFAULT_LEAD_OUT_US};
use crate::midi_file::{Microseconds, MidiEvent, MidiFile};
use log::{debug, trace};

/// An event that became due during an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueEvent<'a> {
    pub track_id: usize,
    pub time: Microseconds,
    pub event: &'a MidiEvent,
}

pub struct Transport {
    position: Microseconds,
    dead_air: Microseconds,
    song_length: Microseconds,
    lead_in: Microseconds,
    lead_out: Microseconds,
    /// Per track, index of the first event not yet delivered.
    cursors: Vec<usize>,
    first_update_after_reset: bool,
}

impl Transport {
    pub fn new(file: &MidiFile) -> Self {
        let mut transport = Self {
            position: 0,
            dead_air: file.dead_air(),
            song_length: file.song_length(),
            lead_in: DEFAULT_LEAD_IN_US,
            lead_out: DEFAULT_LEAD_OUT_US,
            cursors: vec![0; file.tracks().len()],
            first_update_after_reset: true,
        };
        transport.reset(DEFAULT_LEAD_IN_US, DEFAULT_LEAD_OUT_US);
        transport
    }

    /// Back to the start of the song, `lead_in` before the first note.
    pub fn reset(&mut self, lead_in: Microseconds, lead_out: Microseconds) {
        self.lead_in = lead_in;
        self.lead_out = lead_out;
        self.position = self.dead_air.saturating_sub(lead_in);
        self.cursors.iter_mut().for_each(|c| *c = 0);
        self.first_update_after_reset = true;
        debug!("Transport reset to {}us", self.position);
    }

    /// Advances by `delta` and returns the events that fell due, grouped
    /// by track.
    ///
    /// Within a track events keep file order; across tracks they are not
    /// interleaved by time.
    pub fn update<'a>(&mut self, file: &'a MidiFile, delta: Microseconds) -> Vec<DueEvent<'a>> {
        self.position = self.position.saturating_add(delta.max(0));

        if self.first_update_after_reset {
            self.first_update_after_reset = false;
            return Vec::new();
        }

        if self.position < 0 {
            return Vec::new();
        }

        let mut due = Vec::new();
        for (track_id, track) in file.tracks().iter().enumerate() {
            let Some(cursor) = self.cursors.get_mut(track_id) else {
                continue;
            };
            let times = track.event_usecs();
            while *cursor < times.len() && times[*cursor] <= self.position {
                due.push(DueEvent {
                    track_id,
                    time: times[*cursor],
                    event: &track.events()[*cursor],
                });
                *cursor += 1;
            }
        }

        if !due.is_empty() {
            trace!("{} events due at {}us", due.len(), self.position);
        }
        due
    }

    /// Jumps to `position` without delivering the events skipped over.
    pub fn go_to(&mut self, file: &MidiFile, position: Microseconds) {
        self.position = position;
        self.cursors = file
            .tracks()
            .iter()
            .map(|track| track.event_usecs().partition_point(|&t| t <= position))
            .collect();
        debug!("Transport moved to {}us", position);
    }

    pub fn position(&self) -> Microseconds {
        self.position
    }

    pub fn dead_air(&self) -> Microseconds {
        self.dead_air
    }

    pub fn song_length(&self) -> Microseconds {
        self.song_length
    }

    pub fn lead_in(&self) -> Microseconds {
        self.lead_in
    }

    pub fn lead_out(&self) -> Microseconds {
        self.lead_out
    }

    pub fn cursors(&self) -> &[usize] {
        &self.cursors
    }

    /// Notes per track whose NoteOn has not been delivered yet.
    pub fn notes_remaining(&self, file: &MidiFile) -> Vec<usize> {
        file.tracks()
            .iter()
            .zip(&self.cursors)
            .map(|(track, &cursor)| {
                track.events()[cursor.min(track.events().len())..]
                    .iter()
                    .filter(|e| e.is_note_on())
                    .count()
            })
            .collect()
    }

    /// Progress through the song in `0.0..=1.0`, ignoring dead air.
    pub fn percentage_complete(&self) -> f64 {
        let elapsed = self.position.saturating_sub(self.dead_air) as f64;
        let length = self.song_length.max(1) as f64;
        (elapsed / length).clamp(0.0, 1.0)
    }

    pub fn is_song_over(&self) -> bool {
        let played = self.position.saturating_sub(self.dead_air);
        played >= self.song_length.saturating_add(self.lead_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tag: &[u8], body: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    /// Two tracks at 120 BPM, 480 ppqn: a note at beat 1 and beat 2 on
    /// the first, a program change at 0 and a note at beat 3 on the second.
    fn song() -> MidiFile {
        let first: Vec<u8> = [
            &[0x83, 0x60, 0x90, 60, 100][..],
            &[0x83, 0x60, 0x80, 60, 0],
            &[0x00, 0x90, 62, 100],
            &[0x83, 0x60, 0x80, 62, 0],
            &[0x00, 0xFF, 0x2F, 0x00],
        ]
        .concat();
        let second: Vec<u8> = [
            &[0x00, 0xC1, 5][..],
            &[0x8B, 0x20, 0x91, 64, 100],
            &[0x83, 0x60, 0x81, 64, 0],
            &[0x00, 0xFF, 0x2F, 0x00],
        ]
        .concat();

        let mut data = chunk(b"MThd", &[0, 1, 0, 2, 0x01, 0xE0]);
        data.extend(chunk(b"MTrk", &first));
        data.extend(chunk(b"MTrk", &second));
        MidiFile::from_bytes("song", &data).unwrap()
    }

    #[test]
    fn test_reset_starts_before_dead_air() {
        let file = song();
        let mut transport = Transport::new(&file);
        transport.reset(1_000_000, 0);

        assert_eq!(file.dead_air(), 499_999);
        assert_eq!(transport.position(), -500_001);
    }

    #[test]
    fn test_first_update_after_reset_emits_nothing() {
        let file = song();
        let mut transport = Transport::new(&file);
        transport.reset(0, 0);

        assert!(transport.update(&file, 600_000).is_empty());
        assert_eq!(transport.position(), 1_099_999);

        // Events skipped by the first update are delivered on the next.
        let due = transport.update(&file, 0);
        let kinds: Vec<_> = due.iter().map(|d| (d.track_id, d.time)).collect();
        assert_eq!(
            kinds,
            vec![(0, 500_000), (0, 1_000_000), (0, 1_000_000), (1, 0), (2, 0)]
        );
    }

    #[test]
    fn test_no_events_during_lead_in() {
        let file = song();
        let mut transport = Transport::new(&file);
        transport.reset(2_000_000, 0);
        transport.update(&file, 0);

        assert!(transport.update(&file, 1_000_000).is_empty());
        assert!(transport.position() < 0);

        // The program change and the tempo track's end marker, both at 0.
        let due = transport.update(&file, 600_000);
        let tracks: Vec<_> = due.iter().map(|d| (d.track_id, d.time)).collect();
        assert_eq!(tracks, vec![(1, 0), (2, 0)]);
    }

    #[test]
    fn test_events_are_delivered_once() {
        let file = song();
        let mut transport = Transport::new(&file);
        transport.reset(0, 0);
        transport.update(&file, 0);

        let mut total = 0;
        for _ in 0..40 {
            total += transport.update(&file, 100_000).len();
        }
        let all: usize = file.tracks().iter().map(|t| t.events().len()).sum();
        assert_eq!(total, all);
    }

    #[test]
    fn test_go_to_is_idempotent() {
        let file = song();
        let mut transport = Transport::new(&file);

        transport.go_to(&file, 1_200_000);
        let cursors = transport.cursors().to_vec();
        let remaining = transport.notes_remaining(&file);

        transport.go_to(&file, 1_200_000);
        assert_eq!(transport.cursors(), cursors.as_slice());
        assert_eq!(transport.notes_remaining(&file), remaining);
        assert_eq!(remaining, vec![0, 1, 0]);
    }

    #[test]
    fn test_go_to_does_not_redeliver_skipped_events() {
        let file = song();
        let mut transport = Transport::new(&file);
        transport.update(&file, 0);

        transport.go_to(&file, 1_000_000);
        let due = transport.update(&file, 1_000_000);
        let times: Vec<_> = due.iter().map(|d| d.time).collect();
        assert_eq!(
            times,
            vec![1_500_000, 1_500_000, 1_500_000, 2_000_000, 2_000_000]
        );
    }

    #[test]
    fn test_percentage_and_song_over() {
        let file = song();
        let mut transport = Transport::new(&file);
        transport.reset(0, 1_000_000);
        assert_eq!(transport.percentage_complete(), 0.0);

        transport.go_to(&file, file.dead_air() + file.song_length() / 2);
        assert!((transport.percentage_complete() - 0.5).abs() < 1e-3);
        assert!(!transport.is_song_over());

        transport.go_to(&file, file.song_end() + 999_999);
        assert_eq!(transport.percentage_complete(), 1.0);
        assert!(!transport.is_song_over());

        transport.go_to(&file, file.song_end() + 1_000_000);
        assert!(transport.is_song_over());
    }
}
