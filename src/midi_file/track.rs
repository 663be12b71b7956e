use super::event::{EventKind, MetaEvent, MidiEvent, TextKind};
use super::note::{extract_notes, Microseconds, NoteSet, TranslatedNote};
use super::tempo::TempoMap;

/// MIDI channel 10, reserved for percussion in General MIDI.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// What a track sounds like, judged from its channel traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    /// The track has no notes.
    None,
    Program(u8),
    Percussion,
    /// More than one program, or percussion mixed with a program.
    Various,
}

/// One track of a loaded file: its events with absolute pulse and
/// wall-clock positions, and the notes built from them.
#[derive(Debug, Clone)]
pub struct Track {
    events: Vec<MidiEvent>,
    event_pulses: Vec<u64>,
    event_usecs: Vec<Microseconds>,
    notes: NoteSet<Microseconds>,
    instrument: Instrument,
    name: Option<String>,
}

impl Track {
    pub fn new(track_id: usize, events: Vec<MidiEvent>, tempo: &TempoMap) -> Self {
        let mut running = 0u64;
        let event_pulses: Vec<u64> = events
            .iter()
            .map(|e| {
                running += u64::from(e.delta_pulses);
                running
            })
            .collect();

        let event_usecs = event_pulses
            .iter()
            .map(|&p| tempo.pulses_to_microseconds(p))
            .collect();

        let notes = extract_notes(track_id, &events, &event_pulses)
            .iter()
            .map(|n| n.translate(tempo))
            .collect();

        let name = events.iter().find_map(|e| match &e.kind {
            EventKind::Meta(MetaEvent::Text(TextKind::TrackName, text)) => Some(text.clone()),
            _ => None,
        });

        let instrument = discover_instrument(&events);

        Self {
            events,
            event_pulses,
            event_usecs,
            notes: NoteSet::new(notes),
            instrument,
            name,
        }
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn event_pulses(&self) -> &[u64] {
        &self.event_pulses
    }

    pub fn event_usecs(&self) -> &[Microseconds] {
        &self.event_usecs
    }

    pub fn notes(&self) -> &[TranslatedNote] {
        self.notes.as_slice()
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Absolute pulse of the first sounding NoteOn.
    pub fn first_note_on_pulse(&self) -> Option<u64> {
        self.events
            .iter()
            .zip(&self.event_pulses)
            .find(|(e, _)| e.is_note_on())
            .map(|(_, &p)| p)
    }

    pub fn total_pulses(&self) -> u64 {
        self.event_pulses.last().copied().unwrap_or(0)
    }
}

fn discover_instrument(events: &[MidiEvent]) -> Instrument {
    let mut program: Option<u8> = None;
    let mut various = false;
    let mut percussion = false;
    let mut melodic = false;

    for event in events {
        match event.kind {
            EventKind::NoteOn { channel, .. } if event.is_note_on() => {
                if channel == PERCUSSION_CHANNEL {
                    percussion = true;
                } else {
                    melodic = true;
                }
            }
            EventKind::ProgramChange { channel, program: p } if channel != PERCUSSION_CHANNEL => {
                match program {
                    None => program = Some(p),
                    Some(existing) if existing != p => various = true,
                    Some(_) => {}
                }
            }
            _ => {}
        }
    }

    match (percussion, melodic) {
        (false, false) => Instrument::None,
        (true, false) => Instrument::Percussion,
        (true, true) => Instrument::Various,
        (false, true) if various => Instrument::Various,
        (false, true) => Instrument::Program(program.unwrap_or(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn note_on(delta: u32, channel: u8, note: u8) -> MidiEvent {
        MidiEvent::new(
            delta,
            EventKind::NoteOn {
                channel,
                note,
                velocity: 90,
            },
        )
    }

    fn note_off(delta: u32, channel: u8, note: u8) -> MidiEvent {
        MidiEvent::new(
            delta,
            EventKind::NoteOff {
                channel,
                note,
                velocity: 0,
            },
        )
    }

    fn program(channel: u8, program: u8) -> MidiEvent {
        MidiEvent::new(0, EventKind::ProgramChange { channel, program })
    }

    fn track(events: Vec<MidiEvent>) -> Track {
        Track::new(0, events, &TempoMap::new(&BTreeMap::new(), 480))
    }

    #[test]
    fn test_positions_and_notes() {
        let t = track(vec![note_on(480, 0, 60), note_off(480, 0, 60)]);

        assert_eq!(t.event_pulses(), &[480, 960]);
        assert_eq!(t.event_usecs(), &[500_000, 1_000_000]);
        assert_eq!(t.notes().len(), 1);
        assert_eq!(t.notes()[0].start, 500_000);
        assert_eq!(t.first_note_on_pulse(), Some(480));
    }

    #[test]
    fn test_instrument_single_program() {
        let t = track(vec![program(0, 40), note_on(0, 0, 60), note_off(10, 0, 60)]);
        assert_eq!(t.instrument(), Instrument::Program(40));
    }

    #[test]
    fn test_instrument_defaults_to_piano() {
        let t = track(vec![note_on(0, 0, 60), note_off(10, 0, 60)]);
        assert_eq!(t.instrument(), Instrument::Program(0));
    }

    #[test]
    fn test_instrument_percussion() {
        let t = track(vec![note_on(0, 9, 36), note_off(10, 9, 36)]);
        assert_eq!(t.instrument(), Instrument::Percussion);
    }

    #[test]
    fn test_instrument_various() {
        let mixed = track(vec![
            program(0, 1),
            note_on(0, 0, 60),
            program(1, 2),
            note_on(0, 1, 62),
        ]);
        assert_eq!(mixed.instrument(), Instrument::Various);

        let drums_and_piano = track(vec![note_on(0, 9, 36), note_on(0, 0, 60)]);
        assert_eq!(drums_and_piano.instrument(), Instrument::Various);
    }

    #[test]
    fn test_instrument_none_without_notes() {
        let t = track(vec![program(0, 5)]);
        assert_eq!(t.instrument(), Instrument::None);
    }

    #[test]
    fn test_track_name() {
        let t = track(vec![MidiEvent::new(
            0,
            EventKind::Meta(MetaEvent::Text(TextKind::TrackName, "Left Hand".into())),
        )]);
        assert_eq!(t.name(), Some("Left Hand"));
    }
}
