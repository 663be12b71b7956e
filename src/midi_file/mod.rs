//! Standard MIDI File loading
//!
//! Decodes SMF type 0 and 1 files (optionally RIFF/RMID wrapped) into
//! tracks of events, builds a single tempo map from every tempo change in
//! the file and pairs note events into timed notes.
//!
//! The main entry point is [`MidiFile`].

mod error;
mod event;
mod file;
mod note;
mod program_map;
mod reader;
mod tempo;
mod track;

pub use error::{MidiFileError, Result};
pub use event::{EventKind, MetaEvent, MidiEvent, TextKind};
pub use file::MidiFile;
pub use note::{extract_notes, Microseconds, Note, NoteSet, NoteState, PulseNote, TranslatedNote};
pub use program_map::{ProgramMap, CHANNELS};
pub use reader::{decode, Format, RawSmf};
pub use tempo::{build_tempo_track, extract_tempo_events, TempoMap, MAX_TIME_US};
pub use track::{Instrument, Track, PERCUSSION_CHANNEL};
