use std::path::PathBuf;
use thiserror::Error;

/// Reasons a Standard MIDI File can fail to load.
///
/// All of these are fatal to the load only; the caller decides how to
/// surface them.
#[derive(Error, Debug)]
pub enum MidiFileError {
    #[error("could not read MIDI file {path}: {source}")]
    BadFilename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown chunk header type")]
    UnknownHeaderType,

    #[error("MIDI header chunk has the wrong size")]
    BadHeaderSize,

    #[error("type 2 MIDI files are not supported")]
    Type2MidiNotSupported,

    #[error("type 0 MIDI file must contain exactly one track")]
    BadType0Midi,

    #[error("SMPTE time division is not implemented")]
    SmpteTimingNotImplemented,

    #[error("track header is too short")]
    TrackHeaderTooShort,

    #[error("track is shorter than its declared length")]
    TrackTooShort,

    #[error("event data ends before the event is complete")]
    EventTooShort,

    #[error("unknown event status byte {0:#04x}")]
    UnknownEventType(u8),
}

pub type Result<T> = std::result::Result<T, MidiFileError>;
