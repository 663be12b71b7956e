//! Track event decoding.

use super::error::{MidiFileError, Result};
use super::reader::ByteReader;
use crate::midi::MidiMessage;
use log::warn;

/// A single event from a track chunk, tagged with its delta-time in pulses.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiEvent {
    pub delta_pulses: u32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    Aftertouch { channel: u8, note: u8, pressure: u8 },
    Controller { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    PitchWheel { channel: u8, value: u16 },
    Meta(MetaEvent),
    SysEx(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Text,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ProgramName,
    DeviceName,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaEvent {
    SequenceNumber(u16),
    Text(TextKind, String),
    ChannelPrefix(u8),
    MidiPort(u8),
    EndOfTrack,
    /// Microseconds per quarter note.
    TempoChange(u32),
    SmpteOffset([u8; 5]),
    TimeSignature {
        numerator: u8,
        denominator_power: u8,
        clocks_per_click: u8,
        thirty_seconds_per_quarter: u8,
    },
    KeySignature { sharps: i8, minor: bool },
    Proprietary(Vec<u8>),
}

impl MidiEvent {
    pub fn new(delta_pulses: u32, kind: EventKind) -> Self {
        Self { delta_pulses, kind }
    }

    /// True for a NoteOn with non-zero velocity.
    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, EventKind::NoteOn { velocity, .. } if velocity > 0)
    }

    /// True for a NoteOff, or a NoteOn with zero velocity.
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.kind,
            EventKind::NoteOff { .. } | EventKind::NoteOn { velocity: 0, .. }
        )
    }

    pub fn note_number(&self) -> Option<u8> {
        match self.kind {
            EventKind::NoteOn { note, .. } | EventKind::NoteOff { note, .. } => Some(note),
            _ => None,
        }
    }

    pub fn channel(&self) -> Option<u8> {
        match self.kind {
            EventKind::NoteOff { channel, .. }
            | EventKind::NoteOn { channel, .. }
            | EventKind::Aftertouch { channel, .. }
            | EventKind::Controller { channel, .. }
            | EventKind::ProgramChange { channel, .. }
            | EventKind::ChannelPressure { channel, .. }
            | EventKind::PitchWheel { channel, .. } => Some(channel),
            EventKind::Meta(_) | EventKind::SysEx(_) => None,
        }
    }

    pub fn tempo(&self) -> Option<u32> {
        match self.kind {
            EventKind::Meta(MetaEvent::TempoChange(tempo)) => Some(tempo),
            _ => None,
        }
    }

    /// The wire message a device should receive for this event, if any.
    /// Meta and SysEx events never leave the file.
    pub fn to_message(&self) -> Option<MidiMessage> {
        let message = match self.kind {
            EventKind::NoteOff { channel, note, velocity } => MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            },
            EventKind::NoteOn { channel, note, velocity } => MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            },
            EventKind::Aftertouch { channel, note, pressure } => MidiMessage::Aftertouch {
                channel,
                note,
                pressure,
            },
            EventKind::Controller {
                channel,
                controller,
                value,
            } => MidiMessage::ControlChange {
                channel,
                controller,
                value,
            },
            EventKind::ProgramChange { channel, program } => {
                MidiMessage::ProgramChange { channel, program }
            }
            EventKind::ChannelPressure { channel, pressure } => {
                MidiMessage::ChannelPressure { channel, pressure }
            }
            EventKind::PitchWheel { channel, value } => MidiMessage::PitchBend { channel, value },
            EventKind::Meta(_) | EventKind::SysEx(_) => return None,
        };
        Some(message)
    }
}

/// Sequential event decoder over one track body, honouring running status.
pub(crate) struct EventReader<'a> {
    reader: ByteReader<'a>,
    running_status: Option<u8>,
}

impl<'a> EventReader<'a> {
    pub(crate) fn new(body: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(body),
            running_status: None,
        }
    }

    /// Returns the next event, or `None` at the end of the track body.
    ///
    /// Unknown meta events are dropped; their delta-time is folded into the
    /// following event so absolute positions are unaffected.
    pub(crate) fn next_event(&mut self) -> Result<Option<MidiEvent>> {
        let mut carried: u32 = 0;

        while !self.reader.is_empty() {
            let delta = self
                .reader
                .read_vlq()
                .ok_or(MidiFileError::EventTooShort)?;
            let delta_pulses = carried.saturating_add(delta);

            match self.read_kind()? {
                Some(kind) => return Ok(Some(MidiEvent::new(delta_pulses, kind))),
                None => carried = delta_pulses,
            }
        }

        Ok(None)
    }

    fn read_kind(&mut self) -> Result<Option<EventKind>> {
        let first = self.reader.peek_u8().ok_or(MidiFileError::EventTooShort)?;

        let status = if first < 0x80 {
            self.running_status
                .ok_or(MidiFileError::UnknownEventType(first))?
        } else {
            self.reader.read_u8();
            if first < 0xF0 {
                self.running_status = Some(first);
            }
            first
        };

        let channel = status & 0x0F;
        let kind = match status & 0xF0 {
            0x80 => {
                let (note, velocity) = self.read_pair()?;
                EventKind::NoteOff { channel, note, velocity }
            }
            0x90 => {
                let (note, velocity) = self.read_pair()?;
                EventKind::NoteOn { channel, note, velocity }
            }
            0xA0 => {
                let (note, pressure) = self.read_pair()?;
                EventKind::Aftertouch { channel, note, pressure }
            }
            0xB0 => {
                let (controller, value) = self.read_pair()?;
                EventKind::Controller {
                    channel,
                    controller,
                    value,
                }
            }
            0xC0 => EventKind::ProgramChange {
                channel,
                program: self.read_data()?,
            },
            0xD0 => EventKind::ChannelPressure {
                channel,
                pressure: self.read_data()?,
            },
            0xE0 => {
                let (lsb, msb) = self.read_pair()?;
                EventKind::PitchWheel {
                    channel,
                    value: (u16::from(msb & 0x7F) << 7) | u16::from(lsb & 0x7F),
                }
            }
            _ => match status {
                0xF0 | 0xF7 => EventKind::SysEx(self.read_blob()?.to_vec()),
                0xFF => return self.read_meta(),
                other => return Err(MidiFileError::UnknownEventType(other)),
            },
        };

        Ok(Some(kind))
    }

    fn read_data(&mut self) -> Result<u8> {
        self.reader.read_u8().ok_or(MidiFileError::EventTooShort)
    }

    fn read_pair(&mut self) -> Result<(u8, u8)> {
        Ok((self.read_data()?, self.read_data()?))
    }

    fn read_blob(&mut self) -> Result<&'a [u8]> {
        let len = self
            .reader
            .read_vlq()
            .ok_or(MidiFileError::EventTooShort)? as usize;
        self.reader
            .read_bytes(len)
            .ok_or(MidiFileError::EventTooShort)
    }

    fn read_meta(&mut self) -> Result<Option<EventKind>> {
        let meta_type = self.read_data()?;
        let data = self.read_blob()?;

        let meta = match meta_type {
            0x00 => {
                let bytes = take(data, 2)?;
                MetaEvent::SequenceNumber(u16::from_be_bytes([bytes[0], bytes[1]]))
            }
            0x01..=0x09 => {
                let kind = match meta_type {
                    0x01 => TextKind::Text,
                    0x02 => TextKind::Copyright,
                    0x03 => TextKind::TrackName,
                    0x04 => TextKind::InstrumentName,
                    0x05 => TextKind::Lyric,
                    0x06 => TextKind::Marker,
                    0x07 => TextKind::CuePoint,
                    0x08 => TextKind::ProgramName,
                    _ => TextKind::DeviceName,
                };
                MetaEvent::Text(kind, String::from_utf8_lossy(data).into_owned())
            }
            0x20 => MetaEvent::ChannelPrefix(take(data, 1)?[0]),
            0x21 => MetaEvent::MidiPort(take(data, 1)?[0]),
            0x2F => MetaEvent::EndOfTrack,
            0x51 => {
                let bytes = take(data, 3)?;
                MetaEvent::TempoChange(
                    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]),
                )
            }
            0x54 => {
                let bytes = take(data, 5)?;
                MetaEvent::SmpteOffset([bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]])
            }
            0x58 => {
                let bytes = take(data, 4)?;
                MetaEvent::TimeSignature {
                    numerator: bytes[0],
                    denominator_power: bytes[1],
                    clocks_per_click: bytes[2],
                    thirty_seconds_per_quarter: bytes[3],
                }
            }
            0x59 => {
                let bytes = take(data, 2)?;
                MetaEvent::KeySignature {
                    sharps: bytes[0] as i8,
                    minor: bytes[1] != 0,
                }
            }
            0x7F => MetaEvent::Proprietary(data.to_vec()),
            unknown => {
                warn!(
                    "Skipping unknown meta event type {:#04x} ({} bytes)",
                    unknown,
                    data.len()
                );
                return Ok(None);
            }
        };

        Ok(Some(EventKind::Meta(meta)))
    }
}

fn take(data: &[u8], len: usize) -> Result<&[u8]> {
    data.get(..len).ok_or(MidiFileError::EventTooShort)
}
