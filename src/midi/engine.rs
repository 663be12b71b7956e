use std::error::Error;
use std::fmt;

/// Custom error type for MIDI device operations
#[derive(Debug)]
pub enum MidiError {
    /// Error when sending a MIDI message
    SendError(String),
    /// Error when receiving a MIDI message
    RecvError(String),
    /// Error when connecting to a MIDI device
    ConnectionError(String),
    /// No port with the requested id or name exists
    NoSuchDevice(String),
    /// The platform MIDI client could not be created
    Init(String),
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiError::SendError(msg) => write!(f, "MIDI send error: {}", msg),
            MidiError::RecvError(msg) => write!(f, "MIDI receive error: {}", msg),
            MidiError::ConnectionError(msg) => write!(f, "MIDI connection error: {}", msg),
            MidiError::NoSuchDevice(name) => write!(f, "MIDI device not found: {}", name),
            MidiError::Init(msg) => write!(f, "MIDI initialisation error: {}", msg),
        }
    }
}

impl Error for MidiError {}

/// Represents a MIDI message that can be sent or received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On message with note number and velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off message with note number and velocity
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Polyphonic key pressure
    Aftertouch { channel: u8, note: u8, pressure: u8 },
    /// Control Change message with controller number and value
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    /// Program Change message with program number
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit pitch bend, 0x2000 is centre
    PitchBend { channel: u8, value: u16 },
}

impl MidiMessage {
    /// Controller 123, "all notes off", on one channel.
    pub fn all_notes_off(channel: u8) -> Self {
        MidiMessage::ControlChange {
            channel,
            controller: 123,
            value: 0,
        }
    }

    /// Decodes one channel message. Running status is not supported here:
    /// device drivers always deliver complete messages. System messages
    /// decode to `None`.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        let channel = status & 0x0F;
        let byte = |i: usize| data.get(i).copied();

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff {
                channel,
                note: byte(1)?,
                velocity: byte(2)?,
            }),
            0x90 => Some(MidiMessage::NoteOn {
                channel,
                note: byte(1)?,
                velocity: byte(2)?,
            }),
            0xA0 => Some(MidiMessage::Aftertouch {
                channel,
                note: byte(1)?,
                pressure: byte(2)?,
            }),
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                controller: byte(1)?,
                value: byte(2)?,
            }),
            0xC0 => Some(MidiMessage::ProgramChange {
                channel,
                program: byte(1)?,
            }),
            0xD0 => Some(MidiMessage::ChannelPressure {
                channel,
                pressure: byte(1)?,
            }),
            0xE0 => {
                let lsb = u16::from(byte(1)? & 0x7F);
                let msb = u16::from(byte(2)? & 0x7F);
                Some(MidiMessage::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![0x80 | (channel & 0x0F), note, velocity],
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note, velocity],
            MidiMessage::Aftertouch {
                channel,
                note,
                pressure,
            } => vec![0xA0 | (channel & 0x0F), note, pressure],
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | (channel & 0x0F), controller, value],
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program]
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                vec![0xD0 | (channel & 0x0F), pressure]
            }
            MidiMessage::PitchBend { channel, value } => vec![
                0xE0 | (channel & 0x0F),
                (value & 0x7F) as u8,
                ((value >> 7) & 0x7F) as u8,
            ],
        }
    }
}

/// A port as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in the platform's port list at the time it was listed.
    pub id: usize,
    pub name: String,
}

/// Result type for MIDI operations
pub type Result<T> = std::result::Result<T, MidiError>;

/// Trait defining the interface for MIDI device adapters
///
/// Reads never block: `recv` returns `None` once everything that has
/// arrived so far has been drained.
pub trait MidiEngine: Send {
    fn list_outputs(&self) -> Vec<DeviceInfo>;

    fn list_inputs(&self) -> Vec<DeviceInfo>;

    fn open_output(&mut self, id: usize) -> Result<()>;

    fn open_input(&mut self, id: usize) -> Result<()>;

    /// Sends a MIDI message to the output device
    ///
    /// Sending while no output is connected is a no-op.
    fn send(&mut self, msg: MidiMessage) -> Result<()>;

    /// Takes the next message received from the input device, if any
    fn recv(&mut self) -> Option<MidiMessage>;

    fn has_pending(&self) -> bool;

    /// Silences every channel of the output device
    fn reset_all_notes(&mut self) -> Result<()> {
        for channel in 0..16 {
            self.send(MidiMessage::all_notes_off(channel))?;
        }
        Ok(())
    }

    /// Reopens previously opened ports after a device was unplugged
    fn reconnect(&mut self) -> Result<()>;
}
