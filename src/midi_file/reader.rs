//! Chunk-level decoding of Standard MIDI Files.
//!
//! Handles the `MThd` header, optional RIFF/RMID wrapping and splitting the
//! byte stream into `MTrk` chunks. Event decoding lives in
//! [`super::event`].

use super::error::{MidiFileError, Result};
use super::event::{EventReader, MidiEvent};
use log::debug;

/// Big-endian cursor over a byte slice.
///
/// Every read returns `None` once the slice is exhausted so callers can map
/// a short read to the error that fits their context.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub(crate) fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    pub(crate) fn read_u8(&mut self) -> Option<u8> {
        let byte = self.peek_u8()?;
        self.offset += 1;
        Some(byte)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        let bytes = self.data.get(self.offset..end)?;
        self.offset = end;
        Some(bytes)
    }

    pub(crate) fn read_tag(&mut self) -> Option<[u8; 4]> {
        let bytes = self.read_bytes(4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub(crate) fn read_u16_be(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32_be(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u32_le(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a variable-length quantity: 7 bits per byte, high bit set on
    /// every byte except the last.
    pub(crate) fn read_vlq(&mut self) -> Option<u32> {
        let mut value = 0u32;
        loop {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Some(value);
            }
        }
    }
}

/// SMF format declared in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    SingleTrack,
    Parallel,
}

/// The decoded contents of a file before any tempo or note processing.
#[derive(Debug, Clone)]
pub struct RawSmf {
    pub format: Format,
    pub pulses_per_quarter_note: u16,
    pub tracks: Vec<Vec<MidiEvent>>,
}

/// Decodes a complete SMF byte stream, unwrapping RIFF/RMID if present.
pub fn decode(data: &[u8]) -> Result<RawSmf> {
    let mut reader = ByteReader::new(data);
    let tag = reader.read_tag().ok_or(MidiFileError::UnknownHeaderType)?;

    match &tag {
        b"RIFF" => decode(unwrap_riff(&mut reader)?),
        b"MThd" => decode_smf(&mut reader),
        _ => Err(MidiFileError::UnknownHeaderType),
    }
}

/// Skips the RIFF container headers and returns the payload of its `data`
/// chunk, which holds the actual SMF.
fn unwrap_riff<'a>(reader: &mut ByteReader<'a>) -> Result<&'a [u8]> {
    reader
        .read_u32_le()
        .ok_or(MidiFileError::UnknownHeaderType)?;

    let form = reader.read_tag().ok_or(MidiFileError::UnknownHeaderType)?;
    if &form != b"RMID" {
        return Err(MidiFileError::UnknownHeaderType);
    }

    loop {
        let id = reader.read_tag().ok_or(MidiFileError::UnknownHeaderType)?;
        let len = reader
            .read_u32_le()
            .ok_or(MidiFileError::UnknownHeaderType)? as usize;

        if &id == b"data" {
            debug!("Unwrapping RIFF/RMID container ({} byte payload)", len);
            // Some writers get the data length wrong; take what is there.
            let len = len.min(reader.remaining());
            return reader.read_bytes(len).ok_or(MidiFileError::UnknownHeaderType);
        }

        // Sub-chunks are padded to an even length.
        let padded = (len + (len & 1)).min(reader.remaining());
        reader
            .read_bytes(padded)
            .ok_or(MidiFileError::UnknownHeaderType)?;
        if reader.is_empty() {
            return Err(MidiFileError::UnknownHeaderType);
        }
    }
}

fn decode_smf(reader: &mut ByteReader<'_>) -> Result<RawSmf> {
    let header_len = reader.read_u32_be().ok_or(MidiFileError::BadHeaderSize)?;
    if header_len != 6 {
        return Err(MidiFileError::BadHeaderSize);
    }

    let format = reader.read_u16_be().ok_or(MidiFileError::BadHeaderSize)?;
    let track_count = reader.read_u16_be().ok_or(MidiFileError::BadHeaderSize)?;
    let division = reader.read_u16_be().ok_or(MidiFileError::BadHeaderSize)?;

    let format = match format {
        0 => Format::SingleTrack,
        1 => Format::Parallel,
        2 => return Err(MidiFileError::Type2MidiNotSupported),
        _ => return Err(MidiFileError::UnknownHeaderType),
    };

    if format == Format::SingleTrack && track_count != 1 {
        return Err(MidiFileError::BadType0Midi);
    }

    if division & 0x8000 != 0 {
        return Err(MidiFileError::SmpteTimingNotImplemented);
    }
    let pulses_per_quarter_note = division & 0x7FFF;

    let tracks = (0..track_count)
        .map(|_| decode_track(reader))
        .collect::<Result<Vec<_>>>()?;

    Ok(RawSmf {
        format,
        pulses_per_quarter_note,
        tracks,
    })
}

fn decode_track(reader: &mut ByteReader<'_>) -> Result<Vec<MidiEvent>> {
    let tag = reader
        .read_tag()
        .ok_or(MidiFileError::TrackHeaderTooShort)?;
    if &tag != b"MTrk" {
        return Err(MidiFileError::UnknownHeaderType);
    }

    let len = reader
        .read_u32_be()
        .ok_or(MidiFileError::TrackHeaderTooShort)? as usize;
    let body = reader.read_bytes(len).ok_or(MidiFileError::TrackTooShort)?;

    let mut events = EventReader::new(body);
    let mut track = Vec::new();
    while let Some(event) = events.next_event()? {
        track.push(event);
    }
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlq_decoding() {
        let cases: &[(&[u8], u32)] = &[
            (&[0x00], 0),
            (&[0x7F], 0x7F),
            (&[0x81, 0x00], 0x80),
            (&[0xC0, 0x00], 0x2000),
            (&[0xFF, 0x7F], 0x3FFF),
            (&[0x81, 0x80, 0x00], 0x4000),
            (&[0xFF, 0xFF, 0xFF, 0x7F], 0x0FFF_FFFF),
        ];

        for (bytes, expected) in cases {
            let mut reader = ByteReader::new(bytes);
            assert_eq!(reader.read_vlq(), Some(*expected), "bytes {:02x?}", bytes);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_truncated_vlq_is_none() {
        let mut reader = ByteReader::new(&[0x81, 0x80]);
        assert_eq!(reader.read_vlq(), None);
    }

    #[test]
    fn test_unknown_magic_rejected() {
        let result = decode(b"RIFX\x00\x00\x00\x00");
        assert!(matches!(result, Err(MidiFileError::UnknownHeaderType)));
    }

    #[test]
    fn test_bad_header_size_rejected() {
        let data = [
            b'M', b'T', b'h', b'd', 0, 0, 0, 7, 0, 0, 0, 1, 0, 96, 0,
        ];
        assert!(matches!(decode(&data), Err(MidiFileError::BadHeaderSize)));
    }

    #[test]
    fn test_smpte_division_rejected() {
        let data = [b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 1, 0xE7, 0x28];
        assert!(matches!(
            decode(&data),
            Err(MidiFileError::SmpteTimingNotImplemented)
        ));
    }

    #[test]
    fn test_type0_with_two_tracks_rejected() {
        let data = [b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 2, 0, 96];
        assert!(matches!(decode(&data), Err(MidiFileError::BadType0Midi)));
    }

    #[test]
    fn test_missing_track_header() {
        let data = [b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 1, 0, 96, b'M', b'T'];
        assert!(matches!(
            decode(&data),
            Err(MidiFileError::TrackHeaderTooShort)
        ));
    }

    #[test]
    fn test_track_shorter_than_declared() {
        let data = [
            b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 1, 0, 96, b'M', b'T', b'r', b'k', 0, 0,
            0, 10, 0x00, 0xFF, 0x2F, 0x00,
        ];
        assert!(matches!(decode(&data), Err(MidiFileError::TrackTooShort)));
    }
}
