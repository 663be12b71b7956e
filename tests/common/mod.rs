//! Builds Standard MIDI Files in memory for the integration tests.
#![allow(dead_code)]

#[derive(Default)]
pub struct TrackBuilder {
    bytes: Vec<u8>,
}

fn vlq(mut value: u32) -> Vec<u8> {
    let mut out = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        out.insert(0, 0x80 | (value & 0x7F) as u8);
        value >>= 7;
    }
    out
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn event(mut self, delta: u32, body: &[u8]) -> Self {
        self.bytes.extend(vlq(delta));
        self.bytes.extend_from_slice(body);
        self
    }

    pub fn note_on(self, delta: u32, channel: u8, note: u8, velocity: u8) -> Self {
        self.event(delta, &[0x90 | channel, note, velocity])
    }

    pub fn note_off(self, delta: u32, channel: u8, note: u8) -> Self {
        self.event(delta, &[0x80 | channel, note, 0])
    }

    pub fn program(self, delta: u32, channel: u8, program: u8) -> Self {
        self.event(delta, &[0xC0 | channel, program])
    }

    pub fn tempo(self, delta: u32, us_per_quarter: u32) -> Self {
        let t = us_per_quarter.to_be_bytes();
        self.event(delta, &[0xFF, 0x51, 0x03, t[1], t[2], t[3]])
    }

    pub fn name(self, delta: u32, name: &str) -> Self {
        let mut body = vec![0xFF, 0x03];
        body.extend(vlq(name.len() as u32));
        body.extend_from_slice(name.as_bytes());
        self.event(delta, &body)
    }

    pub fn end(self) -> Vec<u8> {
        self.event(0, &[0xFF, 0x2F, 0x00]).bytes
    }
}

fn chunk(tag: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

pub fn smf(format: u16, ppqn: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&format.to_be_bytes());
    header.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    header.extend_from_slice(&ppqn.to_be_bytes());

    let mut out = chunk(b"MThd", &header);
    for track in tracks {
        out.extend(chunk(b"MTrk", track));
    }
    out
}

/// Wraps an SMF in a RIFF/RMID container with an extra chunk in front of
/// the data chunk.
pub fn riff(smf: &[u8]) -> Vec<u8> {
    let mut body = b"RMID".to_vec();
    body.extend_from_slice(b"INFO");
    body.extend_from_slice(&3u32.to_le_bytes());
    body.extend_from_slice(&[1, 2, 3, 0]);
    body.extend_from_slice(b"data");
    body.extend_from_slice(&(smf.len() as u32).to_le_bytes());
    body.extend_from_slice(smf);

    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend(body);
    out
}

/// One quarter note per beat on `pitch`, starting at beat `first_beat`,
/// for `count` beats. 480 ppqn.
pub fn quarter_notes(first_beat: u32, count: u32, pitch: u8) -> Vec<u8> {
    let mut track = TrackBuilder::new();
    for i in 0..count {
        let delta = if i == 0 { first_beat * 480 } else { 0 };
        track = track.note_on(delta, 0, pitch, 100).note_off(480, 0, pitch);
    }
    track.end()
}
