use super::error::{MidiFileError, Result};
use super::note::{Microseconds, NoteSet, TranslatedNote};
use super::program_map::ProgramMap;
use super::reader::{decode, Format};
use super::tempo::{build_tempo_track, extract_tempo_events, TempoMap, MAX_TIME_US};
use super::track::Track;
use crate::config::{BEATS_PER_BAR, MAX_BAR_LINES};
use log::{info, warn};
use std::fs;
use std::path::Path;

/// A decoded song, ready to be played.
///
/// Tempo changes are pulled out of the source tracks into one synthetic
/// track that is always the last entry of [`MidiFile::tracks`].
#[derive(Debug, Clone)]
pub struct MidiFile {
    name: String,
    format: Format,
    tempo: TempoMap,
    tracks: Vec<Track>,
    notes: NoteSet<Microseconds>,
    programs: ProgramMap,
    dead_air: Microseconds,
    song_end: Microseconds,
    bar_lines: Vec<Microseconds>,
}

impl MidiFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| MidiFileError::BadFilename {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(name, &data)
    }

    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Result<Self> {
        let name = name.into();
        let raw = decode(data)?;
        let ppqn = raw.pulses_per_quarter_note;

        let mut track_events = raw.tracks;
        let tempo_events = extract_tempo_events(&mut track_events);
        let tempo = TempoMap::new(&tempo_events, ppqn);
        track_events.push(build_tempo_track(&tempo_events));

        let tracks: Vec<Track> = track_events
            .into_iter()
            .enumerate()
            .map(|(track_id, events)| Track::new(track_id, events, &tempo))
            .collect();

        let notes = NoteSet::new(
            tracks
                .iter()
                .flat_map(|t| t.notes().iter().copied())
                .collect(),
        );

        let dead_air = tracks
            .iter()
            .filter_map(Track::first_note_on_pulse)
            .min()
            .map(|pulse| tempo.pulses_to_microseconds(pulse) - 1)
            .unwrap_or(0);

        let song_end = notes.last().map(|n| n.end).unwrap_or(0);
        let bar_lines = bar_lines(&tempo, song_end);
        let programs = ProgramMap::new(&tracks);

        info!(
            "Loaded '{}': {:?}, {} ppqn, {} tracks, {} notes, {} tempo changes",
            name,
            raw.format,
            ppqn,
            tracks.len(),
            notes.len(),
            tempo.tempo_changes()
        );

        Ok(Self {
            name,
            format: raw.format,
            tempo,
            tracks,
            notes,
            programs,
            dead_air,
            song_end,
            bar_lines,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn pulses_per_quarter_note(&self) -> u16 {
        self.tempo.pulses_per_quarter_note()
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Every note of the song in `(start, end, note_id, track_id)` order.
    pub fn notes(&self) -> &[TranslatedNote] {
        self.notes.as_slice()
    }

    pub fn program_map(&self) -> &ProgramMap {
        &self.programs
    }

    /// One microsecond before the first sounding note.
    pub fn dead_air(&self) -> Microseconds {
        self.dead_air
    }

    /// End of the last note in set order.
    pub fn song_end(&self) -> Microseconds {
        self.song_end
    }

    /// Playable length, measured from the dead-air offset.
    pub fn song_length(&self) -> Microseconds {
        self.song_end.saturating_sub(self.dead_air).max(0)
    }

    pub fn bar_lines(&self) -> &[Microseconds] {
        &self.bar_lines
    }
}

/// Bar starts assuming 4/4 throughout, up to and including the first bar
/// past `song_end`. At most [`MAX_BAR_LINES`] are generated.
fn bar_lines(tempo: &TempoMap, song_end: Microseconds) -> Vec<Microseconds> {
    let bar_pulses = u64::from(tempo.pulses_per_quarter_note()) * BEATS_PER_BAR;
    let mut lines = Vec::new();
    let mut pulse = 0u64;

    while lines.len() < MAX_BAR_LINES {
        let time = tempo.pulses_to_microseconds(pulse);
        lines.push(time);
        if time > song_end || time >= MAX_TIME_US {
            return lines;
        }
        pulse = pulse.saturating_add(bar_pulses);
    }

    warn!("Song ends after more than {} bars, bar lines truncated", MAX_BAR_LINES);
    lines
}
