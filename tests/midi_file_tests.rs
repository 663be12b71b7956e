mod common;

use common::{quarter_notes, riff, smf, TrackBuilder};
use keyfall::config::MAX_BAR_LINES;
use keyfall::midi_file::{
    decode, extract_tempo_events, Instrument, MidiEvent, MidiFile, MidiFileError, MAX_TIME_US,
};

#[test]
fn test_single_note_at_default_tempo() {
    let track = TrackBuilder::new()
        .note_on(480, 0, 60, 100)
        .note_off(480, 0, 60)
        .end();
    let file = MidiFile::from_bytes("single", &smf(0, 480, &[track])).unwrap();

    assert_eq!(file.notes().len(), 1);
    let note = file.notes()[0];
    assert_eq!((note.start, note.end), (500_000, 1_000_000));
    assert_eq!(note.note_id, 60);
}

#[test]
fn test_single_note_at_60_bpm() {
    let track = TrackBuilder::new()
        .tempo(0, 1_000_000)
        .note_on(480, 0, 60, 100)
        .note_off(480, 0, 60)
        .end();
    let file = MidiFile::from_bytes("single", &smf(0, 480, &[track])).unwrap();

    let note = file.notes()[0];
    assert_eq!((note.start, note.end), (1_000_000, 2_000_000));
}

#[test]
fn test_riff_wrapped_file_matches_plain_file() {
    let track = TrackBuilder::new()
        .name(0, "Melody")
        .program(0, 0, 4)
        .tempo(0, 400_000)
        .note_on(96, 0, 64, 90)
        .note_off(96, 0, 64)
        .end();
    let plain = smf(0, 96, &[track]);

    let a = MidiFile::from_bytes("plain", &plain).unwrap();
    let b = MidiFile::from_bytes("wrapped", &riff(&plain)).unwrap();

    assert_eq!(a.notes(), b.notes());
    assert_eq!(a.bar_lines(), b.bar_lines());
    assert_eq!(a.dead_air(), b.dead_air());
    assert_eq!(decode(&plain).unwrap().tracks, decode(&riff(&plain)).unwrap().tracks);
}

#[test]
fn test_format_2_rejected() {
    let data = smf(2, 480, &[quarter_notes(0, 1, 60), quarter_notes(0, 1, 62)]);
    assert!(matches!(
        MidiFile::from_bytes("f2", &data),
        Err(MidiFileError::Type2MidiNotSupported)
    ));
}

#[test]
fn test_format_2_rejected_before_tracks_are_read() {
    // The declared track is missing entirely.
    let mut data = smf(2, 480, &[]);
    data[11] = 1;
    assert!(matches!(
        decode(&data),
        Err(MidiFileError::Type2MidiNotSupported)
    ));
}

#[test]
fn test_tempo_extraction_keeps_track_lengths() {
    let tracks = vec![
        TrackBuilder::new()
            .tempo(0, 600_000)
            .note_on(100, 0, 60, 100)
            .tempo(50, 300_000)
            .note_off(70, 0, 60)
            .end(),
        TrackBuilder::new()
            .note_on(33, 1, 70, 100)
            .tempo(11, 450_000)
            .note_off(200, 1, 70)
            .tempo(9, 250_000)
            .end(),
    ];
    let mut raw = decode(&smf(1, 96, &tracks)).unwrap().tracks;
    fn lengths(tracks: &[Vec<MidiEvent>]) -> Vec<u64> {
        tracks
            .iter()
            .map(|t| t.iter().map(|e| u64::from(e.delta_pulses)).sum())
            .collect()
    }

    let before = lengths(&raw);
    let tempos = extract_tempo_events(&mut raw);
    assert_eq!(lengths(&raw), before);
    assert_eq!(tempos.len(), 4);
}

#[test]
fn test_notes_are_ordered_across_tracks() {
    let tracks = vec![
        quarter_notes(2, 3, 60),
        quarter_notes(0, 4, 48),
        TrackBuilder::new()
            .note_on(480, 0, 72, 100)
            .note_on(0, 0, 67, 100)
            .note_off(960, 0, 72)
            .note_off(0, 0, 67)
            .end(),
    ];
    let file = MidiFile::from_bytes("ordered", &smf(1, 480, &tracks)).unwrap();

    let keys: Vec<_> = file.notes().iter().map(|n| n.key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(file.notes().len(), 3 + 4 + 2);
}

#[test]
fn test_track_metadata() {
    let tracks = vec![
        TrackBuilder::new()
            .name(0, "Right Hand")
            .program(0, 0, 0)
            .note_on(0, 0, 72, 100)
            .note_off(480, 0, 72)
            .end(),
        TrackBuilder::new()
            .note_on(0, 9, 36, 100)
            .note_off(480, 9, 36)
            .end(),
    ];
    let file = MidiFile::from_bytes("meta", &smf(1, 480, &tracks)).unwrap();

    assert_eq!(file.tracks()[0].name(), Some("Right Hand"));
    assert_eq!(file.tracks()[0].instrument(), Instrument::Program(0));
    assert_eq!(file.tracks()[1].instrument(), Instrument::Percussion);
    // Synthetic tempo track.
    assert_eq!(file.tracks()[2].instrument(), Instrument::None);
}

#[test]
fn test_program_map_after_changes() {
    let track = TrackBuilder::new()
        .program(0, 2, 10)
        .note_on(0, 2, 60, 100)
        .program(480, 2, 20)
        .note_off(480, 2, 60)
        .end();
    let file = MidiFile::from_bytes("programs", &smf(0, 480, &[track])).unwrap();

    assert_eq!(file.program_map().programs_at(0)[2], 10);
    assert_eq!(file.program_map().programs_at(500_000)[2], 20);
}

#[test]
fn test_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.mid");
    std::fs::write(&path, smf(0, 480, &[quarter_notes(1, 2, 60)])).unwrap();

    let file = MidiFile::load(&path).unwrap();
    assert_eq!(file.name(), "song.mid");
    assert_eq!(file.notes().len(), 2);
}

#[test]
fn test_extreme_lengths_saturate_and_cap_bar_lines() {
    // Slowest tempo, one pulse per quarter and maximal deltas: the note
    // would end far past what a signed microsecond count can hold.
    let mut track = TrackBuilder::new()
        .tempo(0, 0xFF_FFFF)
        .note_on(0, 0, 60, 100);
    for _ in 0..600 {
        track = track.program(0x0FFF_FFFF, 0, 0);
    }
    let track = track.note_off(0x0FFF_FFFF, 0, 60).end();

    let file = MidiFile::from_bytes("endless", &smf(0, 1, &[track])).unwrap();

    assert_eq!(file.song_end(), MAX_TIME_US);
    assert_eq!(file.notes()[0].end, MAX_TIME_US);
    assert!(file.song_length() > 0);
    assert_eq!(file.bar_lines().len(), MAX_BAR_LINES);
    assert!(file.bar_lines().windows(2).all(|w| w[0] < w[1]));
}
