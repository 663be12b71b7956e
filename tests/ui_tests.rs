use keyfall::midi_file::{NoteState, TranslatedNote};
use keyfall::stats::SongResult;
use keyfall::ui::{create_song_progress, FrameView, Presenter, ProgressPresenter};
use std::collections::BTreeSet;

static NO_KEYS: BTreeSet<u8> = BTreeSet::new();

fn note(start: i64, end: i64) -> TranslatedNote {
    TranslatedNote {
        start,
        end,
        note_id: 60,
        track_id: 0,
        channel: 0,
        velocity: 100,
        state: NoteState::UserPlayable,
        retry_state: NoteState::UserPlayable,
    }
}

fn view<'a>(notes: Vec<&'a TranslatedNote>, bars: &'a [i64]) -> FrameView<'a> {
    FrameView {
        song: "song",
        position: 1_000_000,
        show_duration: 2_000_000,
        notes,
        bar_lines: bars,
        percentage: 0.25,
        score: 1234.0,
        combo: 7,
        speed: 100,
        paused: false,
        waiting: false,
        pressed: &NO_KEYS,
        loop_region: None,
    }
}

#[test]
fn test_song_progress_creation() {
    let progress = create_song_progress("song");
    assert_eq!(progress.length(), Some(1000));
    assert_eq!(progress.position(), 0);
    assert_eq!(progress.prefix(), "song");
}

#[test]
fn test_visible_notes_overlap_the_window() {
    let before = note(0, 500_000);
    let touching = note(500_000, 1_000_000);
    let inside = note(2_000_000, 2_500_000);
    let after = note(3_000_001, 3_500_000);
    let frame = view(vec![&before, &touching, &inside, &after], &[]);

    let visible: Vec<i64> = frame.visible_notes().map(|n| n.start).collect();
    assert_eq!(visible, vec![500_000, 2_000_000]);
}

#[test]
fn test_visible_bar_lines() {
    let bars = [0, 2_000_000, 4_000_000];
    let frame = view(Vec::new(), &bars);
    assert_eq!(frame.visible_bar_lines().collect::<Vec<_>>(), vec![2_000_000]);
}

#[test]
fn test_presenter_tracks_percentage() {
    let mut presenter = ProgressPresenter::hidden("song");
    presenter.present(&view(Vec::new(), &[]));

    assert_eq!(presenter.bar().position(), 250);
    assert!(presenter.bar().message().contains("combo 7"));
}

#[test]
fn test_presenter_shows_waiting() {
    let mut presenter = ProgressPresenter::hidden("song");
    let mut frame = view(Vec::new(), &[]);
    frame.waiting = true;
    presenter.present(&frame);
    assert!(presenter.bar().message().ends_with("[waiting]"));
}

#[test]
fn test_held_keys_and_loop_marker() {
    let held: BTreeSet<u8> = [60, 64].into_iter().collect();
    let mut frame = view(Vec::new(), &[]);
    frame.pressed = &held;
    frame.loop_region = Some((0, 2_000_000));

    assert!(frame.is_pressed(64));
    assert!(!frame.is_pressed(62));

    let mut presenter = ProgressPresenter::hidden("song");
    presenter.present(&frame);
    assert!(presenter.bar().message().ends_with("[loop]"));
}

#[test]
fn test_presenter_finish() {
    let mut presenter = ProgressPresenter::hidden("song");
    let result = SongResult {
        song: "song".to_string(),
        played_at: chrono::Utc::now(),
        score: 300.0,
        hits: 3,
        misses: 1,
        stray_notes: 0,
        longest_combo: 3,
        average_speed: Some(100.0),
    };
    presenter.finish(&result);

    assert!(presenter.bar().is_finished());
    assert!(presenter.bar().message().contains("misses 1"));
}
