use keyfall::config::Settings;
use keyfall::judge::ScoreStats;
use keyfall::stats::{SavedStats, SongResult};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_missing_settings_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let settings = Settings::load_from(&dir.path().join("settings.toml")).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_settings_survive_a_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.toml");
    let settings = Settings {
        last_file: Some("songs/prelude.mid".into()),
        output_device: Some("Synth".to_string()),
        speed: 80,
        ..Settings::default()
    };

    settings.save_to(&path).unwrap();
    assert_eq!(Settings::load_from(&path).unwrap(), settings);
}

#[test]
fn test_partial_settings_file_keeps_other_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "speed = 900\nlead_in_ms = 0\n").unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.speed, 400);
    assert_eq!(settings.lead_in_us(), 0);
    assert_eq!(settings.refresh_rate, 65);
}

fn result(song: &str, score: f64) -> SongResult {
    let stats = ScoreStats {
        score,
        ..ScoreStats::default()
    };
    SongResult::from_stats(song, &stats)
}

#[test]
fn test_stats_append_and_best_score() {
    let dir = tempdir().unwrap();
    let saved = SavedStats::new(dir.path().join("stats.json"));
    assert!(saved.load().unwrap().is_empty());
    assert_eq!(saved.best_score("a").unwrap(), None);

    saved.append(result("a", 120.0)).unwrap();
    saved.append(result("b", 500.0)).unwrap();
    saved.append(result("a", 340.0)).unwrap();

    let all = saved.load().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].song, "b");
    assert_eq!(saved.best_score("a").unwrap(), Some(340.0));
}

#[test]
fn test_corrupt_stats_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stats.json");
    fs::write(&path, "not json").unwrap();

    assert!(SavedStats::new(path).load().is_err());
}
