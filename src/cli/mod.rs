use crate::judge::{TrackMode, TrackSettings};
use crate::midi::DeviceInfo;
use clap::Parser;
use dialoguer::Select;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// MIDI file to play; defaults to the last file played
    pub file: Option<PathBuf>,

    /// List available MIDI devices
    #[arg(long)]
    pub device_list: bool,

    /// Input device to play on (substring of its name)
    #[arg(long)]
    pub input: Option<String>,

    /// Output device to play through (substring of its name)
    #[arg(long)]
    pub output: Option<String>,

    /// Choose input and output devices interactively
    #[arg(long)]
    pub select_devices: bool,

    /// Playback speed in percent
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=400))]
    pub speed: Option<u32>,

    /// Track number to play yourself (repeatable)
    #[arg(long = "play-track", value_name = "N")]
    pub play_tracks: Vec<usize>,

    /// Wait for each of your notes before moving on
    #[arg(long)]
    pub learn: bool,

    /// Replay a bar when you miss one of its notes
    #[arg(long)]
    pub retry: bool,
}

impl Args {
    /// Play modes for a file with `track_count` tracks.
    pub fn track_settings(&self, track_count: usize) -> Vec<TrackSettings> {
        (0..track_count)
            .map(|id| {
                if !self.play_tracks.contains(&id) {
                    return TrackSettings::default();
                }
                let mode = if self.learn {
                    TrackMode::Learning
                } else {
                    TrackMode::YouPlay
                };
                TrackSettings {
                    mode,
                    retry: self.retry,
                }
            })
            .collect()
    }
}

pub fn validate_device(device_name: &str, devices: &[DeviceInfo]) -> Result<(), String> {
    if !devices.iter().any(|d| d.name.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device.name));
        }
        return Err(error_msg);
    }
    Ok(())
}

/// Asks the user to pick one of `devices`; `None` means no device.
pub fn select_device(prompt: &str, devices: &[DeviceInfo]) -> Option<String> {
    let mut items: Vec<&str> = vec!["(none)"];
    items.extend(devices.iter().map(|d| d.name.as_str()));

    let choice = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()
        .ok()
        .flatten()?;

    devices.get(choice.checked_sub(1)?).map(|d| d.name.clone())
}
