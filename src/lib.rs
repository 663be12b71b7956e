pub mod cli;
pub mod config;
pub mod judge;
pub mod logging;
pub mod midi;
pub mod midi_file;
pub mod session;
pub mod stats;
pub mod transport;
pub mod ui;

pub use cli::Args;
pub use judge::{Judge, JudgeConfig, TrackMode, TrackSettings};
pub use midi_file::{MidiFile, MidiFileError};
pub use session::{Session, SessionOptions};
pub use transport::Transport;

/// Names of every MIDI port, inputs first.
pub fn handle_device_list() -> Vec<String> {
    let (inputs, outputs) = midi::list_devices();
    inputs
        .into_iter()
        .chain(outputs)
        .map(|device| device.name)
        .collect()
}
