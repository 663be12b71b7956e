//! MIDI device I/O for keyfall
//!
//! This module provides MIDI communication capabilities, including:
//! - Core MIDI message types and error handling
//! - Real MIDI device communication via midir
//! - Mock implementations for testing
//!
//! The main components are:
//! - [`MidiEngine`] trait for sending and receiving MIDI messages
//! - [`MidirEngine`] for real MIDI device communication
//! - [`MockMidiEngine`] for testing
//! - [`MidiDeviceContext`] which owns an engine and hides device failures
//!
mod context;
mod engine;
pub mod midir_engine;
pub mod mock_engine;

pub use context::MidiDeviceContext;
pub use engine::{DeviceInfo, MidiEngine, MidiError, MidiMessage, Result};

pub use midir_engine::{find_device, MidirEngine};
pub use mock_engine::MockMidiEngine;

// Set default engine type
#[cfg(not(feature = "test-mock"))]
pub type DefaultMidiEngine = MidirEngine;
#[cfg(feature = "test-mock")]
pub type DefaultMidiEngine = MockMidiEngine;

/// Names of all input and output ports, in that order.
pub fn list_devices() -> (Vec<DeviceInfo>, Vec<DeviceInfo>) {
    match DefaultMidiEngine::new() {
        Ok(engine) => (engine.list_inputs(), engine.list_outputs()),
        Err(e) => {
            log::warn!("{}", e);
            (Vec::new(), Vec::new())
        }
    }
}
