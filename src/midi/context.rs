use crate::midi::{find_device, MidiEngine, MidiMessage};
use log::{info, warn};

/// Owns the device adapter for the lifetime of a session.
///
/// Device problems never reach the caller: a port that fails to open
/// leaves the context without that port (silent playback, no input) and a
/// failed send marks the device as unplugged, after which sends are
/// dropped until [`MidiDeviceContext::reconnect`] succeeds. When the
/// platform's MIDI system could not be started at all there is no engine
/// and the context stays silent with input disabled.
pub struct MidiDeviceContext<E: MidiEngine> {
    engine: Option<E>,
    has_input: bool,
    has_output: bool,
    unplugged: bool,
}

impl<E: MidiEngine> MidiDeviceContext<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Some(engine),
            has_input: false,
            has_output: false,
            unplugged: false,
        }
    }

    /// A context with no MIDI system behind it.
    pub fn without_engine() -> Self {
        Self {
            engine: None,
            has_input: false,
            has_output: false,
            unplugged: false,
        }
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn has_input(&self) -> bool {
        self.has_input
    }

    pub fn has_output(&self) -> bool {
        self.has_output
    }

    pub fn is_unplugged(&self) -> bool {
        self.unplugged
    }

    /// Opens the first output whose name contains `name`.
    pub fn open_output_named(&mut self, name: &str) -> bool {
        let opened = self.engine.as_mut().and_then(|engine| {
            find_device(&engine.list_outputs(), name).map(|id| engine.open_output(id))
        });
        self.has_output = log_open("output", name, opened);
        self.has_output
    }

    /// Opens the first input whose name contains `name`.
    pub fn open_input_named(&mut self, name: &str) -> bool {
        let opened = self.engine.as_mut().and_then(|engine| {
            find_device(&engine.list_inputs(), name).map(|id| engine.open_input(id))
        });
        self.has_input = log_open("input", name, opened);
        self.has_input
    }

    fn output(&mut self) -> Option<&mut E> {
        if !self.has_output || self.unplugged {
            return None;
        }
        self.engine.as_mut()
    }

    pub fn send(&mut self, msg: MidiMessage) {
        let Some(engine) = self.output() else {
            return;
        };
        if let Err(e) = engine.send(msg) {
            warn!("{}; dropping output until the device reconnects", e);
            self.unplugged = true;
        }
    }

    pub fn reset_all_notes(&mut self) {
        let Some(engine) = self.output() else {
            return;
        };
        if let Err(e) = engine.reset_all_notes() {
            warn!("{}; dropping output until the device reconnects", e);
            self.unplugged = true;
        }
    }

    /// Everything that has arrived on the input since the last call.
    pub fn drain_input(&mut self) -> Vec<MidiMessage> {
        let mut messages = Vec::new();
        if !self.has_input {
            return messages;
        }
        let Some(engine) = self.engine.as_mut() else {
            return messages;
        };
        while engine.has_pending() {
            match engine.recv() {
                Some(msg) => messages.push(msg),
                None => break,
            }
        }
        messages
    }

    pub fn reconnect(&mut self) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        match engine.reconnect() {
            Ok(()) => {
                info!("MIDI devices reconnected");
                self.unplugged = false;
                true
            }
            Err(e) => {
                warn!("Reconnect failed: {}", e);
                false
            }
        }
    }
}

fn log_open(kind: &str, name: &str, opened: Option<crate::midi::Result<()>>) -> bool {
    match opened {
        Some(Ok(())) => {
            info!("Using MIDI {} '{}'", kind, name);
            true
        }
        Some(Err(e)) => {
            warn!("Could not open MIDI {} '{}': {}; continuing without it", kind, name, e);
            false
        }
        None => {
            warn!("No MIDI {} available as '{}'; continuing without it", kind, name);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MockMidiEngine;

    fn note_on(note: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            channel: 0,
            note,
            velocity: 90,
        }
    }

    #[test]
    fn test_missing_device_degrades_to_silent() {
        let mut ctx = MidiDeviceContext::new(MockMidiEngine::new().unwrap());
        assert!(!ctx.open_output_named("Nope"));

        ctx.send(note_on(60));
        assert!(ctx.engine().unwrap().sent().is_empty());
    }

    #[test]
    fn test_drain_reads_everything_pending() {
        let mut ctx = MidiDeviceContext::new(MockMidiEngine::new().unwrap());
        assert!(ctx.open_input_named("Mock Input 2"));
        ctx.engine_mut().unwrap().push_input(note_on(60));
        ctx.engine_mut().unwrap().push_input(note_on(62));

        assert_eq!(ctx.drain_input(), vec![note_on(60), note_on(62)]);
        assert!(ctx.drain_input().is_empty());
    }

    #[test]
    fn test_unplugged_output_is_dropped_until_reconnect() {
        let mut ctx = MidiDeviceContext::new(MockMidiEngine::new().unwrap());
        assert!(ctx.open_output_named("Mock Output"));

        ctx.engine_mut().unwrap().unplug();
        ctx.send(note_on(60));
        assert!(ctx.is_unplugged());

        ctx.send(note_on(61));
        assert!(ctx.reconnect());
        ctx.send(note_on(62));

        assert_eq!(ctx.engine().unwrap().sent(), &[note_on(62)]);
        assert_eq!(ctx.engine().unwrap().reconnects(), 1);
    }

    #[test]
    fn test_no_engine_is_silent_and_deaf() {
        let mut ctx = MidiDeviceContext::<MockMidiEngine>::without_engine();
        assert!(!ctx.has_engine());
        assert!(!ctx.open_output_named("Mock Output 1"));
        assert!(!ctx.open_input_named("Mock Input 1"));

        ctx.send(note_on(60));
        ctx.reset_all_notes();
        assert!(ctx.drain_input().is_empty());
        assert!(!ctx.is_unplugged());
        assert!(!ctx.reconnect());
        assert!(ctx.engine().is_none());
    }
}
