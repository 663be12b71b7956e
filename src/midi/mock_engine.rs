use crate::midi::{DeviceInfo, MidiEngine, MidiError, MidiMessage, Result};
use std::collections::VecDeque;

/// In-memory adapter: input is scripted with [`MockMidiEngine::push_input`]
/// and everything sent is kept for inspection.
#[derive(Debug, Default)]
pub struct MockMidiEngine {
    inputs: Vec<DeviceInfo>,
    outputs: Vec<DeviceInfo>,
    pending: VecDeque<MidiMessage>,
    sent: Vec<MidiMessage>,
    input_open: Option<usize>,
    output_open: Option<usize>,
    connected: bool,
    reconnects: usize,
}

impl MockMidiEngine {
    pub fn new() -> Result<Self> {
        let devices = |prefix: &str| -> Vec<DeviceInfo> {
            (0..2)
                .map(|id| DeviceInfo {
                    id,
                    name: format!("Mock {} {}", prefix, id + 1),
                })
                .collect()
        };
        Ok(MockMidiEngine {
            inputs: devices("Input"),
            outputs: devices("Output"),
            connected: true,
            ..Default::default()
        })
    }

    pub fn push_input(&mut self, msg: MidiMessage) {
        self.pending.push_back(msg);
    }

    pub fn sent(&self) -> &[MidiMessage] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<MidiMessage> {
        std::mem::take(&mut self.sent)
    }

    /// Simulates the device being unplugged until the next `reconnect`.
    pub fn unplug(&mut self) {
        self.connected = false;
    }

    pub fn reconnects(&self) -> usize {
        self.reconnects
    }

    pub fn input_open(&self) -> Option<usize> {
        self.input_open
    }

    pub fn output_open(&self) -> Option<usize> {
        self.output_open
    }
}

impl MidiEngine for MockMidiEngine {
    fn list_outputs(&self) -> Vec<DeviceInfo> {
        self.outputs.clone()
    }

    fn list_inputs(&self) -> Vec<DeviceInfo> {
        self.inputs.clone()
    }

    fn open_output(&mut self, id: usize) -> Result<()> {
        if id >= self.outputs.len() {
            return Err(MidiError::NoSuchDevice(format!("output #{}", id)));
        }
        self.output_open = Some(id);
        Ok(())
    }

    fn open_input(&mut self, id: usize) -> Result<()> {
        if id >= self.inputs.len() {
            return Err(MidiError::NoSuchDevice(format!("input #{}", id)));
        }
        self.input_open = Some(id);
        Ok(())
    }

    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        if !self.connected {
            return Err(MidiError::SendError("device unplugged".to_string()));
        }
        self.sent.push(msg);
        Ok(())
    }

    fn recv(&mut self) -> Option<MidiMessage> {
        if !self.connected {
            return None;
        }
        self.pending.pop_front()
    }

    fn has_pending(&self) -> bool {
        self.connected && !self.pending.is_empty()
    }

    fn reconnect(&mut self) -> Result<()> {
        self.connected = true;
        self.reconnects += 1;
        Ok(())
    }
}
