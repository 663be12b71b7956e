use crate::midi::{DeviceInfo, MidiEngine, MidiError, MidiMessage, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, info};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

const CLIENT_NAME: &str = "keyfall";

/// Device adapter over the platform MIDI API.
///
/// midir delivers input on its own thread; the callback only forwards raw
/// bytes into a channel which `recv` drains without blocking.
pub struct MidirEngine {
    input: Option<MidiInputConnection<()>>,
    output: Option<MidiOutputConnection>,
    input_name: Option<String>,
    output_name: Option<String>,
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

impl MidirEngine {
    pub fn new() -> Result<Self> {
        // Fail early if the platform has no MIDI support at all.
        MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;

        let (tx, rx) = unbounded();
        Ok(MidirEngine {
            input: None,
            output: None,
            input_name: None,
            output_name: None,
            tx,
            rx,
        })
    }

    fn input_client() -> Result<MidiInput> {
        let mut midi_in = MidiInput::new(&format!("{}-in", CLIENT_NAME))
            .map_err(|e| MidiError::Init(e.to_string()))?;
        midi_in.ignore(Ignore::All);
        Ok(midi_in)
    }

    fn output_client() -> Result<MidiOutput> {
        MidiOutput::new(&format!("{}-out", CLIENT_NAME))
            .map_err(|e| MidiError::Init(e.to_string()))
    }

    fn connect_input(&mut self, id: usize) -> Result<String> {
        let midi_in = Self::input_client()?;
        let ports = midi_in.ports();
        let port = ports
            .get(id)
            .ok_or_else(|| MidiError::NoSuchDevice(format!("input #{}", id)))?;
        let name = midi_in.port_name(port).unwrap_or_default();

        let tx = self.tx.clone();
        let connection = midi_in
            .connect(
                port,
                &format!("{}-input", CLIENT_NAME),
                move |_stamp, message, _| {
                    let _ = tx.send(message.to_vec());
                },
                (),
            )
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        self.input = Some(connection);
        Ok(name)
    }

    fn connect_output(&mut self, id: usize) -> Result<String> {
        let midi_out = Self::output_client()?;
        let ports = midi_out.ports();
        let port = ports
            .get(id)
            .ok_or_else(|| MidiError::NoSuchDevice(format!("output #{}", id)))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, &format!("{}-output", CLIENT_NAME))
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        self.output = Some(connection);
        Ok(name)
    }
}

/// Index of the first device whose name contains `name`.
pub fn find_device(devices: &[DeviceInfo], name: &str) -> Option<usize> {
    devices.iter().find(|d| d.name.contains(name)).map(|d| d.id)
}

impl MidiEngine for MidirEngine {
    fn list_outputs(&self) -> Vec<DeviceInfo> {
        let Ok(midi_out) = Self::output_client() else {
            return Vec::new();
        };
        midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(id, port)| {
                let name = midi_out.port_name(port).ok()?;
                Some(DeviceInfo { id, name })
            })
            .collect()
    }

    fn list_inputs(&self) -> Vec<DeviceInfo> {
        let Ok(midi_in) = Self::input_client() else {
            return Vec::new();
        };
        midi_in
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(id, port)| {
                let name = midi_in.port_name(port).ok()?;
                Some(DeviceInfo { id, name })
            })
            .collect()
    }

    fn open_output(&mut self, id: usize) -> Result<()> {
        self.output = None;
        let name = self.connect_output(id)?;
        info!("Opened MIDI output '{}'", name);
        self.output_name = Some(name);
        Ok(())
    }

    fn open_input(&mut self, id: usize) -> Result<()> {
        self.input = None;
        let name = self.connect_input(id)?;
        info!("Opened MIDI input '{}'", name);
        self.input_name = Some(name);
        Ok(())
    }

    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        if let Some(output) = &mut self.output {
            output
                .send(&msg.to_bytes())
                .map_err(|e| MidiError::SendError(e.to_string()))?;
        }
        Ok(())
    }

    fn recv(&mut self) -> Option<MidiMessage> {
        while let Ok(data) = self.rx.try_recv() {
            match MidiMessage::from_bytes(&data) {
                Some(msg) => return Some(msg),
                None => debug!("Ignoring unsupported MIDI input {:02X?}", data),
            }
        }
        None
    }

    fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    fn reconnect(&mut self) -> Result<()> {
        self.input = None;
        self.output = None;

        if let Some(name) = self.output_name.clone() {
            let id = find_device(&self.list_outputs(), &name)
                .ok_or_else(|| MidiError::NoSuchDevice(name.clone()))?;
            self.connect_output(id)?;
            info!("Reconnected MIDI output '{}'", name);
        }

        if let Some(name) = self.input_name.clone() {
            let id = find_device(&self.list_inputs(), &name)
                .ok_or_else(|| MidiError::NoSuchDevice(name.clone()))?;
            self.connect_input(id)?;
            info!("Reconnected MIDI input '{}'", name);
        }

        Ok(())
    }
}
