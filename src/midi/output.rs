// MIDI output devices - enumeration and connection over midir

use crate::output::MidiSender;
use midir::{MidiOutput, MidiOutputConnection};

/// MIDI error types
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("MIDI backend unavailable: {0}")]
    Init(String),

    #[error("MIDI output '{0}' not found")]
    PortNotFound(String),

    #[error("MIDI connection failed: {0}")]
    Connect(String),

    #[error("MIDI send failed: {0}")]
    Send(String),
}

#[derive(Clone, Debug)]
pub struct MidiDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

pub struct MidiDeviceManager;

impl MidiDeviceManager {
    pub fn new() -> Self {
        Self
    }

    /// List all available MIDI output ports
    pub fn list_output_ports(&self) -> Vec<MidiDeviceInfo> {
        let mut devices = Vec::new();

        if let Ok(midi_out) = MidiOutput::new("stepweaver MIDI scanner") {
            for (index, port) in midi_out.ports().iter().enumerate() {
                if let Ok(name) = midi_out.port_name(port) {
                    devices.push(MidiDeviceInfo {
                        id: format!("midi_out_{}", index),
                        name,
                        is_default: index == 0,
                    });
                }
            }
        }

        devices
    }

    /// Connect to an output port by name
    pub fn connect_by_name(&self, device_name: &str) -> Result<MidiOutputConnection, MidiError> {
        let midi_out =
            MidiOutput::new("stepweaver MIDI output").map_err(|e| MidiError::Init(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .map(|name| name == device_name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| MidiError::PortNotFound(device_name.to_string()))?;

        log::info!("Connecting MIDI output to '{}'", device_name);
        midi_out
            .connect(port, "stepweaver")
            .map_err(|e| MidiError::Connect(e.to_string()))
    }

    /// Connect to the first available output port
    pub fn connect_default(&self) -> Result<MidiOutputConnection, MidiError> {
        let first = self
            .list_output_ports()
            .into_iter()
            .next()
            .ok_or_else(|| MidiError::PortNotFound("default".to_string()))?;
        self.connect_by_name(&first.name)
    }
}

impl Default for MidiDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiSender for MidiOutputConnection {
    fn send(&mut self, message: &[u8]) -> Result<(), MidiError> {
        MidiOutputConnection::send(self, message).map_err(|e| MidiError::Send(e.to_string()))
    }
}
