/// Hardware and virtual MIDI output ports using midir
use midir::{MidiOutput, MidiOutputConnection};

use super::ByteSink;
use crate::error::{ConfigurationError, TransportError};

const CLIENT_NAME: &str = "drumbox MIDI Output";

pub struct MidiPort {
    connection: Option<MidiOutputConnection>,
    name: String,
}

impl MidiPort {
    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(port_index: usize) -> Result<Self, ConfigurationError> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| ConfigurationError::Midi(format!("failed to create MIDI output: {}", e)))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| ConfigurationError::UnknownPort(port_index.to_string()))?;
        let name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| format!("port {}", port_index));

        let connection = midi_out
            .connect(port, "drumbox")
            .map_err(|e| ConfigurationError::Midi(format!("failed to connect: {}", e)))?;

        log::info!("connected to MIDI output `{}`", name);
        Ok(Self {
            connection: Some(connection),
            name,
        })
    }

    /// Connects to the port whose index or (case-insensitive) name contains `selector`.
    /// With no selector, the first available port is used.
    pub fn connect_matching(selector: Option<&str>) -> Result<Self, ConfigurationError> {
        let ports = Self::available_ports();
        let index = match selector {
            None => {
                if ports.is_empty() {
                    return Err(ConfigurationError::Midi("no MIDI output ports".to_string()));
                }
                0
            }
            Some(selector) => find_port(&ports, selector)
                .ok_or_else(|| ConfigurationError::UnknownPort(selector.to_string()))?,
        };
        Self::connect(index)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }
}

impl ByteSink for MidiPort {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let conn = self.connection.as_mut().ok_or(TransportError::Disconnected)?;
        conn.send(bytes)
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

fn find_port(ports: &[String], selector: &str) -> Option<usize> {
    if let Ok(index) = selector.parse::<usize>() {
        return (index < ports.len()).then_some(index);
    }
    let needle = selector.to_lowercase();
    ports
        .iter()
        .position(|name| name.to_lowercase().contains(&needle))
}
