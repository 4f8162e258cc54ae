/// MIDI output - channel-voice message framing over an abstract byte sink
use std::io;

use crate::error::{ConfigurationError, TransportError};

pub mod event;
pub mod port;

pub use event::MidiEvent;
pub use port::MidiPort;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;

/// Controller number of "all sound off".
pub const ALL_SOUND_OFF: u8 = 0x78;

/// A MIDI channel in musician numbering (1..=16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(u8);

impl Channel {
    /// General MIDI percussion channel.
    pub const DRUMS: Channel = Channel(10);

    pub fn new(number: u8) -> Result<Self, ConfigurationError> {
        if (1..=16).contains(&number) {
            Ok(Self(number))
        } else {
            Err(ConfigurationError::InvalidChannel(number))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based channel as carried in the status byte's low nibble.
    pub fn index(self) -> u8 {
        (self.0 - 1) & 0x0F
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self(1)
    }
}

/// Anything that accepts whole MIDI messages.
///
/// Each call receives exactly one complete message, so an implementation that
/// forwards the slice in a single write never interleaves two messages.
pub trait ByteSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

impl ByteSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for Box<S> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }
}

/// Adapts any `io::Write` (a serial device at 31250 baud, a file, a pipe).
pub struct WriteSink<W>(pub W);

impl<W: io::Write> ByteSink for WriteSink<W> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.0.write_all(bytes)?;
        self.0.flush()?;
        Ok(())
    }
}

/// Sends every message to `primary`, then to `secondary`.
pub struct Tee<A, B> {
    pub primary: A,
    pub secondary: B,
}

impl<A: ByteSink, B: ByteSink> ByteSink for Tee<A, B> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.primary.write(bytes)?;
        self.secondary.write(bytes)
    }
}

/// Frames channel-voice messages and writes them to a sink.
///
/// The default channel is validated once at construction; every message
/// method takes an optional per-message override.
pub struct MidiOut<S> {
    sink: S,
    channel: Channel,
}

impl<S: ByteSink> MidiOut<S> {
    pub fn new(sink: S, channel: u8) -> Result<Self, ConfigurationError> {
        Ok(Self::with_channel(sink, Channel::new(channel)?))
    }

    pub fn with_channel(sink: S, channel: Channel) -> Self {
        Self { sink, channel }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Writes `status | channel` followed by up to two 7-bit data bytes.
    pub fn channel_message(
        &mut self,
        status: u8,
        data: &[u8],
        channel: Option<Channel>,
    ) -> Result<(), TransportError> {
        debug_assert!(data.len() <= 2, "channel messages carry at most 2 data bytes");
        let channel = channel.unwrap_or(self.channel);

        let mut msg = [0u8; 3];
        msg[0] = (status & 0xF0) | channel.index();
        let len = data.len().min(2);
        for (slot, value) in msg[1..].iter_mut().zip(&data[..len]) {
            *slot = value & 0x7F;
        }
        self.sink.write(&msg[..=len])
    }

    pub fn note_on(
        &mut self,
        note: u8,
        velocity: u8,
        channel: Option<Channel>,
    ) -> Result<(), TransportError> {
        self.channel_message(NOTE_ON, &[note, velocity], channel)
    }

    pub fn note_off(
        &mut self,
        note: u8,
        velocity: u8,
        channel: Option<Channel>,
    ) -> Result<(), TransportError> {
        self.channel_message(NOTE_OFF, &[note, velocity], channel)
    }

    /// With `lsb` set, `value` is 14-bit: the MSB goes out on `control` and,
    /// for the coarse controllers below 20, the LSB on `control + 32`.
    pub fn control_change(
        &mut self,
        control: u8,
        value: u16,
        lsb: bool,
        channel: Option<Channel>,
    ) -> Result<(), TransportError> {
        let coarse = if lsb { value >> 7 } else { value };
        self.channel_message(CONTROL_CHANGE, &[control, coarse as u8], channel)?;
        if lsb && control < 20 {
            self.channel_message(CONTROL_CHANGE, &[control + 32, value as u8], channel)?;
        }
        Ok(())
    }

    pub fn program_change(
        &mut self,
        program: u8,
        channel: Option<Channel>,
    ) -> Result<(), TransportError> {
        self.channel_message(PROGRAM_CHANGE, &[program], channel)
    }

    pub fn all_sound_off(&mut self, channel: Option<Channel>) -> Result<(), TransportError> {
        self.control_change(ALL_SOUND_OFF, 0, false, channel)
    }
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}
