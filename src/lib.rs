/// drumbox - a step-sequenced MIDI drum machine
///
/// This library provides the pieces for playing text drum patterns over MIDI:
/// - Pattern compiling from a compact one-lane-per-line notation
/// - Step sequencing with note-off-before-retrigger per lane
/// - A tempo clock with drift-compensated sleeping
/// - MIDI output framing over any byte sink
/// - An audio monitor and a melody player for auditioning

pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod midi;
pub mod patterns;
pub mod sequencer;
pub mod tune;

// Re-export commonly used types
pub use audio::{AudioMonitor, MonitorSink};
pub use config::Config;
pub use error::{ConfigurationError, Error, MalformedPatternError, Result, TransportError};
pub use midi::{midi_note_name, ByteSink, Channel, MidiOut, MidiPort};
pub use sequencer::clock::{StopSignal, TempoClock};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent};
pub use sequencer::{Lane, Pattern, Sequencer, Symbol, VelocityTable};
