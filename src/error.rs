/// Error types shared by the pattern compiler, the transport and the clock
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid setup. Raised before playback starts, never from inside the play loop.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("MIDI channel {0} is out of range, expected 1..=16")]
    InvalidChannel(u8),

    #[error("tempo {0} bpm is not a positive number")]
    InvalidTempo(f32),

    #[error("steps per beat must be at least 1")]
    InvalidStepsPerBeat,

    #[error("velocity tier `{name}` is {value}, expected 0..=127")]
    InvalidVelocity { name: &'static str, value: u16 },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("MIDI output unavailable: {0}")]
    Midi(String),

    #[error("no MIDI output port matches `{0}`")]
    UnknownPort(String),

    #[error("{0}")]
    Usage(String),
}

/// Pattern text that cannot be compiled. Line numbers are 1-based.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedPatternError {
    #[error("line {line}: expected `<note> <hits> [label]`, found {found} field(s)")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: `{text}` is not a note number")]
    InvalidNote { line: usize, text: String },

    #[error("line {line}: note {note} is outside 0..=127")]
    NoteOutOfRange { line: usize, note: i64 },

    #[error("line {line}, column {column}: unknown hit symbol `{symbol}`")]
    UnknownSymbol {
        line: usize,
        column: usize,
        symbol: char,
    },

    #[error("line {line}: lane has {found} steps, expected {expected}")]
    LaneLength {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("pattern has no lanes")]
    Empty,
}

/// A byte sink refused a message. Never retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to send MIDI message: {0}")]
    Send(String),

    #[error("MIDI output is not connected")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Pattern(#[from] MalformedPatternError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
