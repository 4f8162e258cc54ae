/// Melody player for micro:bit style note strings.
///
/// A tune is a list of tokens such as `c4:4`, `e`, `f#`, `eb:8` or `r:2`:
/// a note letter, an optional `#`/`b`, an optional octave digit and an
/// optional `:duration` in ticks. Octave and duration carry over to the
/// following tokens. Letters outside `a`..`g` are rests.
use std::thread;
use std::time::Duration;

use crate::error::TransportError;
use crate::midi::{ByteSink, MidiOut};

const VELOCITY: u8 = 96;
const DEFAULT_OCTAVE: i32 = 4;
const DEFAULT_DURATION: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuneNote {
    /// `None` for a rest.
    pub pitch: Option<u8>,
    /// Length in ticks.
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tune {
    notes: Vec<TuneNote>,
}

impl Tune {
    /// Parses whitespace or comma separated tokens. Never fails; tokens it
    /// cannot read as a pitch become rests.
    pub fn parse(text: &str) -> Self {
        let tokens = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty());
        Self::from_tokens(tokens)
    }

    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        let mut octave = DEFAULT_OCTAVE;
        let mut duration = DEFAULT_DURATION;

        let notes = tokens
            .into_iter()
            .map(|token| {
                let mut name = token;
                if let Some((head, ticks)) = token.split_once(':') {
                    if let Ok(ticks) = ticks.trim().parse() {
                        name = head;
                        duration = ticks;
                    }
                }
                if let Some(digit) = name.chars().last().and_then(|c| c.to_digit(10)) {
                    octave = digit as i32;
                    name = &name[..name.len() - 1];
                }
                TuneNote {
                    pitch: pitch(name, octave),
                    duration,
                }
            })
            .collect();

        Self { notes }
    }

    pub fn notes(&self) -> &[TuneNote] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Total length in ticks.
    pub fn ticks(&self) -> u32 {
        self.notes.iter().map(|n| n.duration).sum()
    }
}

fn pitch(name: &str, octave: i32) -> Option<u8> {
    let name = name.to_lowercase();
    let mut chars = name.chars();
    let base = match chars.next()? {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };
    let accidental = if name.ends_with('#') {
        1
    } else if name.len() > 1 && name.ends_with('b') {
        -1
    } else {
        0
    };
    Some((base + accidental + 12 * octave).clamp(0, 127) as u8)
}

/// Length of one tick.
pub fn tick_duration(bpm: u32, ticks_per_beat: u32) -> Duration {
    let bpm = bpm.max(1) as f64;
    let ticks = ticks_per_beat.max(1) as f64;
    Duration::from_nanos((60e9 / bpm / ticks).round() as u64)
}

/// Plays the tune note by note, blocking.
///
/// On a transport failure an all-sound-off is attempted so no note is left
/// hanging, then the failure is returned.
pub fn play<S: ByteSink>(
    out: &mut MidiOut<S>,
    tune: &Tune,
    bpm: u32,
    ticks_per_beat: u32,
) -> Result<(), TransportError> {
    let tick = tick_duration(bpm, ticks_per_beat);
    let result = play_notes(out, tune, |ticks| thread::sleep(tick * ticks));
    if let Err(e) = &result {
        log::error!("tune aborted: {}", e);
        if let Err(cleanup) = out.all_sound_off(None) {
            log::warn!("all sound off failed: {}", cleanup);
        }
    }
    result
}

fn play_notes<S: ByteSink>(
    out: &mut MidiOut<S>,
    tune: &Tune,
    mut wait: impl FnMut(u32),
) -> Result<(), TransportError> {
    for note in tune.notes() {
        if let Some(pitch) = note.pitch {
            out.note_on(pitch, VELOCITY, None)?;
        }
        wait(note.duration);
        if let Some(pitch) = note.pitch {
            out.note_off(pitch, 0, None)?;
        }
    }
    Ok(())
}

pub const BUILTIN: &[(&str, &str)] = &[
    ("dadadadum", "r4:2 g g g eb:8 r:2 f f f d:8"),
    (
        "ode",
        "e4 e f g g f e d c c d e e:6 d:2 d:8 \
         e:4 e f g g f e d c c d e d:6 c:2 c:8",
    ),
    (
        "birthday",
        "c4:3 c:1 d:4 c:4 f e:8 c:3 c:1 d:4 c:4 g f:8 \
         c:3 c:1 c5:4 a4 f e d a#:3 a#:1 a:4 f g f:8",
    ),
    ("scale", "c4:2 d e f g a b c5:4"),
];

pub fn builtin(name: &str) -> Option<Tune> {
    BUILTIN
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, text)| Tune::parse(text))
}
