/// Pattern text compiler
///
/// One instrument per line: `<note> <hits> [label]`. Lines starting with `#`
/// and blank lines are skipped. Every character of `hits` is one step.
use super::Symbol;
use crate::error::MalformedPatternError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    note: u8,
    hits: Vec<Symbol>,
    label: Option<String>,
}

impl Lane {
    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn hits(&self) -> &[Symbol] {
        &self.hits
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn get(&self, step: usize) -> Symbol {
        self.hits.get(step).copied().unwrap_or(Symbol::Continue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    lanes: Vec<Lane>,
    steps: usize,
    step: usize,
}

impl Pattern {
    pub fn compile(text: &str) -> Result<Self, MalformedPatternError> {
        let mut lanes: Vec<Lane> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let lane = parse_lane(line, trimmed)?;
            if let Some(first) = lanes.first() {
                if lane.hits.len() != first.hits.len() {
                    return Err(MalformedPatternError::LaneLength {
                        line,
                        expected: first.hits.len(),
                        found: lane.hits.len(),
                    });
                }
            }
            lanes.push(lane);
        }

        let steps = lanes
            .iter()
            .map(|lane| lane.hits.len())
            .max()
            .ok_or(MalformedPatternError::Empty)?;

        log::debug!("compiled pattern: {} lanes, {} steps", lanes.len(), steps);
        Ok(Self {
            lanes,
            steps,
            step: 0,
        })
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Grid width.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Playhead: the column the next advance will play.
    pub fn step(&self) -> usize {
        self.step
    }

    pub(super) fn advance_step(&mut self) -> usize {
        self.step = (self.step + 1) % self.steps;
        self.step
    }

    pub(super) fn rewind(&mut self) {
        self.step = 0;
    }
}

fn parse_lane(line: usize, text: &str) -> Result<Lane, MalformedPatternError> {
    let (note_field, rest) = split_field(text);
    let (hits_field, label) = split_field(rest);
    if hits_field.is_empty() {
        return Err(MalformedPatternError::FieldCount { line, found: 1 });
    }
    let label = Some(label).filter(|l| !l.is_empty()).map(str::to_string);

    let note: i64 = note_field
        .parse()
        .map_err(|_| MalformedPatternError::InvalidNote {
            line,
            text: note_field.to_string(),
        })?;
    let note = u8::try_from(note)
        .ok()
        .filter(|n| *n <= 127)
        .ok_or(MalformedPatternError::NoteOutOfRange { line, note })?;

    let hits = hits_field
        .chars()
        .enumerate()
        .map(|(i, c)| {
            Symbol::from_char(c).ok_or(MalformedPatternError::UnknownSymbol {
                line,
                column: i + 1,
                symbol: c,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Lane { note, hits, label })
}

/// Splits off the first whitespace-delimited field, returning it and the trimmed rest.
fn split_field(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim()),
        None => (text, ""),
    }
}
