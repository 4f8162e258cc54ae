/// Core sequencer logic - hit symbols, velocity tiers and step playback
/// A pattern is walked column by column; each column may retrigger, stop or
/// sustain the note of every lane
use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{ConfigurationError, TransportError};
use crate::midi::{ByteSink, Channel, MidiOut};

pub mod clock;
pub mod pattern;
pub mod playback;

pub use pattern::{Lane, Pattern};

/// One character of a lane's hit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// `-` keeps whatever is sounding
    Continue,
    /// `.`
    Off,
    /// `+`
    Ghost,
    /// `s`
    Soft,
    /// `m`
    Medium,
    /// `x`
    Hard,
}

impl Symbol {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(Symbol::Continue),
            '.' => Some(Symbol::Off),
            '+' => Some(Symbol::Ghost),
            's' => Some(Symbol::Soft),
            'm' => Some(Symbol::Medium),
            'x' => Some(Symbol::Hard),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Symbol::Continue => '-',
            Symbol::Off => '.',
            Symbol::Ghost => '+',
            Symbol::Soft => 's',
            Symbol::Medium => 'm',
            Symbol::Hard => 'x',
        }
    }
}

/// Velocities the hit symbols resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VelocityTable {
    pub ghost: u8,
    pub soft: u8,
    pub medium: u8,
    pub hard: u8,
}

impl VelocityTable {
    /// `None` means "continue".
    pub fn resolve(&self, symbol: Symbol) -> Option<u8> {
        match symbol {
            Symbol::Continue => None,
            Symbol::Off => Some(0),
            Symbol::Ghost => Some(self.ghost),
            Symbol::Soft => Some(self.soft),
            Symbol::Medium => Some(self.medium),
            Symbol::Hard => Some(self.hard),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let tiers = [
            ("ghost", self.ghost),
            ("soft", self.soft),
            ("medium", self.medium),
            ("hard", self.hard),
        ];
        for (name, value) in tiers {
            if value > 127 {
                return Err(ConfigurationError::InvalidVelocity {
                    name,
                    value: value.into(),
                });
            }
        }
        Ok(())
    }
}

impl Default for VelocityTable {
    fn default() -> Self {
        Self {
            ghost: 10,
            soft: 60,
            medium: 100,
            hard: 120,
        }
    }
}

pub struct Sequencer {
    pattern: Pattern,
    velocities: VelocityTable,
    // last velocity sent per note, 0 = silent
    active_notes: HashMap<u8, u8>,
}

impl Sequencer {
    pub fn new(pattern: Pattern) -> Self {
        Self::with_velocities(pattern, VelocityTable::default())
    }

    pub fn with_velocities(pattern: Pattern, velocities: VelocityTable) -> Self {
        Self {
            pattern,
            velocities,
            active_notes: HashMap::new(),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn velocities(&self) -> &VelocityTable {
        &self.velocities
    }

    pub fn current_position(&self) -> usize {
        self.pattern.step()
    }

    /// Last velocity sent on `note`, 0 if silent.
    pub fn active_velocity(&self, note: u8) -> u8 {
        self.active_notes.get(&note).copied().unwrap_or(0)
    }

    /// Plays the current column and moves the playhead one step.
    ///
    /// A lane that is already sounding is always silenced before it is
    /// retriggered, so no note number ever has two overlapping notes.
    /// Returns the number of messages sent.
    pub fn advance<S: ByteSink>(
        &mut self,
        out: &mut MidiOut<S>,
        channel: Option<Channel>,
    ) -> Result<usize, TransportError> {
        let step = self.pattern.step();
        let mut sent = 0;

        for lane in self.pattern.lanes() {
            let Some(velocity) = self.velocities.resolve(lane.get(step)) else {
                continue;
            };
            let note = lane.note();

            let active = self.active_notes.entry(note).or_insert(0);
            if *active > 0 {
                // velocity 0 <=> note off
                out.note_on(note, 0, channel)?;
                *active = 0;
                sent += 1;
            }
            if velocity > 0 {
                out.note_on(note, velocity.max(1), channel)?;
                *active = velocity;
                sent += 1;
            }
        }

        log::trace!("step {}: {} messages", step, sent);
        self.pattern.advance_step();
        Ok(sent)
    }

    /// Silences every sounding note.
    pub fn release<S: ByteSink>(
        &mut self,
        out: &mut MidiOut<S>,
        channel: Option<Channel>,
    ) -> Result<(), TransportError> {
        let mut sounding: Vec<u8> = self
            .active_notes
            .iter()
            .filter(|(_, velocity)| **velocity > 0)
            .map(|(note, _)| *note)
            .collect();
        sounding.sort_unstable();

        for note in sounding {
            out.note_on(note, 0, channel)?;
            self.active_notes.insert(note, 0);
        }
        Ok(())
    }

    /// Back to column 0 with nothing sounding. Sends nothing.
    pub fn reset(&mut self) {
        self.pattern.rewind();
        self.active_notes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiEvent;
    use proptest::prelude::*;

    fn out() -> MidiOut<Vec<u8>> {
        MidiOut::new(Vec::<u8>::new(), 10).unwrap()
    }

    fn sequencer(text: &str) -> Sequencer {
        Sequencer::new(Pattern::compile(text).unwrap())
    }

    fn messages(out: &MidiOut<Vec<u8>>) -> Vec<[u8; 3]> {
        out.sink()
            .chunks(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect()
    }

    #[test]
    fn test_off_before_on() {
        let mut seq = sequencer("36 x.");
        let mut out = out();
        seq.advance(&mut out, None).unwrap();
        seq.advance(&mut out, None).unwrap();
        assert_eq!(messages(&out), vec![[0x99, 36, 120], [0x99, 36, 0]]);
        assert_eq!(seq.active_velocity(36), 0);
    }

    #[test]
    fn test_continue_emits_nothing() {
        let mut seq = sequencer("36 x-");
        let mut out = out();
        assert_eq!(seq.advance(&mut out, None).unwrap(), 1);
        let after_hit = seq.active_velocity(36);
        assert_eq!(seq.advance(&mut out, None).unwrap(), 0);
        assert_eq!(messages(&out), vec![[0x99, 36, 120]]);
        assert_eq!(seq.active_velocity(36), after_hit);
    }

    #[test]
    fn test_retrigger_after_hit_and_sustain() {
        let mut seq = sequencer("38 xm-s");
        let mut out = out();
        for _ in 0..4 {
            seq.advance(&mut out, None).unwrap();
        }
        assert_eq!(
            messages(&out),
            vec![
                [0x99, 38, 120],
                [0x99, 38, 0],
                [0x99, 38, 100],
                [0x99, 38, 0],
                [0x99, 38, 60],
            ]
        );
    }

    #[test]
    fn test_off_on_silent_lane_sends_nothing() {
        let mut seq = sequencer("42 ..");
        let mut out = out();
        assert_eq!(seq.advance(&mut out, None).unwrap(), 0);
        assert!(out.sink().is_empty());
    }

    #[test]
    fn test_ghost_velocity_kept() {
        let mut seq = sequencer("38 +");
        let mut out = out();
        seq.advance(&mut out, None).unwrap();
        assert_eq!(messages(&out), vec![[0x99, 38, 10]]);
    }

    #[test]
    fn test_zero_tier_takes_off_path() {
        let velocities = VelocityTable {
            ghost: 0,
            ..VelocityTable::default()
        };
        let mut seq = Sequencer::with_velocities(Pattern::compile("38 x+").unwrap(), velocities);
        let mut out = out();
        seq.advance(&mut out, None).unwrap();
        seq.advance(&mut out, None).unwrap();
        // the ghost step only releases the hard hit
        assert_eq!(messages(&out), vec![[0x99, 38, 120], [0x99, 38, 0]]);
        assert_eq!(seq.active_velocity(38), 0);
    }

    #[test]
    fn test_lanes_sharing_a_note_never_overlap() {
        let mut seq = sequencer("36 x.\n36 xx");
        let mut out = out();
        seq.advance(&mut out, None).unwrap();
        seq.advance(&mut out, None).unwrap();

        let mut sounding = false;
        for msg in messages(&out) {
            match MidiEvent::from_bytes(&msg) {
                Some(MidiEvent::NoteOn { .. }) => {
                    assert!(!sounding, "two note-ons without a note-off");
                    sounding = true;
                }
                Some(MidiEvent::NoteOff { .. }) => sounding = false,
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_channel_override() {
        let mut seq = sequencer("36 x");
        let mut out = out();
        seq.advance(&mut out, Some(Channel::new(1).unwrap())).unwrap();
        assert_eq!(messages(&out), vec![[0x90, 36, 120]]);
    }

    #[test]
    fn test_release_and_reset() {
        let mut seq = sequencer("36 x-\n42 xx\n46 ..");
        let mut out = out();
        seq.advance(&mut out, None).unwrap();
        out.sink_mut().clear();

        seq.release(&mut out, None).unwrap();
        assert_eq!(messages(&out), vec![[0x99, 36, 0], [0x99, 42, 0]]);
        assert_eq!(seq.active_velocity(36), 0);

        seq.reset();
        assert_eq!(seq.current_position(), 0);
    }

    #[test]
    fn test_velocity_table_validation() {
        assert!(VelocityTable::default().validate().is_ok());
        let loud = VelocityTable {
            hard: 200,
            ..VelocityTable::default()
        };
        assert!(matches!(
            loud.validate(),
            Err(ConfigurationError::InvalidVelocity { name: "hard", value: 200 })
        ));
    }

    #[test]
    fn test_symbol_chars() {
        for c in "-.+smx".chars() {
            assert_eq!(Symbol::from_char(c).map(Symbol::as_char), Some(c));
        }
        assert_eq!(Symbol::from_char('X'), None);
    }

    proptest! {
        #[test]
        fn prop_playhead_returns_after_full_cycle(
            hits in proptest::collection::vec(proptest::sample::select(vec!['-', '.', '+', 's', 'm', 'x']), 1..32),
            lanes in 1usize..5,
            offset in 0usize..32,
        ) {
            let line: String = hits.iter().collect();
            let text: String = (0..lanes).map(|i| format!("{} {}\n", 36 + i, line)).collect();
            let mut seq = sequencer(&text);
            let mut out = out();
            for _ in 0..offset {
                seq.advance(&mut out, None).unwrap();
            }
            let start = seq.current_position();
            for _ in 0..seq.pattern().steps() {
                seq.advance(&mut out, None).unwrap();
            }
            prop_assert_eq!(seq.current_position(), start);
        }
    }
}
