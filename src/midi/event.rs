/// Decoding of outgoing channel-voice messages, for sinks that interpret
/// what the sequencer sends instead of forwarding raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    /// Parses one raw message. `channel` is the zero-based low nibble.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;

        match (status & 0xF0, data) {
            // Velocity 0 = Note Off
            (0x90, &[note, 0, ..]) => Some(MidiEvent::NoteOff { channel, note }),
            (0x90, &[note, velocity, ..]) => Some(MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            }),
            (0x80, &[note, _, ..]) => Some(MidiEvent::NoteOff { channel, note }),
            (0xB0, &[controller, value, ..]) => Some(MidiEvent::ControlChange {
                channel,
                controller,
                value,
            }),
            (0xC0, &[program, ..]) => Some(MidiEvent::ProgramChange { channel, program }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        let event = MidiEvent::from_bytes(&[0x99, 36, 120]).unwrap();
        assert_eq!(
            event,
            MidiEvent::NoteOn {
                channel: 9,
                note: 36,
                velocity: 120
            }
        );
    }

    #[test]
    fn test_note_on_velocity_zero_is_note_off() {
        let event = MidiEvent::from_bytes(&[0x99, 38, 0]).unwrap();
        assert_eq!(event, MidiEvent::NoteOff { channel: 9, note: 38 });
    }

    #[test]
    fn test_program_change() {
        let event = MidiEvent::from_bytes(&[0xC9, 9]).unwrap();
        assert_eq!(event, MidiEvent::ProgramChange { channel: 9, program: 9 });
    }

    #[test]
    fn test_truncated_and_unknown() {
        assert_eq!(MidiEvent::from_bytes(&[]), None);
        assert_eq!(MidiEvent::from_bytes(&[0x90, 60]), None);
        assert_eq!(MidiEvent::from_bytes(&[0xE0, 0, 64]), None);
    }
}
