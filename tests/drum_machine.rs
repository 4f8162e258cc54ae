use std::collections::HashMap;

use drumbox::midi::MidiEvent;
use drumbox::{patterns, Config, MalformedPatternError, MidiOut, Pattern, Sequencer};

fn decode(bytes: &[u8]) -> Vec<MidiEvent> {
    let mut events = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let len = if rest[0] & 0xF0 == 0xC0 { 2 } else { 3 };
        events.push(MidiEvent::from_bytes(&rest[..len]).expect("valid message"));
        rest = &rest[len..];
    }
    events
}

#[test]
fn funky_drummer_full_bar() {
    let config = Config::from_ron("(bpm: 400.0, steps_per_beat: 4, kit: Some(9), settle_ms: 1)")
        .unwrap();
    let clock = config.clock().unwrap();
    let pattern = Pattern::compile(patterns::FUNKY_DRUMMER).unwrap();
    let steps = pattern.steps();
    assert_eq!(pattern.lanes().len(), 4);

    let mut sequencer = Sequencer::with_velocities(pattern, config.velocity_table().unwrap());
    let mut out = MidiOut::with_channel(Vec::<u8>::new(), config.channel().unwrap());
    let mut remaining = steps;
    let mut stop = || {
        if remaining == 0 {
            return true;
        }
        remaining -= 1;
        false
    };

    let played = clock.run(&mut sequencer, &mut out, None, &mut stop).unwrap();
    assert_eq!(played as usize, steps);
    assert_eq!(sequencer.current_position(), 0);

    let events = decode(out.sink());
    assert_eq!(
        events[0],
        MidiEvent::ProgramChange {
            channel: 9,
            program: 9
        }
    );

    // no note number is ever struck twice without a note-off in between,
    // and everything is silent once playback has stopped
    let mut sounding: HashMap<u8, bool> = HashMap::new();
    for event in &events[1..] {
        match *event {
            MidiEvent::NoteOn { channel, note, .. } => {
                assert_eq!(channel, 9);
                let was = sounding.insert(note, true).unwrap_or(false);
                assert!(!was, "note {} retriggered without note-off", note);
            }
            MidiEvent::NoteOff { note, .. } => {
                sounding.insert(note, false);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
    assert!(sounding.values().all(|on| !on));

    // closed hi-hat: 13 hits in the bar
    let hats = events[1..]
        .iter()
        .filter(|e| matches!(e, MidiEvent::NoteOn { note: 42, .. }))
        .count();
    assert_eq!(hats, 13);
}

#[test]
fn unequal_lanes_are_rejected() {
    let text = "36 x...\n38 ..x\n";
    assert_eq!(
        Pattern::compile(text),
        Err(MalformedPatternError::LaneLength {
            line: 2,
            expected: 4,
            found: 3
        })
    );
}

#[test]
fn shipped_files_load() {
    let root = env!("CARGO_MANIFEST_DIR");
    let config = Config::load(format!("{}/drumbox.ron", root)).unwrap();
    assert_eq!(config.kit, Some(9));
    assert_eq!(config.clock().unwrap().bpm(), 90.0);

    let text = std::fs::read_to_string(format!("{}/patterns/funky_drummer.txt", root)).unwrap();
    let from_file = Pattern::compile(&text).unwrap();
    let builtin = Pattern::compile(patterns::FUNKY_DRUMMER).unwrap();
    assert_eq!(from_file.lanes(), builtin.lanes());
}
