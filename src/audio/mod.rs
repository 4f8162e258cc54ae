/// Audio monitor using cpal
/// Renders every note-on the sequencer sends as a short decaying sine blip,
/// so patterns can be auditioned without a MIDI synth attached
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

use crate::error::TransportError;
use crate::midi::{ByteSink, MidiEvent, ALL_SOUND_OFF};

/// Amplitude multiplier per second.
const DECAY_PER_SECOND: f32 = 0.0005;
const MAX_GAIN: f32 = 0.2;

#[derive(Debug, Default, Clone, Copy)]
struct Voice {
    frequency: f32,
    amplitude: f32,
    phase: f32,
}

pub struct AudioMonitor {
    _stream: Option<cpal::Stream>,
    voice: Arc<Mutex<Voice>>,
}

impl AudioMonitor {
    pub fn new() -> Option<Self> {
        let voice = Arc::new(Mutex::new(Voice::default()));
        let stream = Self::setup_audio_stream(Arc::clone(&voice))?;

        Some(Self {
            _stream: Some(stream),
            voice,
        })
    }

    /// A monitor that accepts messages but plays nothing.
    pub fn silent() -> Self {
        Self {
            _stream: None,
            voice: Arc::new(Mutex::new(Voice::default())),
        }
    }

    pub fn is_audible(&self) -> bool {
        self._stream.is_some()
    }

    fn setup_audio_stream(voice: Arc<Mutex<Voice>>) -> Option<cpal::Stream> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let config = device.default_output_config().ok()?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let decay = DECAY_PER_SECOND.powf(1.0 / sample_rate);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut voice) = voice.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    for frame in data.chunks_mut(channels.max(1)) {
                        let sample = voice.next_sample(sample_rate, decay);
                        frame.fill(sample);
                    }
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            ),
            format => {
                log::warn!("unsupported sample format {:?}, monitor disabled", format);
                return None;
            }
        };

        match stream {
            Ok(stream) => {
                if let Err(e) = stream.play() {
                    log::warn!("failed to start audio stream: {}", e);
                }
                Some(stream)
            }
            Err(e) => {
                log::warn!("failed to open audio stream: {}", e);
                None
            }
        }
    }

    /// Sink to hand to the playback thread; it shares this monitor's voice.
    pub fn sink(&self) -> MonitorSink {
        MonitorSink {
            voice: Arc::clone(&self.voice),
        }
    }
}

impl Default for AudioMonitor {
    fn default() -> Self {
        Self::new().unwrap_or_else(Self::silent)
    }
}

impl Voice {
    fn next_sample(&mut self, sample_rate: f32, decay: f32) -> f32 {
        if self.amplitude < 1e-4 {
            self.amplitude = 0.0;
            return 0.0;
        }
        let sample = (self.phase * 2.0 * std::f32::consts::PI).sin() * self.amplitude;
        self.phase += self.frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.amplitude *= decay;
        sample
    }

    fn trigger(&mut self, note: u8, velocity: u8) {
        self.frequency = midi_note_to_frequency(note);
        self.amplitude = MAX_GAIN * velocity as f32 / 127.0;
        self.phase = 0.0;
    }
}

#[derive(Clone)]
pub struct MonitorSink {
    voice: Arc<Mutex<Voice>>,
}

impl ByteSink for MonitorSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let Ok(mut voice) = self.voice.lock() else {
            return Ok(());
        };
        match MidiEvent::from_bytes(bytes) {
            Some(MidiEvent::NoteOn { note, velocity, .. }) => voice.trigger(note, velocity),
            Some(MidiEvent::ControlChange {
                controller: ALL_SOUND_OFF,
                ..
            }) => voice.amplitude = 0.0,
            // drum hits ring out; note-offs are ignored
            _ => {}
        }
        Ok(())
    }
}

fn midi_note_to_frequency(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amplitude(monitor: &AudioMonitor) -> f32 {
        monitor.voice.lock().unwrap().amplitude
    }

    #[test]
    fn test_note_on_triggers_voice() {
        let monitor = AudioMonitor::silent();
        let mut sink = monitor.sink();
        sink.write(&[0x99, 69, 127]).unwrap();

        let voice = *monitor.voice.lock().unwrap();
        assert_eq!(voice.frequency, 440.0);
        assert!((voice.amplitude - MAX_GAIN).abs() < 1e-6);
    }

    #[test]
    fn test_note_off_rings_out() {
        let monitor = AudioMonitor::silent();
        let mut sink = monitor.sink();
        sink.write(&[0x99, 36, 100]).unwrap();
        sink.write(&[0x99, 36, 0]).unwrap();
        assert!(amplitude(&monitor) > 0.0);
    }

    #[test]
    fn test_all_sound_off_silences() {
        let monitor = AudioMonitor::silent();
        let mut sink = monitor.sink();
        sink.write(&[0x99, 36, 100]).unwrap();
        sink.write(&[0xB9, ALL_SOUND_OFF, 0]).unwrap();
        assert_eq!(amplitude(&monitor), 0.0);
    }

    #[test]
    fn test_voice_decays() {
        let mut voice = Voice::default();
        voice.trigger(60, 127);
        let decay = DECAY_PER_SECOND.powf(1.0 / 1000.0);
        for _ in 0..1000 {
            voice.next_sample(1000.0, decay);
        }
        assert!(voice.amplitude < MAX_GAIN * 0.001);
    }

    #[test]
    fn test_midi_note_to_frequency() {
        assert_eq!(midi_note_to_frequency(69), 440.0);
        assert!((midi_note_to_frequency(60) - 261.63).abs() < 0.01);
    }
}
