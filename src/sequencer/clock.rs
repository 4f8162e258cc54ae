/// Tempo clock - fixed step duration with drift-compensated sleeping
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::Sequencer;
use crate::error::{ConfigurationError, TransportError};
use crate::midi::{ByteSink, Channel, MidiOut};

pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 400.0;

/// Time a receiving synth gets to load a kit after a program change.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(300);

/// Polled between steps; playback ends once it reports true.
pub trait StopSignal {
    fn should_stop(&mut self) -> bool;
}

impl StopSignal for AtomicBool {
    fn should_stop(&mut self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl StopSignal for Arc<AtomicBool> {
    fn should_stop(&mut self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F: FnMut() -> bool> StopSignal for F {
    fn should_stop(&mut self) -> bool {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoClock {
    bpm: f32,
    steps_per_beat: u32,
    step_duration: Duration,
    kit: Option<u8>,
    settle: Duration,
}

impl TempoClock {
    pub fn new(bpm: f32, steps_per_beat: u32) -> Result<Self, ConfigurationError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigurationError::InvalidTempo(bpm));
        }
        if steps_per_beat == 0 {
            return Err(ConfigurationError::InvalidStepsPerBeat);
        }

        let clamped = bpm.clamp(MIN_BPM, MAX_BPM);
        if clamped != bpm {
            log::warn!("tempo {} bpm clamped to {} bpm", bpm, clamped);
        }

        let step_nanos = 60e9 / clamped as f64 / steps_per_beat as f64;
        Ok(Self {
            bpm: clamped,
            steps_per_beat,
            step_duration: Duration::from_nanos(step_nanos.round() as u64),
            kit: None,
            settle: DEFAULT_SETTLE,
        })
    }

    /// Sends a program change before the first step and waits `settle`.
    pub fn with_kit(mut self, kit: u8, settle: Duration) -> Self {
        self.kit = Some(kit);
        self.settle = settle;
        self
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_beat
    }

    pub fn step_duration(&self) -> Duration {
        self.step_duration
    }

    pub fn kit(&self) -> Option<u8> {
        self.kit
    }

    /// How long to sleep after a step whose work took `elapsed`.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.step_duration.saturating_sub(elapsed)
    }

    pub fn run<S, T>(
        &self,
        sequencer: &mut Sequencer,
        out: &mut MidiOut<S>,
        channel: Option<Channel>,
        stop: &mut T,
    ) -> Result<u64, TransportError>
    where
        S: ByteSink,
        T: StopSignal + ?Sized,
    {
        self.run_with(sequencer, out, channel, stop, |_| {})
    }

    /// Plays until `stop` fires, calling `on_step` with each column played.
    /// Returns the number of steps played.
    ///
    /// When a step fails, an all-sound-off is attempted before the error is
    /// returned. A clean stop releases the sounding notes.
    pub fn run_with<S, T, F>(
        &self,
        sequencer: &mut Sequencer,
        out: &mut MidiOut<S>,
        channel: Option<Channel>,
        stop: &mut T,
        mut on_step: F,
    ) -> Result<u64, TransportError>
    where
        S: ByteSink,
        T: StopSignal + ?Sized,
        F: FnMut(usize),
    {
        if let Some(kit) = self.kit {
            log::info!("selecting kit {}, waiting {:?}", kit, self.settle);
            out.program_change(kit, channel)?;
            thread::sleep(self.settle);
        }

        log::info!(
            "playing {} steps at {} bpm ({:?} per step)",
            sequencer.pattern().steps(),
            self.bpm,
            self.step_duration
        );

        let mut played = 0u64;
        while !stop.should_stop() {
            let last_tick = Instant::now();
            let column = sequencer.current_position();

            if let Err(e) = sequencer.advance(out, channel) {
                log::error!("step {} failed: {}", column, e);
                if let Err(cleanup) = out.all_sound_off(channel) {
                    log::warn!("all sound off failed: {}", cleanup);
                }
                return Err(e);
            }
            played += 1;
            on_step(column);

            let wait = self.remaining(last_tick.elapsed());
            if !wait.is_zero() {
                thread::sleep(wait);
            }
        }

        if let Err(e) = sequencer.release(out, channel) {
            log::error!("releasing notes failed: {}", e);
            if let Err(cleanup) = out.all_sound_off(channel) {
                log::warn!("all sound off failed: {}", cleanup);
            }
            return Err(e);
        }
        log::info!("stopped after {} steps", played);
        Ok(played)
    }
}
