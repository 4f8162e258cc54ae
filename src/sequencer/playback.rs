/// Playback engine - runs the tempo clock on its own thread
/// The thread owns the sequencer and the MIDI output; the caller only holds a
/// stop flag and an event receiver
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::clock::TempoClock;
use super::{Pattern, Sequencer, VelocityTable};
use crate::midi::{ByteSink, Channel, MidiOut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    StepAdvanced(usize),
    Stopped { steps: u64 },
    Failed(String),
}

pub struct PlaybackEngine {
    sender: Sender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
    stop: Arc<AtomicBool>,
    is_running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        let (sender, receiver) = channel();

        Self {
            sender,
            receiver,
            stop: Arc::new(AtomicBool::new(false)),
            is_running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Starts playing `pattern` from column 0. Does nothing if already running.
    pub fn start<S>(
        &mut self,
        pattern: Pattern,
        velocities: VelocityTable,
        clock: TempoClock,
        sink: S,
        channel: Channel,
    ) where
        S: ByteSink + Send + 'static,
    {
        if self.is_running() {
            return;
        }
        // reap a previous run that stopped on its own
        self.join();

        self.stop.store(false, Ordering::Relaxed);
        self.is_running.store(true, Ordering::Relaxed);

        let stop = Arc::clone(&self.stop);
        let is_running = Arc::clone(&self.is_running);
        let sender = self.sender.clone();

        self.handle = Some(thread::spawn(move || {
            let mut sequencer = Sequencer::with_velocities(pattern, velocities);
            let mut out = MidiOut::with_channel(sink, channel);
            let mut stop = stop;

            let result = clock.run_with(&mut sequencer, &mut out, None, &mut stop, |step| {
                let _ = sender.send(PlaybackEvent::StepAdvanced(step));
            });

            let event = match result {
                Ok(steps) => PlaybackEvent::Stopped { steps },
                Err(e) => PlaybackEvent::Failed(e.to_string()),
            };
            is_running.store(false, Ordering::Relaxed);
            let _ = sender.send(event);
        }));
    }

    /// Asks the play loop to finish after the current step.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Shared flag that stops playback when set, e.g. from an input thread.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Waits for the play thread to exit.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("playback thread panicked");
            }
        }
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl ByteSink for SharedSink {
        fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }
    }

    struct DeadSink;

    impl ByteSink for DeadSink {
        fn write(&mut self, _bytes: &[u8]) -> Result<(), TransportError> {
            Err(TransportError::Disconnected)
        }
    }

    fn clock() -> TempoClock {
        TempoClock::new(400.0, 4).unwrap()
    }

    #[test]
    fn test_start_and_stop() {
        let sink = SharedSink::default();
        let mut engine = PlaybackEngine::new();
        engine.start(
            Pattern::compile("36 x.").unwrap(),
            VelocityTable::default(),
            clock(),
            sink.clone(),
            Channel::DRUMS,
        );
        assert!(engine.is_running());

        thread::sleep(Duration::from_millis(100));
        engine.stop();
        engine.join();
        assert!(!engine.is_running());

        let events = engine.poll_events();
        assert!(matches!(events.first(), Some(PlaybackEvent::StepAdvanced(0))));
        assert!(matches!(events.last(), Some(PlaybackEvent::Stopped { steps }) if *steps > 0));

        let bytes = sink.0.lock().unwrap();
        assert_eq!(&bytes[..3], &[0x99, 36, 120]);
    }

    #[test]
    fn test_failure_is_reported() {
        let mut engine = PlaybackEngine::new();
        engine.start(
            Pattern::compile("36 x").unwrap(),
            VelocityTable::default(),
            clock(),
            DeadSink,
            Channel::DRUMS,
        );
        engine.join();

        assert!(!engine.is_running());
        assert_eq!(
            engine.poll_events(),
            vec![PlaybackEvent::Failed(TransportError::Disconnected.to_string())]
        );
    }
}
