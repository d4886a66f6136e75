// Engine - Top-level context: owns the pattern, transport, scheduler and outputs
// The UI talks to it exclusively through Command values and the notification channel

use crate::messaging::channels::{
    create_notification_channel, NotificationConsumer, NotificationProducer,
};
use crate::messaging::command::Command;
use crate::messaging::notification::Notification;
use crate::midi::{MidiDeviceInfo, MidiDeviceManager, MidiError};
use crate::output::{OutputMode, OutputSelector, ToneGenerator};
use crate::score::{self, ScoreError};
use crate::sequencer::pattern::{Pattern, PatternError};
use crate::sequencer::scheduler::Scheduler;
use crate::sequencer::timeline::Tempo;
use crate::sequencer::transport::SharedTransportState;
use ringbuf::traits::Producer;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Midi(#[from] MidiError),

    #[error(transparent)]
    Score(#[from] ScoreError),
}

pub struct Engine {
    pattern: Arc<Mutex<Pattern>>,
    transport: Arc<SharedTransportState>,
    selector: Arc<OutputSelector>,
    scheduler: Scheduler,
    notifications: Arc<Mutex<NotificationProducer>>,
    midi_devices: MidiDeviceManager,
    midi_bound: bool,
}

impl Engine {
    /// Build an engine around the given tone generator
    ///
    /// Returns the consumer side of the notification channel for the UI to
    /// poll.
    pub fn new(
        tone: Box<dyn ToneGenerator>,
        notification_capacity: usize,
    ) -> (Self, NotificationConsumer) {
        let (tx, rx) = create_notification_channel(notification_capacity);
        let notifications = Arc::new(Mutex::new(tx));

        let pattern = Arc::new(Mutex::new(Pattern::default()));
        let transport = SharedTransportState::new();
        let selector = OutputSelector::new(Default::default());

        let scheduler = Scheduler::new(
            Arc::clone(&pattern),
            Arc::clone(&transport),
            Arc::clone(&selector),
            tone,
            Arc::clone(&notifications),
        );

        let engine = Self {
            pattern,
            transport,
            selector,
            scheduler,
            notifications,
            midi_devices: MidiDeviceManager::new(),
            midi_bound: false,
        };
        (engine, rx)
    }

    /// Lock the pattern for reading (the UI renders from this)
    pub fn pattern(&self) -> MutexGuard<'_, Pattern> {
        lock_ignoring_poison(&self.pattern)
    }

    pub fn tempo(&self) -> Tempo {
        self.transport.tempo()
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// Step the cursor currently points at
    pub fn current_step(&self) -> usize {
        self.transport.current_step()
    }

    pub fn list_midi_devices(&self) -> Vec<MidiDeviceInfo> {
        self.midi_devices.list_output_ports()
    }

    /// Apply one UI command
    pub fn apply(&mut self, command: Command) -> Result<(), EngineError> {
        let mut rng = rand::thread_rng();

        match command {
            Command::ToggleStep(step) => {
                lock_ignoring_poison(&self.pattern).toggle_step(step, &mut rng)?;
            }
            Command::SetNumRows(num_rows) => {
                lock_ignoring_poison(&self.pattern).set_num_rows(num_rows);
            }
            Command::SetTimeSignature(ts) => {
                lock_ignoring_poison(&self.pattern).set_time_signature(ts);
            }
            Command::SetRowTranspose { row, semitones } => {
                lock_ignoring_poison(&self.pattern).set_row_transpose(row, semitones, &mut rng)?;
            }
            Command::SetRowPool { row, pool } => {
                lock_ignoring_poison(&self.pattern).set_row_pool(row, &pool, &mut rng)?;
            }
            Command::RandomizeRow(row) => {
                lock_ignoring_poison(&self.pattern).randomize_row(row, &mut rng)?;
            }
            Command::SetRoot { class, octave } => {
                lock_ignoring_poison(&self.pattern).set_root(class, octave, &mut rng);
            }
            Command::SetTempo(bpm) => {
                self.transport.set_tempo(Tempo::clamped(bpm));
            }
            Command::SetOutputMode(mode) => {
                // First switch to MIDI with nothing bound grabs the first
                // available port; failure keeps the mode switch non-fatal
                if mode == OutputMode::Midi && !self.midi_bound {
                    match self.midi_devices.connect_default() {
                        Ok(connection) => {
                            self.scheduler.set_midi_sender(Some(Box::new(connection)));
                            self.midi_bound = true;
                        }
                        Err(e) => log::warn!("no default MIDI output bound: {}", e),
                    }
                }
                self.selector.set_mode(mode);
            }
            Command::SetMidiDevice(Some(name)) => {
                let connection = self.midi_devices.connect_by_name(&name)?;
                self.scheduler.set_midi_sender(Some(Box::new(connection)));
                self.midi_bound = true;
            }
            Command::SetMidiDevice(None) => {
                self.scheduler.set_midi_sender(None);
                self.midi_bound = false;
            }
            Command::Start => {
                self.scheduler.start();
                self.notify_transport();
            }
            Command::Stop => {
                self.scheduler.stop();
                self.notify_transport();
            }
        }
        Ok(())
    }

    /// Write the current pattern to a MusicXML file
    pub fn save_pattern<P: AsRef<Path>>(&self, path: P) -> Result<(), EngineError> {
        let pattern = lock_ignoring_poison(&self.pattern);
        score::save_file(path, &pattern, self.transport.tempo())?;
        Ok(())
    }

    /// Replace the current pattern from a MusicXML file
    ///
    /// The live pattern is swapped only after the whole document decoded
    /// successfully; a tempo hint in the file is applied as well.
    pub fn load_pattern<P: AsRef<Path>>(&mut self, path: P) -> Result<(), EngineError> {
        let loaded = score::load_file(path, &mut rand::thread_rng())?;

        log::info!(
            "loaded pattern: {} rows, {} steps",
            loaded.pattern.num_rows(),
            loaded.pattern.total_steps()
        );
        *lock_ignoring_poison(&self.pattern) = loaded.pattern;
        if let Some(tempo) = loaded.tempo {
            self.transport.set_tempo(tempo);
        }
        Ok(())
    }

    fn notify_transport(&self) {
        let state = self.transport.state();
        let _ = lock_ignoring_poison(&self.notifications)
            .try_push(Notification::TransportChanged(state));
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::Pitch;
    use crate::sequencer::timeline::TimeSignature;
    use crate::sequencer::transport::TransportState;
    use ringbuf::traits::Consumer;

    struct NullTone;

    impl ToneGenerator for NullTone {
        fn trigger_note(&mut self, _pitch: Pitch, _duration_fraction: f64) {}
        fn trigger_click(&mut self, _velocity: f32) {}
    }

    fn engine() -> (Engine, NotificationConsumer) {
        Engine::new(Box::new(NullTone), 64)
    }

    #[test]
    fn test_commands_mutate_pattern() {
        let (mut engine, _rx) = engine();

        engine.apply(Command::SetNumRows(2)).unwrap();
        engine.apply(Command::ToggleStep(5)).unwrap();
        engine
            .apply(Command::SetRowPool {
                row: 1,
                pool: "minor_triad".to_string(),
            })
            .unwrap();
        engine
            .apply(Command::SetRowTranspose {
                row: 0,
                semitones: 7,
            })
            .unwrap();

        let pattern = engine.pattern();
        assert_eq!(pattern.num_rows(), 2);
        assert!(pattern.is_active(5));
        assert_eq!(pattern.rows()[1].pool, "minor_triad");
        assert_eq!(pattern.rows()[0].transpose_semitones, 7);
    }

    #[test]
    fn test_row_command_out_of_range() {
        let (mut engine, _rx) = engine();
        let result = engine.apply(Command::RandomizeRow(3));
        assert!(matches!(
            result,
            Err(EngineError::Pattern(PatternError::RowOutOfRange(3)))
        ));
    }

    #[test]
    fn test_tempo_command_clamps() {
        let (mut engine, _rx) = engine();
        engine.apply(Command::SetTempo(5000.0)).unwrap();
        assert_eq!(engine.tempo().bpm(), Tempo::MAX_BPM);
        engine.apply(Command::SetTempo(f64::NAN)).unwrap();
        assert_eq!(engine.tempo().bpm(), 120.0);
    }

    #[test]
    fn test_output_mode_command() {
        let (mut engine, _rx) = engine();
        engine
            .apply(Command::SetOutputMode(OutputMode::Midi))
            .unwrap();
        assert_eq!(engine.selector.mode(), OutputMode::Midi);
    }

    #[test]
    fn test_midi_mode_auto_bind_is_non_fatal() {
        // Switching to MIDI tries the first available port; with or without
        // one present the mode switch itself must succeed, repeatedly and
        // across an explicit unbind
        let (mut engine, _rx) = engine();
        engine
            .apply(Command::SetOutputMode(OutputMode::Midi))
            .unwrap();
        engine.apply(Command::SetMidiDevice(None)).unwrap();
        assert!(!engine.midi_bound);
        engine
            .apply(Command::SetOutputMode(OutputMode::Midi))
            .unwrap();
        assert_eq!(engine.selector.mode(), OutputMode::Midi);
    }

    #[test]
    fn test_time_signature_command_resizes() {
        let (mut engine, _rx) = engine();
        engine
            .apply(Command::SetTimeSignature(TimeSignature::six_eight()))
            .unwrap();
        assert_eq!(engine.pattern().total_steps(), 12);
    }

    #[test]
    fn test_start_stop_notifies() {
        let (mut engine, mut rx) = engine();

        engine.apply(Command::Start).unwrap();
        assert!(engine.is_playing());
        assert_eq!(
            rx.try_pop(),
            Some(Notification::TransportChanged(TransportState::Playing))
        );

        engine.apply(Command::Stop).unwrap();
        assert!(!engine.is_playing());
        // Tick highlights may precede the stop notification
        let mut saw_stop = false;
        while let Some(event) = rx.try_pop() {
            if event == Notification::TransportChanged(TransportState::Stopped) {
                saw_stop = true;
            }
        }
        assert!(saw_stop);
    }

    #[test]
    fn test_unbind_midi_device() {
        let (mut engine, _rx) = engine();
        engine.apply(Command::SetMidiDevice(None)).unwrap();
    }
}
