// Output capabilities - Opaque collaborators the scheduler plays through
// Exactly one path is active at a time, selected by the output mode toggle

use crate::midi::MidiError;
use crate::pitch::Pitch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which output path the scheduler drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Internal tone generator, single attack-release per step
    #[default]
    Synth,
    /// External MIDI device, note-on plus delayed note-off
    Midi,
}

/// Internal synthesis capability
///
/// The engine never renders audio itself; it only asks this collaborator for
/// a short note or a click.
pub trait ToneGenerator: Send {
    /// Trigger a single attack-release
    /// `duration_fraction` is the note length as a fraction of a whole note
    fn trigger_note(&mut self, pitch: Pitch, duration_fraction: f64);

    /// Trigger a metronome click at the given velocity
    fn trigger_click(&mut self, velocity: f32);
}

/// External MIDI send capability
pub trait MidiSender: Send {
    /// Send one raw MIDI message
    fn send(&mut self, message: &[u8]) -> Result<(), MidiError>;
}

/// Thread-shared output mode toggle
#[derive(Debug, Default)]
pub struct OutputSelector {
    midi: AtomicBool,
}

impl OutputSelector {
    pub fn new(mode: OutputMode) -> Arc<Self> {
        let selector = Arc::new(Self::default());
        selector.set_mode(mode);
        selector
    }

    pub fn mode(&self) -> OutputMode {
        if self.midi.load(Ordering::Relaxed) {
            OutputMode::Midi
        } else {
            OutputMode::Synth
        }
    }

    pub fn set_mode(&self, mode: OutputMode) {
        self.midi
            .store(matches!(mode, OutputMode::Midi), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_toggle() {
        let selector = OutputSelector::new(OutputMode::Synth);
        assert_eq!(selector.mode(), OutputMode::Synth);

        selector.set_mode(OutputMode::Midi);
        assert_eq!(selector.mode(), OutputMode::Midi);

        selector.set_mode(OutputMode::Synth);
        assert_eq!(selector.mode(), OutputMode::Synth);
    }
}
