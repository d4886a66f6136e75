// Notifications - engine → UI events, purely observational

use crate::sequencer::transport::TransportState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// A tick fired: highlight this step and metronome slot
    StepHighlight { step: usize, metro_slot: usize },
    /// Playback started or stopped
    TransportChanged(TransportState),
}
