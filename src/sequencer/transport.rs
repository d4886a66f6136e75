// Transport - Playback state shared between controller and clock thread
// Thread-safe via atomics; the clock thread re-reads tempo every tick

use crate::sequencer::timeline::Tempo;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Transport state (play/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

/// Shared transport state
///
/// Holds only a read/advance cursor into the pattern, never a copy of it.
/// Tempo lives here as raw f64 bits so the clock thread picks up live changes.
#[derive(Debug)]
pub struct SharedTransportState {
    playing: AtomicBool,
    current_step: AtomicUsize,
    tempo_bits: AtomicU64,
}

impl SharedTransportState {
    /// Create new shared transport state
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get current transport state
    pub fn state(&self) -> TransportState {
        if self.playing.load(Ordering::Relaxed) {
            TransportState::Playing
        } else {
            TransportState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    /// Mark playback started; the cursor resets to step 0
    pub fn start(&self) {
        self.current_step.store(0, Ordering::Relaxed);
        self.playing.store(true, Ordering::Relaxed);
    }

    /// Mark playback stopped; the cursor keeps its position
    pub fn stop(&self) {
        self.playing.store(false, Ordering::Relaxed);
    }

    pub fn current_step(&self) -> usize {
        self.current_step.load(Ordering::Relaxed)
    }

    /// Advance the cursor with wraparound, returning the step that was current
    pub fn advance_step(&self, total_steps: usize) -> usize {
        let current = self.current_step.load(Ordering::Relaxed);
        let next = if total_steps == 0 {
            0
        } else {
            (current + 1) % total_steps
        };
        self.current_step.store(next, Ordering::Relaxed);
        current
    }

    pub fn tempo(&self) -> Tempo {
        Tempo::clamped(f64::from_bits(self.tempo_bits.load(Ordering::Relaxed)))
    }

    pub fn set_tempo(&self, tempo: Tempo) {
        self.tempo_bits
            .store(tempo.bpm().to_bits(), Ordering::Relaxed);
    }
}

impl Default for SharedTransportState {
    fn default() -> Self {
        Self {
            playing: AtomicBool::new(false),
            current_step: AtomicUsize::new(0),
            tempo_bits: AtomicU64::new(Tempo::default().bpm().to_bits()),
        }
    }
}
