// Timeline - Time signature and tempo
// Derives the step grid geometry (row length, metronome interval) and the clock rate

use std::fmt;
use std::time::Duration;

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature { numerator: 4, denominator: 4 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per bar
    pub denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

impl TimeSignature {
    /// Creates a new time signature
    pub fn new(numerator: u8, denominator: u8) -> Self {
        assert!(numerator > 0, "Time signature numerator must be > 0");
        assert!(
            denominator.is_power_of_two(),
            "Time signature denominator must be power of 2"
        );
        Self {
            numerator,
            denominator,
        }
    }

    /// Fallible constructor for values read from files
    pub fn try_new(numerator: u8, denominator: u8) -> Option<Self> {
        if numerator == 0 || numerator > 32 || !denominator.is_power_of_two() || denominator > 32 {
            None
        } else {
            Some(Self {
                numerator,
                denominator,
            })
        }
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    /// Common 6/8 time signature
    pub fn six_eight() -> Self {
        Self::new(6, 8)
    }

    /// Whether this is simple meter (quarter-note beat)
    pub fn is_simple(&self) -> bool {
        self.denominator == 4
    }

    /// Steps in one row of the grid
    /// Simple meter gets four steps per beat, compound meter two
    pub fn steps_per_row(&self) -> usize {
        if self.is_simple() {
            self.numerator as usize * 4
        } else {
            self.numerator as usize * 2
        }
    }

    /// Steps between visual beat markers
    pub fn subdivision(&self) -> usize {
        if self.is_simple() {
            4
        } else {
            2
        }
    }

    /// Steps between audible metronome accents
    /// Compound meters divisible by three accent the dotted-quarter pulse
    pub fn metronome_interval(&self) -> usize {
        if self.is_simple() {
            4
        } else if self.numerator % 3 == 0 && self.numerator >= 6 {
            6
        } else {
            2
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 20.0;
    pub const MAX_BPM: f64 = 999.0;

    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> Self {
        assert!(
            (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm),
            "BPM must be between 20 and 999"
        );
        Self { bpm }
    }

    /// Create from an untrusted value, clamping into the valid range
    pub fn clamped(bpm: f64) -> Self {
        let bpm = if bpm.is_finite() { bpm } else { 120.0 };
        Self {
            bpm: bpm.clamp(Self::MIN_BPM, Self::MAX_BPM),
        }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one scheduler tick (one sixteenth note)
    /// The clock runs at 16 ticks per quarter-note bar: 60/(bpm*4) seconds
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(60.0 / (self.bpm * 4.0))
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}
