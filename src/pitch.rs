// Pitch - MIDI note numbers and pitch name conversion
// Pitches are stored as MIDI numbers; names use sharps ("C#4", middle C = C4 = 60)

use std::fmt;

/// Lowest pitch the instrument range accepts
pub const MIN_PITCH: u8 = 12;

/// Highest pitch the instrument range accepts (MIDI ceiling)
pub const MAX_PITCH: u8 = 127;

/// The twelve chromatic pitch class names, sharps only
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pitch error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PitchError {
    #[error("Unparseable pitch name: {0}")]
    Parse(String),

    #[error("Pitch {0} outside MIDI range")]
    OutOfRange(i32),
}

/// A pitch as a MIDI note number, always in [0, 127]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pitch(u8);

impl Pitch {
    /// Create from a MIDI note number
    pub fn from_midi(midi: i32) -> Result<Self, PitchError> {
        if (0..=127).contains(&midi) {
            Ok(Self(midi as u8))
        } else {
            Err(PitchError::OutOfRange(midi))
        }
    }

    /// Create from a MIDI note number, clamping into the instrument range
    pub fn clamped(midi: i32) -> Self {
        Self(midi.clamp(MIN_PITCH as i32, MAX_PITCH as i32) as u8)
    }

    /// Parse a pitch name like "C4", "F#3" or "Bb2"
    pub fn from_name(name: &str) -> Result<Self, PitchError> {
        let mut chars = name.chars();
        let letter = chars
            .next()
            .ok_or_else(|| PitchError::Parse(name.to_string()))?;

        let mut class: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(PitchError::Parse(name.to_string())),
        };

        let rest: String = chars.collect();
        let octave_str = if let Some(stripped) = rest.strip_prefix('#') {
            class += 1;
            stripped
        } else if let Some(stripped) = rest.strip_prefix('b') {
            class -= 1;
            stripped
        } else {
            rest.as_str()
        };

        let octave: i32 = octave_str
            .parse()
            .map_err(|_| PitchError::Parse(name.to_string()))?;

        Self::from_midi((octave + 1) * 12 + class)
    }

    /// Build a pitch from a chromatic class (0..12) and an octave
    pub fn from_class_and_octave(class: u8, octave: i8) -> Result<Self, PitchError> {
        Self::from_midi((octave as i32 + 1) * 12 + class as i32 % 12)
    }

    /// MIDI note number
    pub fn midi(&self) -> u8 {
        self.0
    }

    /// Chromatic pitch class (0 = C, 11 = B)
    pub fn class(&self) -> u8 {
        self.0 % 12
    }

    /// Octave in scientific pitch notation (C4 = 60)
    pub fn octave(&self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    /// Render the pitch name with sharps, e.g. "C#4"
    pub fn name(&self) -> String {
        format!("{}{}", PITCH_CLASS_NAMES[self.class() as usize], self.octave())
    }

    /// Shift by a number of semitones
    ///
    /// Fails when the result leaves the MIDI range, so callers can fall back
    /// to regenerating the pitch instead of silently wrapping.
    pub fn transposed(&self, semitones: i32) -> Result<Self, PitchError> {
        Self::from_midi(self.0 as i32 + semitones)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parse a bare pitch class name ("C", "F#") to its chromatic index
pub fn pitch_class_from_name(name: &str) -> Result<u8, PitchError> {
    PITCH_CLASS_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| i as u8)
        .ok_or_else(|| PitchError::Parse(name.to_string()))
}
