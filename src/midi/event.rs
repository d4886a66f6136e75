// MIDI events and wire encoding

/// Note-on status byte (channel 1)
pub const NOTE_ON: u8 = 0x90;

/// Note-off status byte (channel 1)
pub const NOTE_OFF: u8 = 0x80;

/// Velocity used for every sequenced note
pub const DEFAULT_VELOCITY: u8 = 100;

/// Wall-clock gap between note-on and note-off, independent of tempo
pub const NOTE_DURATION_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

impl MidiEvent {
    /// Encode as a raw three-byte MIDI message
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiEvent::NoteOn { note, velocity } => [NOTE_ON, note, velocity],
            MidiEvent::NoteOff { note } => [NOTE_OFF, note, 0],
        }
    }
}
