// MIDI module - events, wire encoding and output device management

pub mod event;
pub mod output;

pub use event::{MidiEvent, DEFAULT_VELOCITY, NOTE_DURATION_MS, NOTE_OFF, NOTE_ON};
pub use output::{MidiDeviceInfo, MidiDeviceManager, MidiError};
