// Command types - UI → engine mutations
// The engine exposes no UI-toolkit hooks; everything arrives as a command

use crate::output::OutputMode;
use crate::sequencer::timeline::TimeSignature;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Flip one step on or off
    ToggleStep(usize),
    /// Change how many rows the grid cycles through (clamped to 1..=4)
    SetNumRows(usize),
    /// Change meter; recomputes row length and metronome interval
    SetTimeSignature(TimeSignature),
    /// Transpose a row, in semitones (clamped to -12..=12)
    SetRowTranspose { row: usize, semitones: i8 },
    /// Assign a note pool to a row
    SetRowPool { row: usize, pool: String },
    /// Re-roll a row's on/off flags and pitches
    RandomizeRow(usize),
    /// Change the root note (chromatic class and octave)
    SetRoot { class: u8, octave: i8 },
    /// Change playback tempo in BPM
    SetTempo(f64),
    /// Switch between internal synthesis and MIDI output
    SetOutputMode(OutputMode),
    /// Bind (or unbind with None) a MIDI output device by name
    SetMidiDevice(Option<String>),
    /// Start playback from step 0
    Start,
    /// Stop playback, keeping the cursor
    Stop,
}
