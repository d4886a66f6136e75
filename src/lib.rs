// stepweaver - a step-sequencer pattern and playback engine
//
// The crate is UI-agnostic: a front end drives it with `Command` values,
// renders from the shared `Pattern`, and polls the notification channel for
// step highlights. Audio rendering and MIDI hardware sit behind the
// `ToneGenerator` and `MidiSender` capabilities.

pub mod engine;
pub mod messaging;
pub mod midi;
pub mod output;
pub mod pitch;
pub mod score;
pub mod sequencer;

pub use engine::{Engine, EngineError};
pub use messaging::{Command, Notification, NotificationConsumer};
pub use output::{MidiSender, OutputMode, OutputSelector, ToneGenerator};
pub use pitch::{Pitch, PitchError};
pub use score::{LoadedPattern, ScoreError};
pub use sequencer::{Pattern, PatternError, RowConfig, Tempo, TimeSignature};
