// Sequencer module - pattern grid, note generation and the playback clock

pub mod generator;
pub mod metronome;
pub mod pattern;
pub mod pools;
pub mod scheduler;
pub mod timeline;
pub mod transport;

pub use metronome::ClickType;
pub use pattern::{Pattern, PatternError, RowConfig, MAX_ROWS};
pub use pools::{NotePool, PoolId, NOTE_POOLS};
pub use scheduler::Scheduler;
pub use timeline::{Tempo, TimeSignature};
pub use transport::{SharedTransportState, TransportState};
