// Pattern - The step grid: per-step on/off flags, cached pitches, row configuration
// Rows own contiguous slices of steps; resizing copies data positionally, never reorders

use crate::pitch::Pitch;
use crate::sequencer::generator::generate_pitch;
use crate::sequencer::pools::{self, PoolId, DEFAULT_POOL};
use crate::sequencer::timeline::TimeSignature;
use num_bigint::BigUint;
use rand::Rng;

/// Maximum number of rows the grid can cycle through
pub const MAX_ROWS: usize = 4;

/// Probability that `randomize_row` switches a step on
pub const RANDOMIZE_ACTIVE_PROBABILITY: f64 = 0.35;

/// Pattern error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("Step index {0} outside pattern")]
    IndexOutOfRange(usize),

    #[error("Row index {0} outside pattern")]
    RowOutOfRange(usize),
}

/// Per-row configuration: transposition and note pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowConfig {
    /// Semitone offset applied on top of generated pitches, in [-12, 12]
    pub transpose_semitones: i8,
    /// Pool the row's pitches are sampled from
    pub pool: PoolId,
}

impl Default for RowConfig {
    fn default() -> Self {
        Self {
            transpose_semitones: 0,
            pool: DEFAULT_POOL,
        }
    }
}

/// The full step grid
///
/// Owns the step and pitch arrays exclusively; the transport holds only a
/// cursor into it. All arrays stay in lockstep:
/// `active.len() == pitches.len() == num_rows * steps_per_row`.
#[derive(Debug, Clone)]
pub struct Pattern {
    time_signature: TimeSignature,
    num_rows: usize,
    active: Vec<bool>,
    pitches: Vec<Option<Pitch>>,
    rows: Vec<RowConfig>,
    root_class: u8,
    root_octave: i8,
}

impl Pattern {
    /// Create a new empty pattern with the given geometry
    pub fn new(time_signature: TimeSignature, num_rows: usize) -> Self {
        let num_rows = num_rows.clamp(1, MAX_ROWS);
        let total = num_rows * time_signature.steps_per_row();

        Self {
            time_signature,
            num_rows,
            active: vec![false; total],
            pitches: vec![None; total],
            rows: vec![RowConfig::default(); num_rows],
            root_class: 0,
            root_octave: 4,
        }
    }

    // --- Geometry ---

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn steps_per_row(&self) -> usize {
        self.time_signature.steps_per_row()
    }

    pub fn total_steps(&self) -> usize {
        self.active.len()
    }

    /// Row a step belongs to
    pub fn row_of(&self, step: usize) -> usize {
        step / self.steps_per_row()
    }

    // --- Step and row access ---

    pub fn is_active(&self, step: usize) -> bool {
        self.active.get(step).copied().unwrap_or(false)
    }

    pub fn pitch(&self, step: usize) -> Option<Pitch> {
        self.pitches.get(step).copied().flatten()
    }

    pub fn active_flags(&self) -> &[bool] {
        &self.active
    }

    pub fn rows(&self) -> &[RowConfig] {
        &self.rows
    }

    /// Root as (chromatic class, octave)
    pub fn root(&self) -> (u8, i8) {
        (self.root_class, self.root_octave)
    }

    /// Root as an absolute pitch
    pub fn root_pitch(&self) -> Pitch {
        Pitch::from_class_and_octave(self.root_class, self.root_octave)
            .unwrap_or_else(|_| Pitch::clamped(60))
    }

    // --- Mutation ---

    /// Change the number of rows, preserving overlapping data positionally
    pub fn set_num_rows(&mut self, num_rows: usize) {
        self.rebuild(num_rows.clamp(1, MAX_ROWS), self.time_signature);
    }

    /// Change the time signature, recomputing row length
    ///
    /// Existing step data is copied index-for-index into the new layout, so a
    /// shrinking grid truncates and a growing one pads with empty steps.
    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.rebuild(self.num_rows, time_signature);
    }

    fn rebuild(&mut self, num_rows: usize, time_signature: TimeSignature) {
        let new_total = num_rows * time_signature.steps_per_row();

        let mut active = vec![false; new_total];
        let mut pitches = vec![None; new_total];
        let overlap = new_total.min(self.active.len());
        active[..overlap].copy_from_slice(&self.active[..overlap]);
        pitches[..overlap].copy_from_slice(&self.pitches[..overlap]);

        let mut rows = vec![RowConfig::default(); num_rows];
        let row_overlap = num_rows.min(self.rows.len());
        rows[..row_overlap].copy_from_slice(&self.rows[..row_overlap]);

        self.time_signature = time_signature;
        self.num_rows = num_rows;
        self.active = active;
        self.pitches = pitches;
        self.rows = rows;
    }

    /// Flip a step on or off, generating a pitch on first activation
    pub fn toggle_step<R: Rng + ?Sized>(
        &mut self,
        step: usize,
        rng: &mut R,
    ) -> Result<bool, PatternError> {
        if step >= self.total_steps() {
            return Err(PatternError::IndexOutOfRange(step));
        }

        self.active[step] = !self.active[step];
        if self.active[step] && self.pitches[step].is_none() {
            self.generate_step(step, rng);
        }
        Ok(self.active[step])
    }

    /// Set a row's transposition, shifting cached pitches by the delta
    ///
    /// Transposition composes additively: cached pitches are moved by the
    /// difference to the previous value rather than re-derived from the root.
    /// A pitch the shift would push out of the MIDI range is regenerated.
    pub fn set_row_transpose<R: Rng + ?Sized>(
        &mut self,
        row: usize,
        semitones: i8,
        rng: &mut R,
    ) -> Result<(), PatternError> {
        if row >= self.num_rows {
            return Err(PatternError::RowOutOfRange(row));
        }

        let clamped = semitones.clamp(-12, 12);
        let delta = clamped as i32 - self.rows[row].transpose_semitones as i32;
        self.rows[row].transpose_semitones = clamped;

        if delta == 0 {
            return Ok(());
        }

        for step in self.row_range(row) {
            let Some(pitch) = self.pitches[step] else {
                continue;
            };
            match pitch.transposed(delta) {
                Ok(shifted) => self.pitches[step] = Some(shifted),
                Err(_) => self.generate_step(step, rng),
            }
        }
        Ok(())
    }

    /// Assign a note pool to a row and regenerate the row's pitches
    ///
    /// On/off flags are untouched; unknown pool ids fall back to the default
    /// pool. The row's pool always wins over previously cached pitches.
    pub fn set_row_pool<R: Rng + ?Sized>(
        &mut self,
        row: usize,
        pool: &str,
        rng: &mut R,
    ) -> Result<(), PatternError> {
        if row >= self.num_rows {
            return Err(PatternError::RowOutOfRange(row));
        }

        self.rows[row].pool = pools::lookup_or_default(pool).id;
        self.regenerate_row(row, rng);
        Ok(())
    }

    /// Switch every step in a row on with probability 0.35, then regenerate pitches
    pub fn randomize_row<R: Rng + ?Sized>(
        &mut self,
        row: usize,
        rng: &mut R,
    ) -> Result<(), PatternError> {
        if row >= self.num_rows {
            return Err(PatternError::RowOutOfRange(row));
        }

        for step in self.row_range(row) {
            self.active[step] = rng.gen_bool(RANDOMIZE_ACTIVE_PROBABILITY);
        }
        self.regenerate_row(row, rng);
        Ok(())
    }

    /// Change the root note and regenerate every row
    pub fn set_root<R: Rng + ?Sized>(&mut self, class: u8, octave: i8, rng: &mut R) {
        self.root_class = class % 12;
        self.root_octave = octave;
        for row in 0..self.num_rows {
            self.regenerate_row(row, rng);
        }
    }

    /// Directly set a step's state and cached pitch (used by the file loader)
    pub fn set_step(
        &mut self,
        step: usize,
        active: bool,
        pitch: Option<Pitch>,
    ) -> Result<(), PatternError> {
        if step >= self.total_steps() {
            return Err(PatternError::IndexOutOfRange(step));
        }
        self.active[step] = active;
        if pitch.is_some() {
            self.pitches[step] = pitch;
        }
        Ok(())
    }

    /// Apply a row configuration read from a file
    pub fn set_row_config(&mut self, row: usize, config: RowConfig) -> Result<(), PatternError> {
        if row >= self.num_rows {
            return Err(PatternError::RowOutOfRange(row));
        }
        self.rows[row] = RowConfig {
            transpose_semitones: config.transpose_semitones.clamp(-12, 12),
            pool: config.pool,
        };
        Ok(())
    }

    /// Regenerate the pitch of every step in a row
    pub fn regenerate_row<R: Rng + ?Sized>(&mut self, row: usize, rng: &mut R) {
        for step in self.row_range(row) {
            self.generate_step(step, rng);
        }
    }

    /// Generate and cache a pitch for a single step
    pub fn generate_step<R: Rng + ?Sized>(&mut self, step: usize, rng: &mut R) {
        let row = self.row_of(step);
        let config = self.rows[row];
        let pool = pools::lookup_or_default(config.pool);
        let pitch = generate_pitch(self.root_pitch(), pool, config.transpose_semitones, rng);
        self.pitches[step] = Some(pitch);
    }

    /// Exact count of distinct on/off configurations: 2^total_steps
    pub fn combinations_count(&self) -> BigUint {
        BigUint::from(1u8) << self.total_steps()
    }

    fn row_range(&self, row: usize) -> std::ops::Range<usize> {
        let len = self.steps_per_row();
        row * len..(row + 1) * len
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new(TimeSignature::default(), 1)
    }
}
