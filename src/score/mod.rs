// Score module - MusicXML interchange for patterns

pub mod musicxml;

use crate::sequencer::pattern::Pattern;
use crate::sequencer::timeline::Tempo;
use rand::Rng;
use std::path::Path;
use thiserror::Error;

pub use musicxml::{decode, encode, LoadedPattern};

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Invalid pattern file: {0}")]
    InvalidFile(String),

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write a pattern to a MusicXML file
pub fn save_file<P: AsRef<Path>>(path: P, pattern: &Pattern, tempo: Tempo) -> Result<(), ScoreError> {
    let xml = encode(pattern, tempo)?;
    std::fs::write(path, xml)?;
    Ok(())
}

/// Read a pattern from a MusicXML file
pub fn load_file<P: AsRef<Path>, R: Rng + ?Sized>(
    path: P,
    rng: &mut R,
) -> Result<LoadedPattern, ScoreError> {
    let xml = std::fs::read_to_string(path)?;
    decode(&xml, rng)
}
