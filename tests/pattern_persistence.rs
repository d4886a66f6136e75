// Integration test: full save/load cycle through the engine

use stepweaver::{Command, Engine, EngineError, OutputMode, ScoreError, ToneGenerator};

struct NullTone;

impl ToneGenerator for NullTone {
    fn trigger_note(&mut self, _pitch: stepweaver::Pitch, _duration_fraction: f64) {}
    fn trigger_click(&mut self, _velocity: f32) {}
}

fn engine() -> Engine {
    Engine::new(Box::new(NullTone), 64).0
}

#[test]
fn test_save_and_load_full_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pattern.musicxml");

    let mut source = engine();
    source.apply(Command::SetNumRows(3)).unwrap();
    source.apply(Command::SetRoot { class: 9, octave: 2 }).unwrap(); // A2
    source
        .apply(Command::SetRowPool {
            row: 0,
            pool: "minor_7th".to_string(),
        })
        .unwrap();
    // Guard against the unknown-id fallback making this round-trip vacuous
    assert_eq!(source.pattern().rows()[0].pool, "minor_7th");
    source
        .apply(Command::SetRowTranspose {
            row: 2,
            semitones: -5,
        })
        .unwrap();
    source.apply(Command::SetTempo(150.0)).unwrap();
    for step in [0, 3, 17, 40] {
        source.apply(Command::ToggleStep(step)).unwrap();
    }
    source.save_pattern(&path).unwrap();

    let mut target = engine();
    target.load_pattern(&path).unwrap();

    let loaded = target.pattern();
    let original = source.pattern();
    assert_eq!(loaded.num_rows(), 3);
    assert_eq!(loaded.total_steps(), original.total_steps());
    assert_eq!(loaded.active_flags(), original.active_flags());
    assert_eq!(loaded.rows(), original.rows());
    assert_eq!(loaded.root(), (9, 2));
    for step in [0, 3, 17, 40] {
        assert_eq!(loaded.pitch(step), original.pitch(step));
    }
    drop((loaded, original));

    assert_eq!(target.tempo().bpm(), 150.0);
}

#[test]
fn test_load_survives_output_mode_and_geometry_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pattern.musicxml");

    let mut source = engine();
    source
        .apply(Command::SetTimeSignature(
            stepweaver::TimeSignature::six_eight(),
        ))
        .unwrap();
    source.apply(Command::ToggleStep(11)).unwrap();
    source.save_pattern(&path).unwrap();

    let mut target = engine();
    target.apply(Command::SetOutputMode(OutputMode::Midi)).unwrap();
    target.apply(Command::SetNumRows(4)).unwrap();
    target.load_pattern(&path).unwrap();

    let pattern = target.pattern();
    assert_eq!(
        pattern.time_signature(),
        stepweaver::TimeSignature::six_eight()
    );
    assert_eq!(pattern.num_rows(), 1);
    assert_eq!(pattern.total_steps(), 12);
    assert!(pattern.is_active(11));
}

#[test]
fn test_load_rejects_garbage_and_keeps_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.musicxml");
    std::fs::write(&path, "definitely not musicxml <<<").unwrap();

    let mut target = engine();
    target.apply(Command::ToggleStep(2)).unwrap();

    let result = target.load_pattern(&path);
    assert!(matches!(
        result,
        Err(EngineError::Score(ScoreError::InvalidFile(_)))
    ));

    // The live pattern is untouched by the failed load
    let pattern = target.pattern();
    assert!(pattern.is_active(2));
    assert_eq!(pattern.total_steps(), 16);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut target = engine();
    let result = target.load_pattern(dir.path().join("nope.musicxml"));
    assert!(matches!(
        result,
        Err(EngineError::Score(ScoreError::Io(_)))
    ));
}
