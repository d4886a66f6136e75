// Note generator - Samples a pitch for a step from its row's pool
// Re-randomized on every call; the pattern caches the results it wants to keep

use crate::pitch::Pitch;
use crate::sequencer::pools::NotePool;
use rand::Rng;

/// Generate a pitch for one step
///
/// Chromatic pools pick one of the twelve pitch classes uniformly, placed in
/// the root's octave; interval pools pick one offset uniformly and add it to
/// the root. The row transposition is added afterwards and the result is
/// clamped into the instrument range.
pub fn generate_pitch<R: Rng + ?Sized>(
    root: Pitch,
    pool: &NotePool,
    transpose_semitones: i8,
    rng: &mut R,
) -> Pitch {
    let base = if pool.chromatic {
        let class = rng.gen_range(0..12);
        (root.octave() as i32 + 1) * 12 + class
    } else {
        let interval = pool.intervals[rng.gen_range(0..pool.intervals.len())];
        root.midi() as i32 + interval as i32
    };

    Pitch::clamped(base + transpose_semitones as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{MAX_PITCH, MIN_PITCH};
    use crate::sequencer::pools;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_major_triad_stays_in_chord() {
        let mut rng = StdRng::seed_from_u64(7);
        let root = Pitch::from_name("C4").unwrap();
        let pool = pools::lookup("major_triad").unwrap();

        for _ in 0..200 {
            let pitch = generate_pitch(root, pool, 0, &mut rng);
            assert!(
                matches!(pitch.name().as_str(), "C4" | "E4" | "G4"),
                "unexpected pitch {}",
                pitch
            );
        }
    }

    #[test]
    fn test_single_note_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(1);
        let root = Pitch::from_name("A3").unwrap();
        let pool = pools::lookup("single_note").unwrap();

        for _ in 0..20 {
            assert_eq!(generate_pitch(root, pool, 0, &mut rng), root);
        }
    }

    #[test]
    fn test_transpose_applied() {
        let mut rng = StdRng::seed_from_u64(2);
        let root = Pitch::from_name("C4").unwrap();
        let pool = pools::lookup("single_note").unwrap();

        assert_eq!(generate_pitch(root, pool, 7, &mut rng).name(), "G4");
        assert_eq!(generate_pitch(root, pool, -12, &mut rng).name(), "C3");
    }

    #[test]
    fn test_clamped_at_extremes() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = pools::lookup("dom_13th").unwrap();

        // Root near the MIDI ceiling plus maximum transposition
        let high_root = Pitch::from_midi(120).unwrap();
        for _ in 0..200 {
            let pitch = generate_pitch(high_root, pool, 12, &mut rng);
            assert!(pitch.midi() <= MAX_PITCH);
        }

        // Root at the floor with maximum downward transposition
        let low_root = Pitch::from_midi(12).unwrap();
        for _ in 0..200 {
            let pitch = generate_pitch(low_root, pool, -12, &mut rng);
            assert!(pitch.midi() >= MIN_PITCH);
        }
    }

    #[test]
    fn test_chromatic_pool_stays_in_root_octave() {
        let mut rng = StdRng::seed_from_u64(4);
        let root = Pitch::from_name("C4").unwrap();
        let pool = pools::lookup("4_chromatic").unwrap();

        for _ in 0..200 {
            let pitch = generate_pitch(root, pool, 0, &mut rng);
            assert_eq!(pitch.octave(), 4, "pitch {} left the root octave", pitch);
        }
    }

    #[test]
    fn test_chromatic_pool_covers_all_classes() {
        let mut rng = StdRng::seed_from_u64(5);
        let root = Pitch::from_name("C4").unwrap();
        let pool = pools::lookup("4_chromatic").unwrap();

        let mut seen = [false; 12];
        for _ in 0..500 {
            seen[generate_pitch(root, pool, 0, &mut rng).class() as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
