// Note pools - Named interval sets for expanding a root pitch into candidates
// Process-wide immutable lookup data, never mutated

/// Pool id used by rows and the interchange metadata
pub type PoolId = &'static str;

/// Pool every new row starts with
pub const DEFAULT_POOL: PoolId = "single_note";

/// A named rule for choosing candidate pitches relative to a root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotePool {
    pub id: PoolId,
    /// Short display label
    pub name: &'static str,
    /// Ascending semitone offsets from the root; unused for chromatic pools
    pub intervals: &'static [i8],
    /// Pick uniformly from the 12-tone chromatic set instead of `intervals`
    pub chromatic: bool,
}

/// All available pools, in menu order
pub const NOTE_POOLS: [NotePool; 17] = [
    pool("single_note", "Single", &[0]),
    pool("major_triad", "Major", &[0, 4, 7]),
    pool("minor_triad", "Minor", &[0, 3, 7]),
    pool("augmented_triad", "Aug", &[0, 4, 8]),
    pool("diminished_triad", "Dim", &[0, 3, 6]),
    pool("sus4", "Sus4", &[0, 5, 7]),
    pool("sus2", "Sus2", &[0, 2, 7]),
    pool("major_7th", "Maj 7th", &[0, 4, 7, 11]),
    pool("minor_7th", "Min 7th", &[0, 3, 7, 10]),
    pool("dom_7th", "Dom 7th", &[0, 4, 7, 10]),
    pool("m7b5", "m7b5", &[0, 3, 6, 10]),
    pool("maj_9th", "Maj 9th", &[0, 4, 7, 11, 14]),
    pool("min_9th", "Min 9th", &[0, 3, 7, 10, 14]),
    pool("dom_13th", "Dom 13th", &[0, 4, 7, 10, 14, 21]),
    pool("root_5th", "Root+5", &[0, 7]),
    pool("octave_jump", "Octaves", &[0, 12]),
    NotePool {
        id: "4_chromatic",
        name: "Random",
        intervals: &[],
        chromatic: true,
    },
];

const fn pool(id: PoolId, name: &'static str, intervals: &'static [i8]) -> NotePool {
    NotePool {
        id,
        name,
        intervals,
        chromatic: false,
    }
}

/// Look up a pool by id
pub fn lookup(id: &str) -> Option<&'static NotePool> {
    NOTE_POOLS.iter().find(|p| p.id == id)
}

/// Look up a pool by id, falling back to the default pool for unknown ids
pub fn lookup_or_default(id: &str) -> &'static NotePool {
    // The default pool is the first registry entry
    lookup(id).unwrap_or(&NOTE_POOLS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_pools() {
        assert_eq!(lookup("major_triad").unwrap().intervals, &[0, 4, 7]);
        assert_eq!(lookup("dom_13th").unwrap().intervals.len(), 6);
        assert!(lookup("4_chromatic").unwrap().chromatic);
    }

    #[test]
    fn test_lookup_unknown_pool() {
        assert!(lookup("phrygian_dominant").is_none());
        assert_eq!(lookup_or_default("phrygian_dominant").id, DEFAULT_POOL);
    }

    #[test]
    fn test_intervals_ascending() {
        for pool in &NOTE_POOLS {
            let mut sorted = pool.intervals.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted.as_slice(), pool.intervals, "pool {}", pool.id);
        }
    }

    #[test]
    fn test_only_chromatic_pool_has_no_intervals() {
        for pool in &NOTE_POOLS {
            assert_eq!(pool.intervals.is_empty(), pool.chromatic, "pool {}", pool.id);
        }
    }
}
