// Concurrent multiplicity map for edges discovered in reads

use ahash::RandomState;
use dashmap::DashMap;
use kiter_common::{fixed_state, Kmer, Multi, MULTI_MAX};

/// Map from a canonical `(k+s+1)`-mer to a saturating support counter.
///
/// Sharded locking comes from the backing map: `add_support` holds the
/// entry's shard lock only for the duration of one increment. Keys must
/// already be canonical (not above their reverse complement).
pub struct IterativeEdges {
    map: DashMap<Kmer, Multi, RandomState>,
}

impl IterativeEdges {
    pub fn with_capacity(capacity: usize) -> Self {
        IterativeEdges {
            map: DashMap::with_capacity_and_hasher(capacity, fixed_state()),
        }
    }

    /// Count one more supporting observation, clamping at [`MULTI_MAX`].
    pub fn add_support(&self, key: Kmer) {
        debug_assert!(key <= key.reverse_complement());
        let mut multi = self.map.entry(key).or_insert(0);
        if *multi < MULTI_MAX {
            *multi += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Enumerate all edges; the order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (Kmer, Multi)> + '_ {
        self.map.iter().map(|entry| (*entry.key(), *entry.value()))
    }
}
