// Fixed-seed hash state for the k-mer maps

use ahash::RandomState;

// Arbitrary but fixed: map layout and hash values must not vary between
// runs, so the per-process random seeding of ahash is not acceptable.
const SEED0: u64 = 0x243f_6a88_85a3_08d3;
const SEED1: u64 = 0x1319_8a2e_0370_7344;
const SEED2: u64 = 0xa409_3822_299f_31d0;
const SEED3: u64 = 0x082e_fa98_ec4e_6c89;

/// Hasher state with run-to-run deterministic output.
pub fn fixed_state() -> RandomState {
    RandomState::with_seeds(SEED0, SEED1, SEED2, SEED3)
}
