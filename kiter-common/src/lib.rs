// kiter common library
// Shared value types for the edge-extension pipeline

pub mod hash;
pub mod hint;
pub mod kmer;
pub mod types;

// Re-export commonly used types
pub use hash::fixed_state;
pub use hint::{ExtHint, HINT_MAX_BASES};
pub use kmer::{Kmer, KMER_MAX_BASES, KMER_WORDS};
pub use types::{base_to_char, complement, Multi, BITS_PER_BASE, BITS_PER_MULTI, DNA_MAP, MULTI_MAX};
