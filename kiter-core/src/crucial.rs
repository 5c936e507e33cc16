// Crucial k-mer index: contig tips and their extension hints

use ahash::RandomState;
use dashmap::DashMap;
use kiter_common::{complement, fixed_state, ExtHint, Kmer};

/// Map from a contig-tip k-mer to the few bases that continue past it.
///
/// Filled while the primary contigs stream through, then only read.
/// When two contigs produce the same key the last write wins.
pub struct CrucialKmers {
    map: DashMap<Kmer, ExtHint, RandomState>,
    k: usize,
    step: usize,
}

impl CrucialKmers {
    pub fn new(k: usize, step: usize) -> Self {
        CrucialKmers {
            map: DashMap::with_hasher(fixed_state()),
            k,
            step,
        }
    }

    /// Index both tips of a contig: the leading k-mer with its forward
    /// extension, and the reverse complement of the trailing k-mer with
    /// the complemented bases running back into the contig.
    pub fn insert_contig(&self, seq: &[u8]) {
        let k = self.k;
        if seq.len() < k {
            return;
        }

        let mut kmer = Kmer::new(k);
        for &c in &seq[..k] {
            kmer.shift_append(c);
        }
        let hint_len = self.step.min(seq.len() - k);
        let mut hint = ExtHint::new();
        for j in 0..hint_len {
            hint.push(seq[k + j]);
        }
        self.map.insert(kmer, hint);

        if seq.len() > k {
            let n = seq.len();
            for j in 0..k {
                kmer.shift_append(complement(seq[n - 1 - j]));
            }
            let mut hint = ExtHint::new();
            for j in 0..hint_len {
                hint.push(complement(seq[n - k - 1 - j]));
            }
            self.map.insert(kmer, hint);
        }
    }

    pub fn get(&self, kmer: &Kmer) -> Option<ExtHint> {
        self.map.get(kmer).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiter_common::DNA_MAP;

    fn encode(s: &str) -> Vec<u8> {
        s.bytes().map(|b| DNA_MAP[b as usize]).collect()
    }

    fn hint_bases(hint: ExtHint) -> Vec<u8> {
        (0..hint.len()).map(|j| hint.base_at(j)).collect()
    }

    #[test]
    fn test_both_tips_indexed() {
        let crucial = CrucialKmers::new(3, 2);
        crucial.insert_contig(&encode("AAACCCGGG"));
        assert_eq!(crucial.len(), 2);

        // leading k-mer with the two bases after it
        let front = crucial.get(&Kmer::from_bases(&encode("AAA"))).unwrap();
        assert_eq!(hint_bases(front), encode("CC"));

        // reverse complement of the trailing k-mer, extension running
        // backwards through complemented bases
        let back = crucial.get(&Kmer::from_bases(&encode("CCC"))).unwrap();
        assert_eq!(hint_bases(back), encode("GG"));
    }

    #[test]
    fn test_hint_capped_by_contig_length() {
        let crucial = CrucialKmers::new(3, 5);
        crucial.insert_contig(&encode("AAACG"));
        let front = crucial.get(&Kmer::from_bases(&encode("AAA"))).unwrap();
        assert_eq!(hint_bases(front), encode("CG"));
    }

    #[test]
    fn test_exact_k_contig_gets_one_entry() {
        let crucial = CrucialKmers::new(4, 2);
        crucial.insert_contig(&encode("ACGT"));
        assert_eq!(crucial.len(), 1);
        let hint = crucial.get(&Kmer::from_bases(&encode("ACGT"))).unwrap();
        assert!(hint.is_empty());
    }

    #[test]
    fn test_short_contig_ignored() {
        let crucial = CrucialKmers::new(5, 2);
        crucial.insert_contig(&encode("ACG"));
        assert!(crucial.is_empty());
    }

    #[test]
    fn test_palindromic_tips_collide_last_write_wins() {
        // prefix k-mer and reverse-complemented suffix k-mer coincide;
        // exactly one entry must survive, whichever was written last
        let crucial = CrucialKmers::new(3, 1);
        crucial.insert_contig(&encode("ACGCGT"));
        assert_eq!(crucial.len(), 1);
        assert!(crucial.get(&Kmer::from_bases(&encode("ACG"))).is_some());
    }
}
