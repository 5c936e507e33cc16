// Cross-checks of the sliding k-mer against from-scratch construction

use kiter_common::{complement, Kmer, DNA_MAP};

fn encode(s: &str) -> Vec<u8> {
    s.bytes().map(|b| DNA_MAP[b as usize]).collect()
}

#[test]
fn sliding_window_matches_from_scratch() {
    let seq = encode("ACGGTTACAGGATTACCAGGATACCATTGGACCA");
    for k in [1usize, 3, 15, 16, 17, 31, 32, 33] {
        let mut kmer = Kmer::new(k);
        for (i, &c) in seq.iter().enumerate() {
            kmer.shift_append(c);
            if i + 1 >= k {
                let start = i + 1 - k;
                assert_eq!(
                    kmer,
                    Kmer::from_bases(&seq[start..start + k]),
                    "window at {start}, k={k}"
                );
            }
        }
    }
}

#[test]
fn preappended_reverse_tracks_forward() {
    let seq = encode("TTGACCATGGACCATAGGACCATTGA");
    let k = 7;
    let mut kmer = Kmer::new(k);
    let mut rev = Kmer::new(k);
    for (i, &c) in seq.iter().enumerate() {
        kmer.shift_append(c);
        rev.shift_preappend(complement(c));
        if i + 1 >= k {
            assert_eq!(rev, kmer.reverse_complement());
        }
    }
}

#[test]
fn canonical_choice_is_symmetric() {
    // min(x, rc(x)) must agree whether computed from x or from rc(x)
    let seq = encode("ACGTTGCAAGGTCCATGATC");
    let k = 9;
    for start in 0..=seq.len() - k {
        let fwd = Kmer::from_bases(&seq[start..start + k]);
        let rev = fwd.reverse_complement();
        let canon = fwd.min(rev);
        assert_eq!(canon, rev.min(fwd));
        assert!(canon <= canon.reverse_complement());
    }
}
