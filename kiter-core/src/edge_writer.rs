// Packed (k+s+1)-mer edge encoding and the edge output stream

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use kiter_common::{Kmer, Multi, BITS_PER_BASE, BITS_PER_MULTI, MULTI_MAX};

/// Number of 32-bit words per packed edge for a given edge span.
pub fn words_per_edge(span: usize) -> usize {
    (span * BITS_PER_BASE + BITS_PER_MULTI + 31) / 32
}

/// One packed edge, reusable across a sliding scan of a contig.
///
/// Base slot `t` (counting 2-bit slots from the most significant bits of
/// word 0) holds the base at window position `span - 1 - t`, i.e. the
/// newest base sits on top. The low 16 bits of the last word hold the
/// multiplicity.
pub struct PackedEdge {
    words: Vec<u32>,
    span: usize,
    last_shift: u32,
    multi: Multi,
}

impl PackedEdge {
    pub fn new(span: usize) -> Self {
        let rem = span % 16;
        let last_shift = if rem == 0 { 0 } else { (16 - rem as u32) * 2 };
        PackedEdge {
            words: vec![0; words_per_edge(span)],
            span,
            last_shift,
            multi: 0,
        }
    }

    pub fn span(&self) -> usize {
        self.span
    }

    /// Pack a full window from scratch; `base_at(p)` supplies the base at
    /// window position `p`.
    pub fn pack<F: Fn(usize) -> u8>(&mut self, base_at: F, multi: Multi) {
        self.words.fill(0);
        self.multi = multi;
        let mut w: u32 = 0;
        let mut end_word = 0;
        for j in 0..self.span {
            w = (w << 2) | base_at(self.span - 1 - j) as u32;
            if (j + 1) % 16 == 0 {
                self.words[end_word] = w;
                w = 0;
                end_word += 1;
            }
        }
        self.words[end_word] = w << self.last_shift;
        let last = self.words.len() - 1;
        self.words[last] |= multi as u32;
    }

    /// Pack a k-mer of exactly `span` bases.
    pub fn pack_kmer(&mut self, kmer: &Kmer, multi: Multi) {
        debug_assert_eq!(kmer.len(), self.span);
        self.pack(|p| kmer.base_at(p), multi);
    }

    /// Slide the window one position: drop the oldest base, admit `base`
    /// as the newest. O(1) in the window length.
    pub fn slide(&mut self, base: u8) {
        let last = self.words.len() - 1;
        self.words[last] ^= self.multi as u32;
        // vacate the oldest base slot so the shift cannot push it into
        // the padding between bases and multiplicity
        let t = self.span - 1;
        self.words[t >> 4] &= !(3u32 << ((15 - (t & 15)) << 1));
        for i in (1..self.words.len()).rev() {
            self.words[i] = (self.words[i] >> 2) | (self.words[i - 1] << 30);
        }
        self.words[0] = (self.words[0] >> 2) | ((base as u32) << 30);
        debug_assert_eq!(self.words[last] & MULTI_MAX as u32, 0);
        self.words[last] |= self.multi as u32;
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

/// Decode a packed edge back into its base sequence and multiplicity.
pub fn decode_edge(words: &[u32], span: usize) -> (Vec<u8>, Multi) {
    debug_assert_eq!(words.len(), words_per_edge(span));
    let mut seq = vec![0u8; span];
    for (t, slot) in seq.iter_mut().enumerate() {
        *slot = ((words[t >> 4] >> ((15 - (t & 15)) << 1)) & 3) as u8;
    }
    seq.reverse();
    let multi = (words[words.len() - 1] & MULTI_MAX as u32) as Multi;
    (seq, multi)
}

/// Serial writer for the edge output stream.
pub struct EdgeWriter {
    out: BufWriter<File>,
    edge: PackedEdge,
    span: usize,
    header_written: bool,
}

impl EdgeWriter {
    pub fn create(path: &Path, span: usize) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(EdgeWriter {
            out: BufWriter::new(file),
            edge: PackedEdge::new(span),
            span,
            header_written: false,
        })
    }

    /// Write the stream header (`next_k`, then words per edge); a no-op
    /// after the first call.
    pub fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        self.put_word((self.span - 1) as u32)?;
        self.put_word(words_per_edge(self.span) as u32)
    }

    /// Emit every window of `seq` in sliding order. Contigs shorter than
    /// the span produce nothing.
    pub fn write_contig_edges(&mut self, seq: &[u8], multi: Multi) -> Result<()> {
        if seq.len() < self.span {
            return Ok(());
        }
        self.edge.pack(|p| seq[p], multi);
        self.put_edge()?;
        for j in self.span..seq.len() {
            self.edge.slide(seq[j]);
            self.put_edge()?;
        }
        Ok(())
    }

    /// Emit a single edge from a k-mer of exactly `span` bases.
    pub fn write_kmer_edge(&mut self, kmer: &Kmer, multi: Multi) -> Result<()> {
        self.edge.pack_kmer(kmer, multi);
        self.put_edge()
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush().context("write error on edge stream")?;
        Ok(())
    }

    fn put_edge(&mut self) -> Result<()> {
        for i in 0..self.edge.words.len() {
            let w = self.edge.words[i];
            self.out
                .write_all(&w.to_le_bytes())
                .context("write error on edge stream")?;
        }
        Ok(())
    }

    fn put_word(&mut self, w: u32) -> Result<()> {
        self.out
            .write_all(&w.to_le_bytes())
            .context("write error on edge stream")?;
        Ok(())
    }
}
