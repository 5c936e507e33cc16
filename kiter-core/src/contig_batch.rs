// Contig batches paired with their per-contig multiplicities

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use kiter_common::DNA_MAP;

use crate::fastx::{open_input, FastxReader};

/// Cap on contigs per batch.
pub const MAX_BATCH_CONTIGS: usize = 1 << 16;
/// Cap on total bases per batch.
pub const MAX_BATCH_BASES: usize = 1 << 22;

/// A batch of contigs in numeric encoding, stored back to back.
pub struct ContigBatch {
    seqs: Vec<u8>,
    starts: Vec<usize>,
    multis: Vec<f64>,
}

impl ContigBatch {
    pub fn new() -> Self {
        ContigBatch {
            seqs: Vec::with_capacity(MAX_BATCH_BASES),
            starts: vec![0],
            multis: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.seqs.clear();
        self.starts.truncate(1);
        self.multis.clear();
    }

    pub fn len(&self) -> usize {
        self.multis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multis.is_empty()
    }

    pub fn total_bases(&self) -> usize {
        self.seqs.len()
    }

    fn is_full(&self) -> bool {
        self.len() >= MAX_BATCH_CONTIGS || self.total_bases() >= MAX_BATCH_BASES
    }

    /// Contig `i` as numeric base symbols.
    pub fn seq(&self, i: usize) -> &[u8] {
        &self.seqs[self.starts[i]..self.starts[i + 1]]
    }

    pub fn multi(&self, i: usize) -> f64 {
        self.multis[i]
    }

    fn push(&mut self, raw: &[u8], multi: f64) {
        self.seqs.extend(raw.iter().map(|&b| DNA_MAP[b as usize]));
        self.starts.push(self.seqs.len());
        self.multis.push(multi);
    }
}

impl Default for ContigBatch {
    fn default() -> Self {
        ContigBatch::new()
    }
}

/// Whitespace-separated decimal values, one per contig.
struct MultiplicityReader {
    reader: BufReader<Box<dyn Read + Send>>,
    line: String,
    next_token: usize,
    tokens: Vec<f64>,
}

impl MultiplicityReader {
    fn new(input: Box<dyn Read + Send>) -> Self {
        MultiplicityReader {
            reader: BufReader::new(input),
            line: String::new(),
            next_token: 0,
            tokens: Vec::new(),
        }
    }

    fn next(&mut self) -> Result<Option<f64>> {
        while self.next_token == self.tokens.len() {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .context("read error on multiplicity stream")?;
            if n == 0 {
                return Ok(None);
            }
            self.tokens.clear();
            self.next_token = 0;
            for token in self.line.split_ascii_whitespace() {
                let value: f64 = token
                    .parse()
                    .map_err(|_| anyhow!("invalid multiplicity value {token:?}"))?;
                self.tokens.push(value);
            }
        }
        let value = self.tokens[self.next_token];
        self.next_token += 1;
        Ok(Some(value))
    }
}

/// A contig stream zipped with its multiplicity stream.
pub struct ContigSource {
    fastx: FastxReader,
    multis: MultiplicityReader,
    seq_buf: Vec<u8>,
}

impl ContigSource {
    pub fn open(contig_path: &Path, multi_path: &Path) -> Result<Self> {
        let fastx = FastxReader::open_sniffed(open_input(contig_path)?)?;
        let multis = MultiplicityReader::new(open_input(multi_path)?);
        Ok(ContigSource {
            fastx,
            multis,
            seq_buf: Vec::new(),
        })
    }

    /// Refill `batch` with as many contigs as fit under the batch caps.
    pub fn fill(&mut self, batch: &mut ContigBatch) -> Result<()> {
        batch.clear();
        while !batch.is_full() {
            if !self.fastx.next_sequence(&mut self.seq_buf)? {
                break;
            }
            let multi = self
                .multis
                .next()?
                .ok_or_else(|| anyhow!("more contigs than multiplicity values"))?;
            batch.push(&self.seq_buf, multi);
        }
        Ok(())
    }

    /// Verify the multiplicity stream is exhausted too.
    pub fn finish(mut self) -> Result<()> {
        if self.multis.next()?.is_some() {
            bail!("more multiplicity values than contigs");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn boxed(data: &[u8]) -> Box<dyn Read + Send> {
        Box::new(Cursor::new(data.to_vec()))
    }

    #[test]
    fn test_batch_push_and_slice() {
        let mut batch = ContigBatch::new();
        batch.push(b"ACGT", 2.0);
        batch.push(b"GG", 7.5);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.seq(0), &[0, 1, 2, 3]);
        assert_eq!(batch.seq(1), &[2, 2]);
        assert_eq!(batch.multi(1), 7.5);
        assert_eq!(batch.total_bases(), 6);

        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.total_bases(), 0);
    }

    #[test]
    fn test_multiplicity_reader() {
        let mut reader = MultiplicityReader::new(boxed(b"1.5\n2\n 3.25 4\n"));
        assert_eq!(reader.next().unwrap(), Some(1.5));
        assert_eq!(reader.next().unwrap(), Some(2.0));
        assert_eq!(reader.next().unwrap(), Some(3.25));
        assert_eq!(reader.next().unwrap(), Some(4.0));
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn test_multiplicity_reader_rejects_garbage() {
        let mut reader = MultiplicityReader::new(boxed(b"abc\n"));
        assert!(reader.next().is_err());
    }

    #[test]
    fn test_source_zips_contigs_and_multis() {
        let dir = tempfile::tempdir().unwrap();
        let contig_path = dir.path().join("contigs.fa");
        let multi_path = dir.path().join("contigs.mul");
        std::fs::write(&contig_path, ">a\nACGT\n>b\nTTG\n").unwrap();
        std::fs::write(&multi_path, "3.0\n8.0\n").unwrap();

        let mut source = ContigSource::open(&contig_path, &multi_path).unwrap();
        let mut batch = ContigBatch::new();
        source.fill(&mut batch).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.seq(0), &[0, 1, 2, 3]);
        assert_eq!(batch.multi(0), 3.0);
        assert_eq!(batch.seq(1), &[3, 3, 2]);

        source.fill(&mut batch).unwrap();
        assert!(batch.is_empty());
        source.finish().unwrap();
    }

    #[test]
    fn test_source_detects_missing_multiplicity() {
        let dir = tempfile::tempdir().unwrap();
        let contig_path = dir.path().join("contigs.fa");
        let multi_path = dir.path().join("contigs.mul");
        std::fs::write(&contig_path, ">a\nACGT\n>b\nTTG\n").unwrap();
        std::fs::write(&multi_path, "3.0\n").unwrap();

        let mut source = ContigSource::open(&contig_path, &multi_path).unwrap();
        let mut batch = ContigBatch::new();
        assert!(source.fill(&mut batch).is_err());
    }

    #[test]
    fn test_source_detects_extra_multiplicity() {
        let dir = tempfile::tempdir().unwrap();
        let contig_path = dir.path().join("contigs.fa");
        let multi_path = dir.path().join("contigs.mul");
        std::fs::write(&contig_path, ">a\nACGT\n").unwrap();
        std::fs::write(&multi_path, "3.0\n4.0\n").unwrap();

        let mut source = ContigSource::open(&contig_path, &multi_path).unwrap();
        let mut batch = ContigBatch::new();
        source.fill(&mut batch).unwrap();
        source.fill(&mut batch).unwrap();
        assert!(batch.is_empty());
        assert!(source.finish().is_err());
    }
}
