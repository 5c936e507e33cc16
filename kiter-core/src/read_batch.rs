// Packed read batches in the binary read layout

use std::io::{BufReader, Read};

use anyhow::{bail, Context, Result};
use kiter_common::DNA_MAP;

use crate::config::{Config, ReadFormat};
use crate::fastx::{open_read_input, FastxReader, SeqFormat};

/// Cap on reads per batch.
pub const MAX_BATCH_READS: usize = 1 << 16;

/// Bits reserved for the read length in each packed record.
const READ_LEN_BITS: usize = 16;

/// Number of 32-bit words each packed read occupies.
pub fn words_per_read(max_read_len: usize) -> usize {
    (max_read_len * 2 + READ_LEN_BITS + 31) / 32
}

/// A batch of reads, each packed into `words_per_read` 32-bit words:
/// bases two bits each from the most significant bits of word 0, the
/// read length in the low 16 bits of the last word. The same layout is
/// written back out for filtered reads, so one iteration's output can be
/// fed to the next as binary input.
pub struct ReadBatch {
    packed: Vec<u32>,
    words_per_read: usize,
    max_read_len: usize,
    num_reads: usize,
}

impl ReadBatch {
    pub fn new(max_read_len: usize) -> Self {
        let words = words_per_read(max_read_len);
        ReadBatch {
            packed: Vec::with_capacity(words * MAX_BATCH_READS),
            words_per_read: words,
            max_read_len,
            num_reads: 0,
        }
    }

    pub fn clear(&mut self) {
        self.packed.clear();
        self.num_reads = 0;
    }

    pub fn num_reads(&self) -> usize {
        self.num_reads
    }

    pub fn is_empty(&self) -> bool {
        self.num_reads == 0
    }

    fn is_full(&self) -> bool {
        self.num_reads >= MAX_BATCH_READS
    }

    pub fn words_per_read(&self) -> usize {
        self.words_per_read
    }

    /// Length of read `i`.
    #[inline]
    pub fn length(&self, i: usize) -> usize {
        let last = (i + 1) * self.words_per_read - 1;
        (self.packed[last] & 0xffff) as usize
    }

    /// Base `j` of read `i`.
    #[inline]
    pub fn base_at(&self, i: usize, j: usize) -> u8 {
        debug_assert!(j < self.length(i));
        let word = self.packed[i * self.words_per_read + (j >> 4)];
        ((word >> ((15 - (j & 15)) << 1)) & 3) as u8
    }

    /// The packed words of read `i`.
    pub fn record(&self, i: usize) -> &[u32] {
        &self.packed[i * self.words_per_read..(i + 1) * self.words_per_read]
    }

    /// Pack a read given as numeric base symbols.
    pub fn push(&mut self, seq: &[u8]) -> Result<()> {
        if seq.len() > self.max_read_len {
            bail!(
                "read length {} exceeds max_read_len {}",
                seq.len(),
                self.max_read_len
            );
        }
        let start = self.packed.len();
        self.packed.resize(start + self.words_per_read, 0);
        let words = &mut self.packed[start..];
        for (j, &c) in seq.iter().enumerate() {
            words[j >> 4] |= (c as u32) << ((15 - (j & 15)) << 1);
        }
        words[self.words_per_read - 1] |= seq.len() as u32;
        self.num_reads += 1;
        Ok(())
    }

    /// Append an already-packed record, validating its length field.
    fn push_packed(&mut self, words: &[u32]) -> Result<()> {
        debug_assert_eq!(words.len(), self.words_per_read);
        let length = (words[self.words_per_read - 1] & 0xffff) as usize;
        if length > self.max_read_len {
            bail!(
                "binary read length {} exceeds max_read_len {}",
                length,
                self.max_read_len
            );
        }
        self.packed.extend_from_slice(words);
        self.num_reads += 1;
        Ok(())
    }
}

/// The read stream in whichever format was configured.
pub enum ReadSource {
    Fastx {
        reader: FastxReader,
        seq_buf: Vec<u8>,
        bases: Vec<u8>,
    },
    Binary {
        reader: BufReader<Box<dyn Read + Send>>,
        record_buf: Vec<u8>,
    },
}

impl ReadSource {
    pub fn open(config: &Config) -> Result<Self> {
        let input = open_read_input(&config.read_file)?;
        Ok(match config.read_format {
            ReadFormat::Fasta => ReadSource::Fastx {
                reader: FastxReader::new(input, SeqFormat::Fasta),
                seq_buf: Vec::new(),
                bases: Vec::new(),
            },
            ReadFormat::Fastq => ReadSource::Fastx {
                reader: FastxReader::new(input, SeqFormat::Fastq),
                seq_buf: Vec::new(),
                bases: Vec::new(),
            },
            ReadFormat::Binary => ReadSource::Binary {
                reader: BufReader::with_capacity(4 << 20, input),
                record_buf: vec![0u8; words_per_read(config.max_read_len) * 4],
            },
        })
    }

    /// Refill `batch` with as many reads as fit under the batch cap.
    pub fn fill(&mut self, batch: &mut ReadBatch) -> Result<()> {
        batch.clear();
        match self {
            ReadSource::Fastx {
                reader,
                seq_buf,
                bases,
            } => {
                while !batch.is_full() {
                    if !reader.next_sequence(seq_buf)? {
                        break;
                    }
                    bases.clear();
                    bases.extend(seq_buf.iter().map(|&b| DNA_MAP[b as usize]));
                    batch.push(bases)?;
                }
            }
            ReadSource::Binary { reader, record_buf } => {
                let mut words = vec![0u32; batch.words_per_read()];
                while !batch.is_full() {
                    if !read_full_record(reader, record_buf)? {
                        break;
                    }
                    for (word, bytes) in words.iter_mut().zip(record_buf.chunks_exact(4)) {
                        *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                    }
                    batch.push_packed(&words)?;
                }
            }
        }
        Ok(())
    }
}

/// Read one full record, distinguishing clean end of input from a
/// truncated trailing record.
fn read_full_record(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .context("read error on binary read stream")?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            bail!("truncated binary read record");
        }
        filled += n;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_per_read() {
        assert_eq!(words_per_read(8), 1);
        assert_eq!(words_per_read(9), 2);
        assert_eq!(words_per_read(100), 7);
        assert_eq!(words_per_read(65535), 4097);
    }

    #[test]
    fn test_pack_and_extract() {
        let mut batch = ReadBatch::new(40);
        let read_a: Vec<u8> = (0..33).map(|i| (i % 4) as u8).collect();
        let read_b = vec![3u8, 2, 1];
        batch.push(&read_a).unwrap();
        batch.push(&read_b).unwrap();

        assert_eq!(batch.num_reads(), 2);
        assert_eq!(batch.length(0), 33);
        assert_eq!(batch.length(1), 3);
        for (j, &c) in read_a.iter().enumerate() {
            assert_eq!(batch.base_at(0, j), c);
        }
        for (j, &c) in read_b.iter().enumerate() {
            assert_eq!(batch.base_at(1, j), c);
        }
    }

    #[test]
    fn test_rejects_overlong_read() {
        let mut batch = ReadBatch::new(4);
        assert!(batch.push(&[0, 1, 2, 3, 0]).is_err());
    }

    #[test]
    fn test_binary_roundtrip() {
        let mut batch = ReadBatch::new(20);
        batch.push(&[0, 1, 2, 3, 3, 2, 1, 0, 2]).unwrap();
        batch.push(&[1, 1, 1]).unwrap();

        // serialize the way the filtered-read output does
        let mut bytes = Vec::new();
        for i in 0..batch.num_reads() {
            for &w in batch.record(i) {
                bytes.extend_from_slice(&w.to_le_bytes());
            }
        }

        let mut reader = BufReader::new(std::io::Cursor::new(bytes));
        let mut record_buf = vec![0u8; batch.words_per_read() * 4];
        let mut restored = ReadBatch::new(20);
        let mut words = vec![0u32; batch.words_per_read()];
        while read_full_record(&mut reader, &mut record_buf).unwrap() {
            for (word, chunk) in words.iter_mut().zip(record_buf.chunks_exact(4)) {
                *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            restored.push_packed(&words).unwrap();
        }

        assert_eq!(restored.num_reads(), 2);
        assert_eq!(restored.length(0), 9);
        assert_eq!(restored.base_at(0, 4), 3);
        assert_eq!(restored.length(1), 3);
        assert_eq!(restored.record(0), batch.record(0));
    }

    #[test]
    fn test_truncated_binary_record_fails() {
        let bytes = vec![0u8; 6]; // not a multiple of the record size
        let mut reader = BufReader::new(std::io::Cursor::new(bytes));
        let mut buf = vec![0u8; 8];
        assert!(read_full_record(&mut reader, &mut buf).is_err());
    }
}
