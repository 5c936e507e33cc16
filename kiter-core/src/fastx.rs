// FASTA/FASTQ sequence input over plain or gzip-compressed streams

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;

/// Record layout of a character-based sequence stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqFormat {
    Fasta,
    Fastq,
}

/// Open a sequence stream; names ending in `.gz` are decompressed on the fly.
pub fn open_input(path: &Path) -> Result<Box<dyn Read + Send>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader: Box<dyn Read + Send> = if path.extension().and_then(|s| s.to_str()) == Some("gz")
    {
        // MultiGzDecoder also handles multi-member (bgzip) files
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(reader)
}

/// Open the read stream, honoring `"-"` as standard input.
pub fn open_read_input(name: &str) -> Result<Box<dyn Read + Send>> {
    if name == "-" {
        Ok(Box::new(io::stdin()))
    } else {
        open_input(Path::new(name))
    }
}

/// Streaming parser producing one raw (untranslated) sequence per record.
pub struct FastxReader {
    reader: BufReader<Box<dyn Read + Send>>,
    format: SeqFormat,
    line: Vec<u8>,
    pending_header: bool,
}

impl FastxReader {
    pub fn new(input: Box<dyn Read + Send>, format: SeqFormat) -> Self {
        FastxReader {
            reader: BufReader::with_capacity(4 << 20, input),
            format,
            line: Vec::new(),
            pending_header: false,
        }
    }

    /// Open an input and decide its layout from the first byte ('@' means
    /// FASTQ, anything else FASTA).
    pub fn open_sniffed(input: Box<dyn Read + Send>) -> Result<Self> {
        let mut reader = BufReader::with_capacity(4 << 20, input);
        let format = match reader.fill_buf().context("read error on sequence stream")? {
            [b'@', ..] => SeqFormat::Fastq,
            _ => SeqFormat::Fasta,
        };
        Ok(FastxReader {
            reader,
            format,
            line: Vec::new(),
            pending_header: false,
        })
    }

    /// Read the next record's sequence into `seq` (raw bytes, whitespace
    /// stripped). Returns `false` at end of input.
    pub fn next_sequence(&mut self, seq: &mut Vec<u8>) -> Result<bool> {
        seq.clear();
        match self.format {
            SeqFormat::Fasta => self.next_fasta(seq),
            SeqFormat::Fastq => self.next_fastq(seq),
        }
    }

    fn next_fasta(&mut self, seq: &mut Vec<u8>) -> Result<bool> {
        if !self.pending_header {
            if !self.read_nonblank_line()? {
                return Ok(false);
            }
        }
        self.pending_header = false;
        if self.line.first() != Some(&b'>') {
            bail!("malformed FASTA record: header does not start with '>'");
        }
        loop {
            if !self.read_nonblank_line()? {
                break;
            }
            if self.line.first() == Some(&b'>') {
                // keep the look-ahead header for the next record
                self.pending_header = true;
                break;
            }
            push_sequence_bytes(seq, &self.line);
        }
        Ok(true)
    }

    fn next_fastq(&mut self, seq: &mut Vec<u8>) -> Result<bool> {
        if !self.read_nonblank_line()? {
            return Ok(false);
        }
        if self.line.first() != Some(&b'@') {
            bail!("malformed FASTQ record: header does not start with '@'");
        }
        if !self.read_line()? {
            bail!("truncated FASTQ record: missing sequence line");
        }
        push_sequence_bytes(seq, &self.line);
        if !self.read_line()? || self.line.first() != Some(&b'+') {
            bail!("malformed FASTQ record: missing '+' separator");
        }
        if !self.read_line()? {
            bail!("truncated FASTQ record: missing quality line");
        }
        Ok(true)
    }

    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.line)
            .context("read error on sequence stream")?;
        Ok(n > 0)
    }

    fn read_nonblank_line(&mut self) -> Result<bool> {
        loop {
            if !self.read_line()? {
                return Ok(false);
            }
            if self.line.iter().any(|b| !b.is_ascii_whitespace()) {
                return Ok(true);
            }
        }
    }
}

fn push_sequence_bytes(seq: &mut Vec<u8>, line: &[u8]) {
    seq.extend(line.iter().copied().filter(|b| !b.is_ascii_whitespace()));
}
