// Run configuration and validation

use std::path::PathBuf;

use anyhow::{bail, Result};
use kiter_common::{HINT_MAX_BASES, KMER_MAX_BASES};

/// Format of the read stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFormat {
    Fasta,
    Fastq,
    Binary,
}

impl ReadFormat {
    pub fn parse(s: &str) -> Result<ReadFormat> {
        match s {
            "fasta" => Ok(ReadFormat::Fasta),
            "fastq" => Ok(ReadFormat::Fastq),
            "binary" => Ok(ReadFormat::Binary),
            other => bail!("invalid read format {other:?} (expected fasta, fastq or binary)"),
        }
    }
}

/// Everything one iteration needs to know.
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary contig stream.
    pub contigs_file: PathBuf,
    /// Multiplicities matching `contigs_file`, one value per contig.
    pub multi_file: PathBuf,
    /// Optional second contig/multiplicity pair (both or neither).
    pub addi_contig_file: Option<PathBuf>,
    pub addi_multi_file: Option<PathBuf>,
    /// Read stream; "-" reads standard input.
    pub read_file: String,
    pub read_format: ReadFormat,
    /// Current k-mer size.
    pub kmer_k: usize,
    /// Extension step; the iteration goes from `kmer_k` to `kmer_k + step`.
    pub step: usize,
    /// Upper bound on any read length.
    pub max_read_len: usize,
    /// Total thread count including the I/O thread; 0 for auto-detect.
    pub num_cpu_threads: usize,
    /// Prefix for the `.edges.0` and `.rr.pb` outputs.
    pub output_prefix: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.kmer_k == 0 {
            bail!("invalid kmer size");
        }
        if self.step == 0 || self.step > HINT_MAX_BASES {
            bail!("step must be between 1 and {HINT_MAX_BASES}");
        }
        if self.kmer_k + self.step >= KMER_MAX_BASES {
            bail!(
                "kmer_k + step must be less than {KMER_MAX_BASES}, got {}",
                self.kmer_k + self.step
            );
        }
        if self.max_read_len == 0 || self.max_read_len > u16::MAX as usize {
            bail!("max read length must be between 1 and {}", u16::MAX);
        }
        if self.num_cpu_threads == 1 {
            bail!("at least 2 cpu threads are required (0 for auto-detect)");
        }
        if self.addi_contig_file.is_some() != self.addi_multi_file.is_some() {
            bail!("addi_contig_file and addi_multi_file must be given together");
        }
        if self.read_file.is_empty() {
            bail!("no reads file");
        }
        if self.output_prefix.is_empty() {
            bail!("no output prefix");
        }
        Ok(())
    }

    /// The k-mer size of the next iteration.
    pub fn next_k(&self) -> usize {
        self.kmer_k + self.step
    }

    /// Length of the emitted edges, `k + step + 1`.
    pub fn edge_span(&self) -> usize {
        self.next_k() + 1
    }

    pub fn edges_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.edges.0", self.output_prefix))
    }

    pub fn filtered_reads_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.rr.pb", self.output_prefix))
    }

    /// Effective thread count: configured or hardware parallelism, never
    /// below 2 (one I/O thread plus at least one worker).
    pub fn effective_threads(&self) -> usize {
        let threads = if self.num_cpu_threads == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(2)
        } else {
            self.num_cpu_threads
        };
        threads.max(2)
    }

    /// Size of the worker pool (everything but the I/O thread).
    pub fn worker_threads(&self) -> usize {
        self.effective_threads() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            contigs_file: PathBuf::from("contigs.fa"),
            multi_file: PathBuf::from("contigs.mul"),
            addi_contig_file: None,
            addi_multi_file: None,
            read_file: "reads.fq".to_string(),
            read_format: ReadFormat::Fastq,
            kmer_k: 21,
            step: 20,
            max_read_len: 150,
            num_cpu_threads: 0,
            output_prefix: "out".to_string(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(base_config().validate().is_ok());
        assert_eq!(base_config().next_k(), 41);
        assert_eq!(base_config().edge_span(), 42);
    }

    #[test]
    fn test_rejects_bad_step() {
        let mut config = base_config();
        config.step = 0;
        assert!(config.validate().is_err());
        config.step = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_kmer() {
        let mut config = base_config();
        config.kmer_k = 120;
        config.step = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_single_thread() {
        let mut config = base_config();
        config.num_cpu_threads = 1;
        assert!(config.validate().is_err());
        config.num_cpu_threads = 2;
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_threads(), 1);
    }

    #[test]
    fn test_rejects_lone_additional_file() {
        let mut config = base_config();
        config.addi_contig_file = Some(PathBuf::from("addi.fa"));
        assert!(config.validate().is_err());
        config.addi_multi_file = Some(PathBuf::from("addi.mul"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_read_format_parse() {
        assert_eq!(ReadFormat::parse("fasta").unwrap(), ReadFormat::Fasta);
        assert_eq!(ReadFormat::parse("fastq").unwrap(), ReadFormat::Fastq);
        assert_eq!(ReadFormat::parse("binary").unwrap(), ReadFormat::Binary);
        assert!(ReadFormat::parse("sam").is_err());
    }

    #[test]
    fn test_output_paths() {
        let config = base_config();
        assert_eq!(config.edges_path(), PathBuf::from("out.edges.0"));
        assert_eq!(config.filtered_reads_path(), PathBuf::from("out.rr.pb"));
    }
}
