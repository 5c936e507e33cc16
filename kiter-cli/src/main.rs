// kiter CLI - one edge-extension iteration per invocation

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kiter_core::{Config, ReadFormat};

#[derive(Parser, Debug)]
#[command(name = "kiter")]
#[command(version, about = "Extend assembly edges from k to k + step using contig tips and supporting reads", long_about = None)]
struct Cli {
    /// Contigs file, fasta/fastq format, output by the assembler
    #[arg(short = 'c', long = "contigs_file")]
    contigs_file: PathBuf,

    /// Multiplicity file matching the contigs, one value per contig
    #[arg(short = 'm', long = "multi_file")]
    multi_file: PathBuf,

    /// Additional contigs file (requires --addi_multi_file)
    #[arg(long = "addi_contig_file")]
    addi_contig_file: Option<PathBuf>,

    /// Multiplicity file matching the additional contigs
    #[arg(long = "addi_multi_file")]
    addi_multi_file: Option<PathBuf>,

    /// Reads to be aligned; "-" for stdin; may be gzip'ed
    #[arg(short = 'r', long = "read_file")]
    read_file: String,

    /// Read format: fasta, fastq or binary
    #[arg(short = 'f', long = "read_format")]
    read_format: String,

    /// Number of cpu threads, at least 2; 0 for auto detect
    #[arg(short = 't', long = "num_cpu_threads", default_value_t = 0)]
    num_cpu_threads: usize,

    /// Current kmer size
    #[arg(short = 'k', long = "kmer_k")]
    kmer_k: usize,

    /// Step for this iteration (at most 29): extends kmer_k to kmer_k + step
    #[arg(short = 's', long = "step")]
    step: usize,

    /// Max read length over all reads
    #[arg(short = 'l', long = "max_read_len")]
    max_read_len: usize,

    /// Output prefix; <prefix>.edges.0 and <prefix>.rr.pb will be created
    #[arg(short = 'o', long = "output_prefix")]
    output_prefix: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        contigs_file: cli.contigs_file,
        multi_file: cli.multi_file,
        addi_contig_file: cli.addi_contig_file,
        addi_multi_file: cli.addi_multi_file,
        read_file: cli.read_file,
        read_format: ReadFormat::parse(&cli.read_format)?,
        kmer_k: cli.kmer_k,
        step: cli.step,
        max_read_len: cli.max_read_len,
        num_cpu_threads: cli.num_cpu_threads,
        output_prefix: cli.output_prefix,
    };

    let summary = kiter_core::run(&config)?;
    eprintln!(
        "Done. {} contigs, {} crucial kmers, {}/{} reads aligned, {} discovered edges",
        summary.contigs,
        summary.crucial_kmers,
        summary.aligned_reads,
        summary.total_reads,
        summary.discovered_edges
    );
    Ok(())
}
