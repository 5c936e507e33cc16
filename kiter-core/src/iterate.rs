// Top-level driver: contig passes, read pass, final edge drain

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::contig_batch::ContigSource;
use crate::contig_pass::run_contig_pass;
use crate::crucial::CrucialKmers;
use crate::edge_map::IterativeEdges;
use crate::edge_writer::EdgeWriter;
use crate::read_batch::ReadSource;
use crate::read_pass::run_read_pass;

/// Pre-reservation factor for the discovered-edge map, relative to the
/// number of crucial k-mers.
const EDGE_RESERVE_FACTOR: usize = 10;

#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub contigs: u64,
    pub crucial_kmers: usize,
    pub total_reads: u64,
    pub aligned_reads: u64,
    pub discovered_edges: usize,
}

/// Run one full iteration: index contig tips, stream contig-implied
/// edges, discover read-supported edges, and write the filtered reads.
pub fn run(config: &Config) -> Result<RunSummary> {
    config.validate()?;
    let k = config.kmer_k;
    let step = config.step;
    let span = config.edge_span();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads())
        .build()
        .context("failed to build worker thread pool")?;

    let crucial = CrucialKmers::new(k, step);
    let mut edge_writer = EdgeWriter::create(&config.edges_path(), span)?;
    let filtered_file = File::create(config.filtered_reads_path()).with_context(|| {
        format!(
            "failed to create {}",
            config.filtered_reads_path().display()
        )
    })?;
    let mut filtered_out = BufWriter::new(filtered_file);

    eprintln!("Reading contigs...");
    let source = ContigSource::open(&config.contigs_file, &config.multi_file)?;
    let contig_stats = run_contig_pass(source, &crucial, &mut edge_writer, &pool, k, span, false)?;
    eprintln!("Number of crucial kmers: {}", crucial.len());

    let mut contigs = contig_stats.contigs;
    if let (Some(contig_path), Some(multi_path)) =
        (&config.addi_contig_file, &config.addi_multi_file)
    {
        eprintln!("Reading additional contigs...");
        let source = ContigSource::open(contig_path, multi_path)?;
        let addi_stats =
            run_contig_pass(source, &crucial, &mut edge_writer, &pool, k, span, true)?;
        contigs += addi_stats.contigs;
    }

    let edges = IterativeEdges::with_capacity(crucial.len() * EDGE_RESERVE_FACTOR);
    let read_source = ReadSource::open(config)?;
    let read_stats = run_read_pass(
        read_source,
        &crucial,
        &edges,
        &mut filtered_out,
        &pool,
        k,
        step,
        config.max_read_len,
    )?;
    eprintln!(
        "Total: {}, aligned: {}. Iterative edges: {}",
        read_stats.total_reads,
        read_stats.aligned_reads,
        edges.len()
    );

    eprintln!("Writing iterative edges...");
    for (kmer, multi) in edges.iter() {
        edge_writer.write_kmer_edge(&kmer, multi)?;
    }
    edge_writer.finish()?;
    filtered_out
        .flush()
        .context("write error on filtered read stream")?;

    Ok(RunSummary {
        contigs,
        crucial_kmers: crucial.len(),
        total_reads: read_stats.total_reads,
        aligned_reads: read_stats.aligned_reads,
        discovered_edges: edges.len(),
    })
}
