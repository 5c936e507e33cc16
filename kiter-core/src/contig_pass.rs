// Contig pass: double-buffered reading, tip indexing, edge streaming

use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use rayon::prelude::*;

use kiter_common::{Multi, MULTI_MAX};

use crate::contig_batch::{ContigBatch, ContigSource};
use crate::crucial::CrucialKmers;
use crate::edge_writer::EdgeWriter;

#[derive(Debug, Default, Clone, Copy)]
pub struct ContigPassStats {
    pub contigs: u64,
    pub bases: u64,
}

/// Stream one contig/multiplicity pair: while the I/O thread fills one
/// batch, the worker pool indexes the other batch's tips (primary input
/// only) and the calling thread streams its edges out in contig order.
pub fn run_contig_pass(
    source: ContigSource,
    crucial: &CrucialKmers,
    writer: &mut EdgeWriter,
    pool: &rayon::ThreadPool,
    k: usize,
    span: usize,
    is_additional: bool,
) -> Result<ContigPassStats> {
    let mut stats = ContigPassStats::default();
    let mut spare = ContigBatch::new();
    let mut pending = spawn_fill(source, ContigBatch::new());

    loop {
        let (source, batch) = join_fill(pending)?;
        if batch.is_empty() {
            source.finish()?;
            break;
        }
        pending = spawn_fill(source, spare);

        eprintln!(
            "Read {} contigs, total length: {}",
            batch.len(),
            batch.total_bases()
        );
        stats.contigs += batch.len() as u64;
        stats.bases += batch.total_bases() as u64;

        if !is_additional {
            pool.install(|| {
                (0..batch.len())
                    .into_par_iter()
                    .for_each(|i| crucial.insert_contig(batch.seq(i)));
            });
            writer.write_header()?;
        }

        for i in 0..batch.len() {
            let seq = batch.seq(i);
            if seq.len() < span {
                continue;
            }
            let multi = rescale_multiplicity(seq.len(), k, span, batch.multi(i));
            writer.write_contig_edges(seq, multi)?;
        }

        spare = batch;
    }

    Ok(stats)
}

fn spawn_fill(
    mut source: ContigSource,
    mut batch: ContigBatch,
) -> JoinHandle<Result<(ContigSource, ContigBatch)>> {
    thread::spawn(move || {
        source.fill(&mut batch)?;
        Ok((source, batch))
    })
}

fn join_fill(
    handle: JoinHandle<Result<(ContigSource, ContigBatch)>>,
) -> Result<(ContigSource, ContigBatch)> {
    handle
        .join()
        .map_err(|_| anyhow!("contig input thread panicked"))?
}

/// Convert a contig's k-mer multiplicity into the expected multiplicity
/// of its `span`-mers (`span = k + s + 1`).
///
/// A `span`-mer near a contig end covers fewer k-mer windows than an
/// interior one; the expected k-mer count is accumulated over both kinds
/// and normalized back to a per-`span`-mer value.
pub fn rescale_multiplicity(len: usize, k: usize, span: usize, multi_k: f64) -> Multi {
    debug_assert!(len >= span && span > k);
    let num_kmer = (len - k + 1) as f64;
    let num_span = (len - span + 1) as f64;
    let window = (span - k + 1) as f64;

    let internal_max = window.min(num_span);
    let num_external = internal_max - 1.0;
    let num_internal = num_kmer - num_external * 2.0;

    let expected = (num_external * (num_external + 1.0) / window
        + internal_max / window * num_internal)
        * multi_k;
    let rescaled = (expected * k as f64 / span as f64 / num_span + 0.5) as u32;
    rescaled.min(MULTI_MAX as u32) as Multi
}
