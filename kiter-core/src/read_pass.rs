// Read pass: anchor labeling against contig tips, edge discovery,
// filtered-read output

use std::io::Write;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;

use kiter_common::{complement, Kmer};

use crate::crucial::CrucialKmers;
use crate::edge_map::IterativeEdges;
use crate::read_batch::{ReadBatch, ReadSource};

#[derive(Debug, Default, Clone, Copy)]
pub struct ReadPassStats {
    pub total_reads: u64,
    pub aligned_reads: u64,
}

/// Scan every read: while the I/O thread fills one batch, the worker
/// pool labels the other batch's reads and counts the edges they
/// support; reads that aligned are appended to `filtered_out` in input
/// order.
pub fn run_read_pass(
    source: ReadSource,
    crucial: &CrucialKmers,
    edges: &IterativeEdges,
    filtered_out: &mut impl Write,
    pool: &rayon::ThreadPool,
    k: usize,
    step: usize,
    max_read_len: usize,
) -> Result<ReadPassStats> {
    let mut stats = ReadPassStats::default();
    let mut spare = ReadBatch::new(max_read_len);
    let mut pending = spawn_fill(source, ReadBatch::new(max_read_len));
    let mut batch_count = 0u64;

    loop {
        let (source, batch) = join_fill(pending)?;
        if batch.is_empty() {
            break;
        }
        pending = spawn_fill(source, spare);

        let aligned: Vec<bool> = pool.install(|| {
            (0..batch.num_reads())
                .into_par_iter()
                .map(|i| scan_read(&batch, i, crucial, edges, k, step))
                .collect()
        });

        for i in 0..batch.num_reads() {
            if aligned[i] {
                for &w in batch.record(i) {
                    filtered_out
                        .write_all(&w.to_le_bytes())
                        .context("write error on filtered read stream")?;
                }
            }
        }

        stats.total_reads += batch.num_reads() as u64;
        stats.aligned_reads += aligned.iter().filter(|&&a| a).count() as u64;

        batch_count += 1;
        if batch_count % 16 == 0 {
            eprintln!(
                "Total: {}, aligned: {}. Iterative edges: {}",
                stats.total_reads,
                stats.aligned_reads,
                edges.len()
            );
        }

        spare = batch;
    }

    Ok(stats)
}

fn spawn_fill(
    mut source: ReadSource,
    mut batch: ReadBatch,
) -> JoinHandle<Result<(ReadSource, ReadBatch)>> {
    thread::spawn(move || {
        source.fill(&mut batch)?;
        Ok((source, batch))
    })
}

fn join_fill(
    handle: JoinHandle<Result<(ReadSource, ReadBatch)>>,
) -> Result<(ReadSource, ReadBatch)> {
    handle
        .join()
        .map_err(|_| anyhow!("read input thread panicked"))?
}

/// Scan one read. Returns whether the read supported at least one edge.
///
/// Phase 1 walks a k-wide window over the read. Whenever the window (or
/// its reverse complement) is a crucial k-mer, the anchored position is
/// marked and the tip's extension hint is matched onward: forwards along
/// the read for a direct hit, backwards with complementation for a
/// reverse-complement hit.
///
/// Phase 2 slides a `(k+s+1)`-wide window; wherever `s+2` consecutive
/// positions carry marks, the window is an edge supported by this read
/// and its canonical form is counted.
pub(crate) fn scan_read(
    batch: &ReadBatch,
    i: usize,
    crucial: &CrucialKmers,
    edges: &IterativeEdges,
    k: usize,
    step: usize,
) -> bool {
    let length = batch.length(i);
    let span = k + step + 1;
    if length < span {
        return false;
    }

    let mut exist = vec![false; length];
    let mut cur_pos: usize = 0;
    let mut last_marked: isize = -1;

    let mut kmer = Kmer::new(k);
    for j in 0..k {
        kmer.shift_append(batch.base_at(i, j));
    }
    let mut rev_kmer = kmer.reverse_complement();

    while cur_pos + k <= length {
        let mut next_pos = cur_pos + 1;
        if !exist[cur_pos] {
            if let Some(hint) = crucial.get(&kmer) {
                exist[cur_pos] = true;
                let mut j = 0;
                while j < hint.len() && cur_pos + k + j < length {
                    if batch.base_at(i, cur_pos + k + j) == hint.base_at(j) {
                        exist[cur_pos + j + 1] = true;
                    } else {
                        break;
                    }
                    j += 1;
                }
                last_marked = (cur_pos + j) as isize;
                next_pos = cur_pos + j + 1;
            } else if let Some(hint) = crucial.get(&rev_kmer) {
                exist[cur_pos] = true;
                let mut j = 0;
                while j < hint.len() && cur_pos as isize - 1 - j as isize > last_marked {
                    let pos = cur_pos - 1 - j;
                    if complement(batch.base_at(i, pos)) == hint.base_at(j) {
                        exist[pos] = true;
                    } else {
                        break;
                    }
                    j += 1;
                }
                // a reverse-complement hit extends backwards only and
                // deliberately leaves last_marked untouched
            }
        }

        if next_pos + k <= length {
            while cur_pos < next_pos {
                cur_pos += 1;
                let c = batch.base_at(i, cur_pos + k - 1);
                kmer.shift_append(c);
                rev_kmer.shift_preappend(complement(c));
            }
        } else {
            break;
        }
    }

    let mut aligned = false;
    kmer.resize(span);
    rev_kmer.resize(span);
    let mut last_j: isize = -(k as isize);
    let mut acc_exist = 0usize;

    for j in 0..=(length - k) {
        acc_exist = if exist[j] { acc_exist + 1 } else { 0 };
        if acc_exist < step + 2 {
            continue;
        }

        // re-synchronize the span-wide window ending at j + k; how much
        // work that takes depends on the gap since the last emission
        let gap = j as isize - last_j;
        if gap < 8 {
            for x in (last_j + 1)..=(j as isize) {
                let c = batch.base_at(i, (x + k as isize - 1) as usize);
                kmer.shift_append(c);
                rev_kmer.shift_preappend(complement(c));
            }
        } else if gap < span as isize {
            for x in (last_j + 1)..=(j as isize) {
                kmer.shift_append(batch.base_at(i, (x + k as isize - 1) as usize));
            }
            rev_kmer = kmer.reverse_complement();
        } else {
            for pos in (j - step - 1)..(j + k) {
                kmer.shift_append(batch.base_at(i, pos));
            }
            rev_kmer = kmer.reverse_complement();
        }

        let key = if kmer < rev_kmer { kmer } else { rev_kmer };
        edges.add_support(key);
        last_j = j as isize;
        aligned = true;
    }

    aligned
}
