//! Iterative edge extension for a de Bruijn graph assembler.
//!
//! One iteration moves the graph from k-mer size `k` to `k + step`:
//! contigs assembled at size `k` imply `(k + step + 1)`-mers directly,
//! and reads bridging contig ends contribute the missing ones. The
//! pipeline indexes contig tips (crucial k-mers plus short extension
//! hints), streams every contig-implied edge into a packed binary
//! stream, then scans all reads against the tip index, counting the
//! edges each read supports and keeping the reads that were useful.
//!
//! Input parsing and both passes overlap I/O and processing through a
//! two-slot double buffer: a dedicated thread fills one batch while a
//! worker pool processes the other.
//!
//! # Outputs
//!
//! - `<prefix>.edges.0` — `next_k` and the per-edge word count, then
//!   fixed-width packed edges (contig-implied first, read-discovered
//!   last)
//! - `<prefix>.rr.pb` — packed reads that supported at least one edge,
//!   consumable as `binary`-format input by the next iteration

pub mod config;
pub mod contig_batch;
pub mod contig_pass;
pub mod crucial;
pub mod edge_map;
pub mod edge_writer;
pub mod fastx;
pub mod iterate;
pub mod read_batch;
pub mod read_pass;

// Re-export commonly used types
pub use config::{Config, ReadFormat};
pub use contig_batch::{ContigBatch, ContigSource};
pub use crucial::CrucialKmers;
pub use edge_map::IterativeEdges;
pub use edge_writer::{decode_edge, words_per_edge, EdgeWriter, PackedEdge};
pub use iterate::{run, RunSummary};
pub use read_batch::{words_per_read, ReadBatch, ReadSource};
