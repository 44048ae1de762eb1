//! Region preparation utilities.
//!
//! Finds the stretches of a genome that hold no `N` bases, tiles them with
//! fixed-width windows, resizes and checks individual regions, and sums
//! bigWig signal over many regions on a pool of workers.
//!
//! # Example
//!
//! ```no_run
//! use bpreveal_bed::{Genome, make_whitelist_segments, tile_segments};
//!
//! let genome = Genome::from_fasta("genome.fa").unwrap();
//! let segments = make_whitelist_segments(&genome, None);
//! let windows = tile_segments(3000, 1000, &segments, 0).unwrap();
//! ```

pub mod counter;
pub mod coverage;
pub mod errors;
pub mod genome;
pub mod intervals;
pub mod segments;
pub mod tiling;

// re-exports
pub use counter::{ParallelCounter, count_regions};
pub use coverage::{BigWigTrack, MemoryTrack, SignalTrack, coverage};
pub use errors::{BedError, CoverageError};
pub use genome::Genome;
pub use intervals::{ResizeMode, line_to_region, resize, sequence_checker};
pub use segments::{find_valid_segments, make_whitelist_segments};
pub use tiling::{create_tiling_regions, tile_segments};
