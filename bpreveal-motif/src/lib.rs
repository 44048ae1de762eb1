//! # Motif calibration and scanning
//!
//! Turns motif discovery results into a table of trimmed patterns with
//! per-pattern score cutoffs, then scans contribution scores genome-wide for
//! windows that clear every cutoff.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use bpreveal_motif::{MotifScanConfig, motif_scan};
//!
//! let config = MotifScanConfig::from_path(Path::new("scan.json")).unwrap();
//! let summary = motif_scan(&config).unwrap();
//! println!("{} hits", summary.hits);
//! ```

pub mod config;
pub mod contribs;
pub mod cutoffs;
pub mod errors;
pub mod matrix;
pub mod modisco;
pub mod pattern;
pub mod scan;
pub mod tsv;

// re-exports
pub use config::{MotifScanConfig, PatternSelection, ScanSettings, SeqletCutoffConfig};
pub use contribs::{ContribReader, ContribRecord};
pub use cutoffs::{CalibratedPattern, CutoffParams, calibrate_pattern, seqlet_cutoffs};
pub use errors::{ConfigError, PatternError, ScanError};
pub use modisco::ModiscoArtifact;
pub use pattern::{Pattern, load_patterns, write_patterns};
pub use scan::{ScanSummary, motif_scan, scan_contributions};
pub use tsv::Hit;
