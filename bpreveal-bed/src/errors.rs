use thiserror::Error;

use bpreveal_core::{DispatchError, RegionError};

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("Can't read {chr}:{start}-{end} from track: {reason}")]
    TrackReadError {
        chr: String,
        start: u32,
        end: u32,
        reason: String,
    },

    #[error("Can't open track {path}: {reason}")]
    TrackOpenError { path: String, reason: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Error, Debug)]
pub enum BedError {
    #[error("Spacing {spacing} with output length {output_length} never advances")]
    NonPositiveStep { spacing: i64, output_length: u32 },

    #[error("Output length {output_length} is longer than input length {input_length}")]
    OutputLongerThanInput { input_length: u32, output_length: u32 },

    #[error("An input region is not the expected width {width}: {region}")]
    WrongWidth { width: u32, region: String },

    #[error("Unsupported resize mode: {0}")]
    UnknownResizeMode(String),

    #[error("Chromosome {0} is not in the genome")]
    UnknownChromosome(String),

    #[error("Can't read fasta: {0}")]
    FastaError(String),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
