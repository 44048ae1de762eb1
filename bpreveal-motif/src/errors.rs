use thiserror::Error;

use bpreveal_core::{DispatchError, RegionError};

/// Problems with a configuration, found before any work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Both seqlet-cutoff-settings and seqlet-cutoff-json were given; pick one")]
    BothCutoffSources,

    #[error("One of seqlet-cutoff-settings or seqlet-cutoff-json is required")]
    NoCutoffSource,

    #[error("Motif scanning needs at least 3 threads (feeder, scorer, writer), got {0}")]
    TooFewThreads(usize),

    #[error("{name} must be between 0 and 1, got {value}")]
    InvalidQuantile { name: String, value: f64 },

    #[error("trim-threshold must be between 0 and 1, got {0}")]
    InvalidTrimThreshold(f64),

    #[error("Background probabilities {0:?} must be non-negative and sum to 1")]
    InvalidBackground([f64; 4]),

    #[error("No background probabilities are known for genome {0}")]
    UnknownGenome(String),

    #[error("Metacluster {0} is selected both by \"all\" and by explicit pattern names")]
    PatternSpecAmbiguous(String),

    #[error("Invalid pattern spec for metacluster {metacluster}: {reason}")]
    InvalidPatternSpec { metacluster: String, reason: String },

    #[error("{0} is not supported")]
    Unsupported(String),

    #[error("Can't parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Problems confined to one pattern. The cutoff engine skips the pattern.
#[derive(Error, Debug, PartialEq)]
pub enum PatternError {
    #[error("Pattern {0} has zero width")]
    ZeroWidth(String),

    #[error("Pattern {0} has no seqlets")]
    NoSeqlets(String),

    #[error("Pattern {pattern} not found in metacluster {metacluster}")]
    MissingPattern { metacluster: String, pattern: String },

    #[error("Pattern {pattern} has inconsistent shapes: {reason}")]
    ShapeMismatch { pattern: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error("Bad contribution record {index}: {reason}")]
    RecordShape { index: usize, reason: String },

    #[error("No usable patterns to scan with")]
    NoPatterns,

    #[error("The hit writer stopped early")]
    WriterClosed,

    #[error("The hit writer panicked")]
    WriterPanicked,

    #[error("Can't parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
