use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegionError {
    #[error("Invalid region {chr}:{start}-{end}, start must be less than end")]
    InvalidBounds { chr: String, start: u32, end: u32 },

    #[error("Error parsing region: {0}")]
    RegionParseError(String),

    #[error("Can't read file: {0}")]
    FileReadError(String),

    #[error("Invalid base {base:?} at position {position}")]
    InvalidBase { base: char, position: usize },

    #[error("Unknown verbosity level: {0}")]
    UnknownVerbosity(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Timed out after {0:?} waiting on the worker queue")]
    DispatchTimeout(std::time::Duration),

    #[error("Worker failed on query {index}: {message}")]
    WorkerFailed { index: String, message: String },

    #[error("Worker setup failed: {0}")]
    WorkerSetup(String),

    #[error("A worker thread panicked")]
    WorkerPanicked,

    #[error("Worker queue disconnected")]
    Disconnected,
}
