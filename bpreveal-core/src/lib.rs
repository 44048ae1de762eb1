//! Core types shared by the bpreveal crates.
//!
//! - [`models`]: genomic regions and strands
//! - [`utils`]: readers for plain or gzipped files, chromosome sizes,
//!   one-hot encoding and log level parsing
//! - [`dispatch`]: a fixed pool of worker threads that answers indexed
//!   queries in completion order

pub mod dispatch;
pub mod errors;
pub mod models;
pub mod utils;

// re-exports
pub use dispatch::{Dispatcher, FailurePolicy, QueryWorker};
pub use errors::{DispatchError, RegionError};
pub use models::{Region, Strand};
