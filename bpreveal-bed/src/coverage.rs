use std::collections::HashMap;

use bigtools::BigWigRead;
use bigtools::utils::reopen::ReopenableFile;

use bpreveal_core::models::Region;

use crate::errors::CoverageError;

/// Per-base signal over a genome, such as a bigWig of read coverage.
pub trait SignalTrack {
    fn chrom_length(&self, chrom: &str) -> Option<u32>;

    /// Values over `[start, end)`. Bases without data come back as NaN.
    fn values(&mut self, chrom: &str, start: u32, end: u32) -> Result<Vec<f32>, CoverageError>;
}

fn check_bounds<T: SignalTrack + ?Sized>(track: &T, region: &Region) -> Result<(), CoverageError> {
    match track.chrom_length(&region.chr) {
        Some(length) if region.end <= length => Ok(()),
        Some(length) => Err(CoverageError::TrackReadError {
            chr: region.chr.clone(),
            start: region.start,
            end: region.end,
            reason: format!("chromosome is only {} bp long", length),
        }),
        None => Err(CoverageError::TrackReadError {
            chr: region.chr.clone(),
            start: region.start,
            end: region.end,
            reason: "chromosome is not in the track".to_string(),
        }),
    }
}

///
/// Total signal of every track over a region: NaN counts as zero and each
/// value contributes its absolute value.
///
/// Fails with [`CoverageError::TrackReadError`] when the region runs past
/// the end of its chromosome in any track.
///
pub fn coverage<T: SignalTrack>(region: &Region, tracks: &mut [T]) -> Result<f64, CoverageError> {
    let mut total = 0.0;
    for track in tracks.iter_mut() {
        check_bounds(track, region)?;
        let values = track.values(&region.chr, region.start, region.end)?;
        total += values
            .iter()
            .filter(|v| !v.is_nan())
            .map(|v| v.abs() as f64)
            .sum::<f64>();
    }
    Ok(total)
}

/// A bigWig file opened for reading.
pub struct BigWigTrack {
    path: String,
    reader: BigWigRead<ReopenableFile>,
    lengths: HashMap<String, u32>,
}

impl BigWigTrack {
    pub fn open(path: &str) -> Result<Self, CoverageError> {
        let reader = BigWigRead::open_file(path).map_err(|e| CoverageError::TrackOpenError {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let lengths = reader
            .chroms()
            .iter()
            .map(|chrom| (chrom.name.clone(), chrom.length))
            .collect();
        Ok(BigWigTrack {
            path: path.to_string(),
            reader,
            lengths,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SignalTrack for BigWigTrack {
    fn chrom_length(&self, chrom: &str) -> Option<u32> {
        self.lengths.get(chrom).copied()
    }

    fn values(&mut self, chrom: &str, start: u32, end: u32) -> Result<Vec<f32>, CoverageError> {
        self.reader
            .values(chrom, start, end)
            .map_err(|e| CoverageError::TrackReadError {
                chr: chrom.to_string(),
                start,
                end,
                reason: e.to_string(),
            })
    }
}

/// A track held in memory, one value per base.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrack {
    chroms: HashMap<String, Vec<f32>>,
}

impl MemoryTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chrom(mut self, chrom: &str, values: Vec<f32>) -> Self {
        self.chroms.insert(chrom.to_string(), values);
        self
    }
}

impl SignalTrack for MemoryTrack {
    fn chrom_length(&self, chrom: &str) -> Option<u32> {
        self.chroms.get(chrom).map(|values| values.len() as u32)
    }

    fn values(&mut self, chrom: &str, start: u32, end: u32) -> Result<Vec<f32>, CoverageError> {
        self.chroms
            .get(chrom)
            .and_then(|values| values.get(start as usize..end as usize))
            .map(|values| values.to_vec())
            .ok_or_else(|| CoverageError::TrackReadError {
                chr: chrom.to_string(),
                start,
                end,
                reason: "out of range".to_string(),
            })
    }
}
