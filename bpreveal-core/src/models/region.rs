use std::fmt::{self, Display};

use crate::errors::RegionError;
use crate::models::strand::Strand;

///
/// A half-open genomic interval `[start, end)` with the optional BED6 fields.
///
/// Regions are never mutated after construction; resizing or shrinking a
/// region produces a new one.
///
#[derive(PartialEq, Debug, Clone)]
pub struct Region {
    pub chr: String,
    pub start: u32,
    pub end: u32,

    pub name: Option<String>,
    pub score: Option<f64>,
    pub strand: Strand,
}

impl Region {
    ///
    /// Create a region, checking that `start < end`.
    ///
    pub fn new(chr: &str, start: u32, end: u32) -> Result<Self, RegionError> {
        if start >= end {
            return Err(RegionError::InvalidBounds {
                chr: chr.to_string(),
                start,
                end,
            });
        }
        Ok(Region {
            chr: chr.to_string(),
            start,
            end,
            name: None,
            score: None,
            strand: Strand::Unknown,
        })
    }

    /// Copy of this region at new coordinates, keeping name, score and strand.
    pub fn with_bounds(&self, start: u32, end: u32) -> Result<Self, RegionError> {
        let mut region = Region::new(&self.chr, start, end)?;
        region.name = self.name.clone();
        region.score = self.score;
        region.strand = self.strand;
        Ok(region)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    ///
    /// Get length of the region
    ///
    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    ///
    /// Get the BED line for this region. Optional columns are only written
    /// when a later column requires them.
    ///
    pub fn as_string(&self) -> String {
        let mut line = format!("{}\t{}\t{}", self.chr, self.start, self.end);
        let has_strand = self.strand != Strand::Unknown;
        let has_score = self.score.is_some() || has_strand;
        if self.name.is_some() || has_score {
            line.push('\t');
            line.push_str(self.name.as_deref().unwrap_or("."));
        }
        if has_score {
            line.push('\t');
            match self.score {
                Some(score) => line.push_str(&score.to_string()),
                None => line.push('0'),
            }
        }
        if has_strand {
            line.push('\t');
            line.push(self.strand.as_char());
        }
        line
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}
