use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bpreveal_core::models::Strand;
use bpreveal_core::utils::{finish_dynamic_writer, get_dynamic_reader, get_dynamic_writer};

use crate::errors::{PatternError, ScanError};
use crate::matrix::{Motif, Scores, reverse_complement, score_window};

///
/// A trimmed motif with the cutoffs a window must reach to count as a hit.
/// A `None` cutoff accepts every score on that axis.
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Pattern {
    pub metacluster_name: String,
    pub pattern_name: String,
    pub short_name: String,
    pub cwm: Motif,
    pub pssm: Motif,
    pub seq_match_cutoff: Option<f64>,
    pub contrib_match_cutoff: Option<f64>,
    pub contrib_magnitude_cutoff: Option<f64>,
}

impl Pattern {
    pub fn width(&self) -> usize {
        self.cwm.len()
    }

    pub fn accepts(&self, scores: &Scores) -> bool {
        let passes = |cutoff: Option<f64>, score: f64| cutoff.is_none_or(|c| score >= c);
        passes(self.seq_match_cutoff, scores.seq_match)
            && passes(self.contrib_match_cutoff, scores.contrib_match)
            && passes(self.contrib_magnitude_cutoff, scores.contrib_magnitude)
    }

    ///
    /// A pattern needs at least one position, and its CWM and PSSM must
    /// cover the same positions.
    ///
    pub fn check_shape(&self) -> Result<(), PatternError> {
        if self.cwm.is_empty() {
            return Err(PatternError::ZeroWidth(self.short_name.clone()));
        }
        if self.cwm.len() != self.pssm.len() {
            return Err(PatternError::ShapeMismatch {
                pattern: self.short_name.clone(),
                reason: format!(
                    "cwm has {} positions but pssm has {}",
                    self.cwm.len(),
                    self.pssm.len()
                ),
            });
        }
        Ok(())
    }
}

/// Read a pattern table written by [`write_patterns`]. Every pattern must pass
/// [`Pattern::check_shape`].
pub fn load_patterns(path: &Path) -> Result<Vec<Pattern>, ScanError> {
    let reader = get_dynamic_reader(path)?;
    let patterns: Vec<Pattern> = serde_json::from_reader(reader)?;
    for pattern in &patterns {
        pattern.check_shape()?;
    }
    Ok(patterns)
}

pub fn write_patterns(path: &Path, patterns: &[Pattern]) -> Result<(), ScanError> {
    let mut writer = get_dynamic_writer(path)?;
    serde_json::to_writer_pretty(&mut writer, patterns)?;
    writeln!(writer)?;
    finish_dynamic_writer(writer)?;
    Ok(())
}

///
/// A pattern ready for scanning: both orientations of its matrices, so a
/// window can be scored on either strand without copying the window.
///
#[derive(Debug, Clone)]
pub struct ScanPattern {
    pub pattern: Pattern,
    rc_cwm: Motif,
    rc_pssm: Motif,
}

impl ScanPattern {
    pub fn new(pattern: Pattern) -> Result<Self, PatternError> {
        pattern.check_shape()?;
        Ok(ScanPattern {
            rc_cwm: reverse_complement(&pattern.cwm),
            rc_pssm: reverse_complement(&pattern.pssm),
            pattern,
        })
    }

    pub fn width(&self) -> usize {
        self.pattern.width()
    }

    pub fn score(&self, one_hot: &[[f32; 4]], contrib: &[[f32; 4]], strand: Strand) -> Scores {
        match strand {
            Strand::Reverse => score_window(one_hot, contrib, &self.rc_pssm, &self.rc_cwm),
            _ => score_window(one_hot, contrib, &self.pattern.pssm, &self.pattern.cwm),
        }
    }
}
