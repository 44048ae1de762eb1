use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bpreveal_core::utils::get_dynamic_reader;

use crate::config::{PatternRef, PatternSelection};
use crate::errors::{PatternError, ScanError};
use crate::matrix::Motif;

/// Seqlets assigned to one pattern, stored column-wise.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Seqlets {
    /// One-hot sequence of every seqlet, oriented like the pattern.
    pub sequence: Vec<Vec<[f32; 4]>>,
    pub contrib_scores: Vec<Vec<[f32; 4]>>,
    pub example_idx: Vec<u64>,
    pub start: Vec<i64>,
    pub end: Vec<i64>,
    pub is_revcomp: Vec<bool>,
}

impl Seqlets {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModiscoPattern {
    /// Contribution weight matrix.
    pub contrib_scores: Motif,
    /// Position probability matrix.
    pub sequence: Motif,
    #[serde(default)]
    pub seqlets: Seqlets,
}

impl ModiscoPattern {
    ///
    /// Check that the CWM, the PPM and every seqlet have the same width and
    /// that the seqlet columns line up.
    ///
    pub fn check_shapes(&self, name: &str) -> Result<(), PatternError> {
        let mismatch = |reason: String| PatternError::ShapeMismatch {
            pattern: name.to_string(),
            reason,
        };
        let width = self.contrib_scores.len();
        if self.sequence.len() != width {
            return Err(mismatch(format!(
                "cwm has {} positions but ppm has {}",
                width,
                self.sequence.len()
            )));
        }

        let seqlets = &self.seqlets;
        let n = seqlets.len();
        for (column, len) in [
            ("contrib_scores", seqlets.contrib_scores.len()),
            ("example_idx", seqlets.example_idx.len()),
            ("start", seqlets.start.len()),
            ("end", seqlets.end.len()),
            ("is_revcomp", seqlets.is_revcomp.len()),
        ] {
            if len != n {
                return Err(mismatch(format!("{} seqlet sequences but {} {}", n, len, column)));
            }
        }
        for (i, (seq, contrib)) in seqlets.sequence.iter().zip(&seqlets.contrib_scores).enumerate() {
            if seq.len() != width || contrib.len() != width {
                return Err(mismatch(format!("seqlet {} is not {} bases wide", i, width)));
            }
        }
        Ok(())
    }
}

/// A motif-discovery result: metacluster -> pattern -> pattern data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ModiscoArtifact {
    pub metaclusters: BTreeMap<String, BTreeMap<String, ModiscoPattern>>,
}

///
/// Sort key that orders `pattern_2` before `pattern_10`: the name up to its
/// trailing digits, then those digits as a number.
///
pub fn natural_key(name: &str) -> (String, u64) {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = name[stem.len()..].parse().unwrap_or(0);
    (stem.to_string(), number)
}

fn sorted_naturally<'a>(names: impl Iterator<Item = &'a String>) -> Vec<&'a String> {
    let mut names: Vec<&String> = names.collect();
    names.sort_by_key(|name| natural_key(name));
    names
}

impl ModiscoArtifact {
    /// Read a JSON artifact, gzipped when the path ends in `.gz`.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let reader = get_dynamic_reader(path)?;
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn pattern(&self, metacluster: &str, pattern: &str) -> Result<&ModiscoPattern, PatternError> {
        self.metaclusters
            .get(metacluster)
            .and_then(|patterns| patterns.get(pattern))
            .ok_or_else(|| PatternError::MissingPattern {
                metacluster: metacluster.to_string(),
                pattern: pattern.to_string(),
            })
    }

    fn all_in(&self, metacluster: &str) -> Vec<PatternRef> {
        match self.metaclusters.get(metacluster) {
            Some(patterns) => sorted_naturally(patterns.keys())
                .into_iter()
                .map(|name| PatternRef::new(metacluster, name, None))
                .collect(),
            None => Vec::new(),
        }
    }

    ///
    /// Expand a selection into concrete patterns. Catch-all selections are
    /// expanded in natural name order; explicit names are kept as given,
    /// even when the artifact lacks them.
    ///
    pub fn select(&self, selection: &PatternSelection) -> Vec<PatternRef> {
        match selection {
            PatternSelection::Keyword(_) => sorted_naturally(self.metaclusters.keys())
                .into_iter()
                .flat_map(|metacluster| self.all_in(metacluster))
                .collect(),
            PatternSelection::Specs(specs) => specs
                .iter()
                .flat_map(|spec| {
                    if spec.is_catch_all() {
                        self.all_in(&spec.metacluster_name)
                    } else {
                        spec.explicit_refs()
                    }
                })
                .collect(),
        }
    }
}
