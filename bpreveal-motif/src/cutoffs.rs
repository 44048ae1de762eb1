//! Per-pattern cutoffs from the scores of the seqlets motif discovery
//! assigned to each pattern.

use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;

use bpreveal_core::models::Strand;
use bpreveal_core::utils::{finish_dynamic_writer, get_dynamic_writer, one_hot_decode};

use crate::config::{PatternRef, SeqletCutoffConfig};
use crate::errors::{PatternError, ScanError};
use crate::matrix::{ppm_to_pssm, quantile, score_window, trim_bounds};
use crate::modisco::ModiscoArtifact;
use crate::pattern::{Pattern, write_patterns};
use crate::tsv::{Hit, write_header, write_hits};

/// Everything needed to calibrate a single pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct CutoffParams {
    pub trim_threshold: f64,
    pub trim_padding: usize,
    pub background: [f64; 4],
    pub seq_match_quantile: Option<f64>,
    pub contrib_match_quantile: Option<f64>,
    pub contrib_magnitude_quantile: Option<f64>,
}

impl CutoffParams {
    pub fn from_config(config: &SeqletCutoffConfig) -> Result<Self, ScanError> {
        Ok(CutoffParams {
            trim_threshold: config.trim_threshold,
            trim_padding: config.trim_padding,
            background: config.background_probs.resolve()?,
            seq_match_quantile: config.seq_match_quantile,
            contrib_match_quantile: config.contrib_match_quantile,
            contrib_magnitude_quantile: config.contrib_magnitude_quantile,
        })
    }
}

/// A calibrated pattern and the scored seqlets its cutoffs came from.
#[derive(Debug, Clone)]
pub struct CalibratedPattern {
    pub pattern: Pattern,
    pub seqlets: Vec<Hit>,
}

fn cutoff(values: &[f64], q: Option<f64>) -> Option<f64> {
    q.and_then(|q| quantile(values, q))
}

///
/// Trim one pattern, score every one of its seqlets over the trimmed span
/// and turn the requested quantiles of those scores into cutoffs.
///
pub fn calibrate_pattern(
    artifact: &ModiscoArtifact,
    pattern_ref: &PatternRef,
    params: &CutoffParams,
) -> Result<CalibratedPattern, PatternError> {
    let source = artifact.pattern(&pattern_ref.metacluster_name, &pattern_ref.pattern_name)?;
    source.check_shapes(&pattern_ref.short_name)?;

    let (trim_start, trim_end) =
        trim_bounds(&source.contrib_scores, params.trim_threshold, params.trim_padding)
            .ok_or_else(|| PatternError::ZeroWidth(pattern_ref.short_name.clone()))?;
    let cwm = source.contrib_scores[trim_start..trim_end].to_vec();
    let pssm = ppm_to_pssm(&source.sequence[trim_start..trim_end], &params.background);
    debug!(
        "{}: trimmed to [{}, {}) of {}",
        pattern_ref.short_name,
        trim_start,
        trim_end,
        source.contrib_scores.len()
    );

    let seqlets = &source.seqlets;
    if seqlets.is_empty() {
        return Err(PatternError::NoSeqlets(pattern_ref.short_name.clone()));
    }

    let scored: Vec<Hit> = (0..seqlets.len())
        .map(|i| {
            let one_hot = &seqlets.sequence[i][trim_start..trim_end];
            let contrib = &seqlets.contrib_scores[i][trim_start..trim_end];
            let scores = score_window(one_hot, contrib, &pssm, &cwm);

            // the seqlet arrays are oriented like the pattern
            let (start, end, strand) = if seqlets.is_revcomp[i] {
                let end = seqlets.end[i];
                (end - trim_end as i64, end - trim_start as i64, Strand::Reverse)
            } else {
                let start = seqlets.start[i];
                (start + trim_start as i64, start + trim_end as i64, Strand::Forward)
            };

            Hit {
                chrom: ".".to_string(),
                start: start.max(0) as u64,
                end: end.max(0) as u64,
                short_name: pattern_ref.short_name.clone(),
                strand,
                metacluster_name: pattern_ref.metacluster_name.clone(),
                pattern_name: pattern_ref.pattern_name.clone(),
                sequence: one_hot_decode(one_hot),
                region_index: seqlets.example_idx[i],
                scores,
            }
        })
        .collect();

    let seq_match: Vec<f64> = scored.iter().map(|h| h.scores.seq_match).collect();
    let contrib_match: Vec<f64> = scored.iter().map(|h| h.scores.contrib_match).collect();
    let contrib_magnitude: Vec<f64> = scored.iter().map(|h| h.scores.contrib_magnitude).collect();

    let pattern = Pattern {
        metacluster_name: pattern_ref.metacluster_name.clone(),
        pattern_name: pattern_ref.pattern_name.clone(),
        short_name: pattern_ref.short_name.clone(),
        cwm,
        pssm,
        seq_match_cutoff: cutoff(&seq_match, params.seq_match_quantile),
        contrib_match_cutoff: cutoff(&contrib_match, params.contrib_match_quantile),
        contrib_magnitude_cutoff: cutoff(&contrib_magnitude, params.contrib_magnitude_quantile),
    };

    Ok(CalibratedPattern {
        pattern,
        seqlets: scored,
    })
}

///
/// Calibrate every selected pattern in parallel. A pattern that can't be
/// calibrated is skipped with a warning; the others still come back, in
/// selection order.
///
pub fn calibrate_patterns(
    artifact: &ModiscoArtifact,
    selected: &[PatternRef],
    params: &CutoffParams,
) -> Vec<CalibratedPattern> {
    let results: Vec<(&PatternRef, Result<CalibratedPattern, PatternError>)> = selected
        .par_iter()
        .map(|pattern_ref| (pattern_ref, calibrate_pattern(artifact, pattern_ref, params)))
        .collect();

    results
        .into_iter()
        .filter_map(|(pattern_ref, result)| match result {
            Ok(calibrated) => Some(calibrated),
            Err(err) => {
                warn!("Skipping pattern {}: {}", pattern_ref.short_name, err);
                None
            }
        })
        .collect()
}

fn write_seqlets(path: &Path, calibrated: &[CalibratedPattern]) -> Result<(), ScanError> {
    let mut writer = get_dynamic_writer(path)?;
    write_header(&mut writer)?;
    for pattern in calibrated {
        write_hits(&mut writer, &pattern.seqlets)?;
    }
    finish_dynamic_writer(writer)?;
    Ok(())
}

///
/// Run the whole cutoff step described by `config`: load the artifact,
/// calibrate the selected patterns and write the optional seqlet table and
/// pattern JSON.
///
pub fn seqlet_cutoffs(config: &SeqletCutoffConfig) -> Result<Vec<Pattern>, ScanError> {
    config.validate()?;
    let params = CutoffParams::from_config(config)?;

    info!("Loading motif discovery results from {:?}", config.modisco_h5);
    let artifact = ModiscoArtifact::from_path(&config.modisco_h5)?;
    let selected = artifact.select(&config.patterns);
    info!("Calibrating {} patterns", selected.len());

    let calibrated = calibrate_patterns(&artifact, &selected, &params);
    info!("Calibrated {} of {} patterns", calibrated.len(), selected.len());

    if let Some(path) = &config.seqlets_tsv {
        write_seqlets(path, &calibrated)?;
        info!("Wrote seqlet scores to {:?}", path);
    }

    let patterns: Vec<Pattern> = calibrated.into_iter().map(|c| c.pattern).collect();
    if let Some(path) = &config.quantile_json {
        write_patterns(path, &patterns)?;
        info!("Wrote pattern cutoffs to {:?}", path);
    }
    Ok(patterns)
}
