//! Scoring primitives on `L x 4` matrices in ACGT column order.
//!
//! Sequence and contribution data arrive as `f32` rows; pattern matrices
//! (CWM, PSSM, PPM) are `f64`. Every score is accumulated in `f64`.

/// Pattern matrix, one `[A, C, G, T]` row per position.
pub type Motif = Vec<[f64; 4]>;

/// Pseudocount added to each PPM entry before taking log-odds.
pub const PSSM_PSEUDOCOUNT: f64 = 1e-4;

/// Three scores of one window against one pattern.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scores {
    pub seq_match: f64,
    pub contrib_match: f64,
    pub contrib_magnitude: f64,
}

///
/// Log-odds scoring matrix from a position probability matrix:
/// `log2(((ppm + eps) / (1 + 4 eps)) / background)`.
///
pub fn ppm_to_pssm(ppm: &[[f64; 4]], background: &[f64; 4]) -> Motif {
    let norm = 1.0 + 4.0 * PSSM_PSEUDOCOUNT;
    ppm.iter()
        .map(|row| {
            let mut out = [0.0; 4];
            for b in 0..4 {
                out[b] = (((row[b] + PSSM_PSEUDOCOUNT) / norm) / background[b]).log2();
            }
            out
        })
        .collect()
}

///
/// Half-open `[start, end)` of the positions whose total absolute
/// contribution reaches `threshold * max`, widened by `padding` on each side
/// and clamped to the matrix. `None` when nothing has any contribution.
///
pub fn trim_bounds(cwm: &[[f64; 4]], threshold: f64, padding: usize) -> Option<(usize, usize)> {
    let support: Vec<f64> = cwm
        .iter()
        .map(|row| row.iter().map(|v| v.abs()).sum())
        .collect();
    let max = support.iter().cloned().fold(0.0, f64::max);
    if max <= 0.0 {
        return None;
    }

    let cutoff = threshold * max;
    let first = support.iter().position(|&s| s >= cutoff)?;
    let last = support.iter().rposition(|&s| s >= cutoff)?;

    let start = first.saturating_sub(padding);
    let end = (last + 1 + padding).min(cwm.len());
    Some((start, end))
}

/// Reverse the positions and swap A<->T, C<->G.
pub fn reverse_complement<T: Copy>(matrix: &[[T; 4]]) -> Vec<[T; 4]> {
    matrix
        .iter()
        .rev()
        .map(|row| [row[3], row[2], row[1], row[0]])
        .collect()
}

/// Sum of the PSSM entries picked out by the one-hot sequence.
pub fn seq_match(one_hot: &[[f32; 4]], pssm: &[[f64; 4]]) -> f64 {
    one_hot
        .iter()
        .zip(pssm)
        .map(|(seq_row, pssm_row)| {
            (0..4)
                .map(|b| seq_row[b] as f64 * pssm_row[b])
                .sum::<f64>()
        })
        .sum()
}

/// L1 norm of the contributions.
pub fn contrib_magnitude(contrib: &[[f32; 4]]) -> f64 {
    contrib
        .iter()
        .flat_map(|row| row.iter())
        .map(|v| v.abs() as f64)
        .sum()
}

///
/// Continuous Jaccard similarity between contributions and a CWM. Both are
/// L1-normalised first; signs must agree for an entry to count towards the
/// intersection. Ranges over `[-1, 1]`. An all-zero input scores 0.
///
pub fn contrib_match(contrib: &[[f32; 4]], cwm: &[[f64; 4]]) -> f64 {
    let contrib_norm = contrib_magnitude(contrib);
    let cwm_norm: f64 = cwm.iter().flat_map(|row| row.iter()).map(|v| v.abs()).sum();
    if contrib_norm == 0.0 || cwm_norm == 0.0 {
        return 0.0;
    }

    let mut intersection = 0.0;
    let mut union = 0.0;
    for (contrib_row, cwm_row) in contrib.iter().zip(cwm) {
        for b in 0..4 {
            let a = contrib_row[b] as f64 / contrib_norm;
            let c = cwm_row[b] / cwm_norm;
            intersection += a.abs().min(c.abs()) * a.signum() * c.signum();
            union += a.abs().max(c.abs());
        }
    }
    if union == 0.0 { 0.0 } else { intersection / union }
}

pub fn score_window(
    one_hot: &[[f32; 4]],
    contrib: &[[f32; 4]],
    pssm: &[[f64; 4]],
    cwm: &[[f64; 4]],
) -> Scores {
    Scores {
        seq_match: seq_match(one_hot, pssm),
        contrib_match: contrib_match(contrib, cwm),
        contrib_magnitude: contrib_magnitude(contrib),
    }
}

///
/// Quantile `q` of `values`, interpolating linearly between the two
/// nearest order statistics. `None` for an empty slice.
///
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
