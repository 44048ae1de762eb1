use indicatif::ProgressBar;
use log::debug;

use bpreveal_core::models::{Region, Strand};

use crate::genome::Genome;

fn is_missing(base: u8) -> bool {
    base == b'N' || base == b'n'
}

fn segment(chrom: &str, start: usize, end: usize) -> Region {
    Region {
        chr: chrom.to_string(),
        start: start as u32,
        end: end as u32,
        name: None,
        score: None,
        strand: Strand::Unknown,
    }
}

///
/// Find the maximal runs of a chromosome that contain no `N`.
///
/// Any part of `blacklist` on this chromosome is treated exactly like `N`
/// bases; blacklist entries past the end of the sequence are clamped.
/// Returns half-open regions in ascending order.
///
/// For `ATATATATnnnnnnnATATATATATATnnn` this gives `[0, 8)` and `[15, 27)`.
///
pub fn find_valid_segments(sequence: &[u8], chrom: &str, blacklist: &[Region]) -> Vec<Region> {
    let mut valid: Vec<bool> = sequence.iter().map(|&base| !is_missing(base)).collect();

    for black in blacklist.iter().filter(|r| r.chr == chrom) {
        let start = (black.start as usize).min(valid.len());
        let end = (black.end as usize).min(valid.len());
        valid[start..end].fill(false);
    }

    let mut segments = Vec::new();
    let mut run_start = None;
    for (position, &ok) in valid.iter().enumerate() {
        match (ok, run_start) {
            (true, None) => run_start = Some(position),
            (false, Some(start)) => {
                segments.push(segment(chrom, start, position));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        segments.push(segment(chrom, start, valid.len()));
    }

    segments
}

///
/// Segments of every chromosome that are safe to draw model inputs from,
/// chromosomes visited in sorted name order.
///
pub fn make_whitelist_segments(genome: &Genome, blacklist: Option<&[Region]>) -> Vec<Region> {
    debug!("Building segments.");
    let blacklist = blacklist.unwrap_or(&[]);
    let chrom_names: Vec<&str> = genome.chrom_names().collect();
    let bar = ProgressBar::new(chrom_names.len() as u64);

    let mut segments = Vec::new();
    for chrom in chrom_names {
        if let Some(sequence) = genome.chrom_sequence(chrom) {
            segments.extend(find_valid_segments(sequence, chrom, blacklist));
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    debug!("Found {} segments", segments.len());
    segments
}
