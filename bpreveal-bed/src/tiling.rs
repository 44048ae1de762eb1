use indicatif::ProgressBar;
use log::debug;

use bpreveal_core::models::Region;

use crate::errors::BedError;
use crate::genome::Genome;
use crate::segments::make_whitelist_segments;

///
/// Tile segments with windows of `output_length` bases.
///
/// Each segment is first shrunk by `(input_length - output_length) / 2` on
/// both sides so a model reading `input_length` bases around any window
/// stays inside the segment. Segments that shrink below `output_length`
/// are dropped.
///
/// `spacing` is the gap between the end of one window and the start of the
/// next (negative for overlapping windows). When the next step would run
/// past the segment end, one final window is placed flush against the end
/// if any room is left, so for a 30 bp segment with input 10, output 6 and
/// spacing 5:
///
/// ```text
/// 012345678901234567890123456789
/// --xxxxxx-----xxxxxx---xxxxxx--
/// ```
///
pub fn tile_segments(
    input_length: u32,
    output_length: u32,
    segments: &[Region],
    spacing: i64,
) -> Result<Vec<Region>, BedError> {
    if output_length > input_length {
        return Err(BedError::OutputLongerThanInput {
            input_length,
            output_length,
        });
    }
    let width = output_length as i64;
    let step = spacing + width;
    if output_length == 0 || step <= 0 {
        return Err(BedError::NonPositiveStep {
            spacing,
            output_length,
        });
    }

    let padding = (input_length - output_length) / 2;
    debug!("Calculated padding of {}", padding);

    let shrunk: Vec<(&Region, i64, i64)> = segments
        .iter()
        .filter_map(|s| {
            let start = s.start as i64 + padding as i64;
            let end = s.end as i64 - padding as i64;
            (end - start >= width).then_some((s, start, end))
        })
        .collect();
    debug!(
        "Filtered segments. {} of {} survive.",
        shrunk.len(),
        segments.len()
    );

    let bar = ProgressBar::new(shrunk.len() as u64);
    let mut regions = Vec::new();
    for (segment, seg_start, seg_end) in shrunk {
        let mut start = seg_start;
        let mut end = start + width;
        while end < seg_end {
            regions.push(segment.with_bounds(start as u32, end as u32)?);
            start += step;
            end = start + width;
        }
        if start < seg_end {
            // right-aligned tail window; may overlap its predecessor
            regions.push(segment.with_bounds((seg_end - width) as u32, seg_end as u32)?);
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    debug!("Regions created, {} across genome.", regions.len());
    Ok(regions)
}

///
/// Windows of `output_length` tiling every N-free stretch of the genome.
///
pub fn create_tiling_regions(
    input_length: u32,
    output_length: u32,
    genome: &Genome,
    spacing: i64,
) -> Result<Vec<Region>, BedError> {
    let segments = make_whitelist_segments(genome, None);
    tile_segments(input_length, output_length, &segments, spacing)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;

    fn bounds(regions: &[Region]) -> Vec<(u32, u32)> {
        regions.iter().map(|r| (r.start, r.end)).collect()
    }

    #[rstest]
    fn test_tile_documented_example() {
        let segments = vec![Region::new("chr1", 0, 30).unwrap()];
        let windows = tile_segments(10, 6, &segments, 5).unwrap();
        assert_eq!(bounds(&windows), vec![(2, 8), (13, 19), (22, 28)]);
    }

    #[rstest]
    #[case(0, vec![(0, 5), (5, 10), (10, 15)])]
    #[case(-2, vec![(0, 5), (3, 8), (6, 11), (9, 14), (10, 15)])]
    #[case(20, vec![(0, 5)])]
    fn test_tile_spacing(#[case] spacing: i64, #[case] expected: Vec<(u32, u32)>) {
        let segments = vec![Region::new("chr1", 0, 15).unwrap()];
        let windows = tile_segments(5, 5, &segments, spacing).unwrap();
        assert_eq!(bounds(&windows), expected);
    }

    #[rstest]
    fn test_short_segments_dropped() {
        let segments = vec![
            Region::new("chr1", 0, 9).unwrap(),
            Region::new("chr1", 20, 30).unwrap(),
        ];
        // padding 2 leaves 5 and 6 bases
        let windows = tile_segments(10, 6, &segments, 0).unwrap();
        assert_eq!(bounds(&windows), vec![(22, 28)]);
    }

    #[rstest]
    fn test_bad_parameters() {
        let segments = vec![Region::new("chr1", 0, 30).unwrap()];
        assert!(matches!(
            tile_segments(10, 6, &segments, -6),
            Err(BedError::NonPositiveStep { .. })
        ));
        assert!(matches!(
            tile_segments(4, 6, &segments, 0),
            Err(BedError::OutputLongerThanInput { .. })
        ));
    }

    #[rstest]
    fn test_random_tiling_covers_segments() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let start = rng.random_range(0..1000u32);
            let len = rng.random_range(1..400u32);
            let output_length = rng.random_range(1..40u32);
            let input_length = output_length + rng.random_range(0..20u32);
            let spacing = rng.random_range(0..30i64);
            let segment = Region::new("chr1", start, start + len).unwrap();

            let windows = tile_segments(input_length, output_length, &[segment], spacing).unwrap();
            let padding = (input_length - output_length) / 2;
            let inner_start = start + padding;
            let inner_end = (start + len).saturating_sub(padding);
            if inner_end < inner_start || inner_end - inner_start < output_length {
                assert!(windows.is_empty());
                continue;
            }

            assert_eq!(windows.first().unwrap().start, inner_start);
            // only the tail may lose bases, and never more than `spacing`
            assert!(inner_end - windows.last().unwrap().end <= spacing as u32);
            for pair in windows.windows(2) {
                // never more than `spacing` bases between neighbours
                assert!(pair[1].start <= pair[0].end + spacing as u32);
            }
            for w in &windows {
                assert_eq!(w.width(), output_length);
                assert!(w.start >= inner_start && w.end <= inner_end);
            }
        }
    }

    #[rstest]
    fn test_create_tiling_regions() {
        let genome = Genome::from_sequences([("chr1", b"ACGTACGTACNNACGTACGTACGT".to_vec())]);
        let windows = create_tiling_regions(4, 2, &genome, 0).unwrap();
        // segments [0,10) and [12,24), shrunk by 1
        assert_eq!(
            bounds(&windows),
            vec![(1, 3), (3, 5), (5, 7), (7, 9), (13, 15), (15, 17), (17, 19), (19, 21), (21, 23)]
        );
    }
}
