use std::collections::HashMap;
use std::str::FromStr;

use bpreveal_core::errors::RegionError;
use bpreveal_core::models::{Region, Strand};

use crate::errors::BedError;
use crate::genome::Genome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Keep the region; its width must already match.
    None,
    /// Resize around the region's midpoint.
    Center,
    /// Resize around the region's start coordinate.
    Start,
}

impl FromStr for ResizeMode {
    type Err = BedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ResizeMode::None),
            "center" => Ok(ResizeMode::Center),
            "start" => Ok(ResizeMode::Start),
            _ => Err(BedError::UnknownResizeMode(s.to_string())),
        }
    }
}

///
/// A new region of exactly `width` bases at the same place as `region`,
/// keeping its name, score and strand.
///
/// Returns `Ok(None)` when the resized region would touch or run off either
/// end of the chromosome.
///
pub fn resize(
    region: &Region,
    mode: ResizeMode,
    width: u32,
    chrom_sizes: &HashMap<String, u32>,
) -> Result<Option<Region>, BedError> {
    let chrom_length = *chrom_sizes
        .get(&region.chr)
        .ok_or_else(|| BedError::UnknownChromosome(region.chr.clone()))?;

    let width = width as i64;
    let (start, end) = match mode {
        ResizeMode::None => {
            if region.width() as i64 != width {
                return Err(BedError::WrongWidth {
                    width: width as u32,
                    region: region.to_string(),
                });
            }
            (region.start as i64, region.end as i64)
        }
        ResizeMode::Center => {
            let center = (region.start as i64 + region.end as i64) / 2;
            let start = center - width / 2;
            (start, start + width)
        }
        ResizeMode::Start => {
            let start = region.start as i64 - width / 2;
            (start, start + width)
        }
    };

    if start <= 0 || end >= chrom_length as i64 {
        return Ok(None);
    }
    Ok(Some(region.with_bounds(start as u32, end as u32)?))
}

///
/// Does the region hold only A, C, G and T (in either case)?
///
pub fn sequence_checker(region: &Region, genome: &Genome) -> Result<bool, BedError> {
    let seq = genome.fetch(&region.chr, region.start, region.end)?;
    Ok(seq.len() == region.width() as usize
        && seq
            .iter()
            .all(|base| matches!(base.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')))
}

///
/// Parse one line of a bed file. Blank lines and `#` comments give
/// `Ok(None)`. Columns past the sixth are ignored.
///
pub fn line_to_region(line: &str) -> Result<Option<Region>, BedError> {
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(RegionError::RegionParseError(format!("too few columns: {}", line)).into());
    }
    let parse_coord = |field: &str| {
        field
            .parse::<u32>()
            .map_err(|e| RegionError::RegionParseError(format!("{}: {}", field, e)))
    };

    let mut region = Region::new(fields[0], parse_coord(fields[1])?, parse_coord(fields[2])?)?;
    if let Some(name) = fields.get(3) {
        region = region.with_name(name);
    }
    if let Some(score) = fields.get(4).filter(|s| **s != ".") {
        let score = score
            .parse::<f64>()
            .map_err(|e| RegionError::RegionParseError(format!("{}: {}", score, e)))?;
        region = region.with_score(score);
    }
    if let Some(strand) = fields.get(5) {
        let strand = Strand::from_str(strand).map_err(RegionError::RegionParseError)?;
        region = region.with_strand(strand);
    }

    Ok(Some(region))
}
