use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{info, warn};

use bpreveal_bed::{
    BigWigTrack, Genome, count_regions, line_to_region, make_whitelist_segments, tile_segments,
};
use bpreveal_core::dispatch::DispatcherOptions;
use bpreveal_core::models::Region;
use bpreveal_core::utils::{finish_dynamic_writer, get_dynamic_reader, get_dynamic_writer};

fn read_bed(path: &Path) -> Result<Vec<Region>> {
    let reader = get_dynamic_reader(path)?;
    let mut regions = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(region) = line_to_region(&line)
            .with_context(|| format!("{}: bad line {}", path.display(), number + 1))?
        {
            regions.push(region);
        }
    }
    Ok(regions)
}

pub fn run_tile_genome(matches: &ArgMatches) -> Result<()> {
    let genome_path = matches
        .get_one::<String>("genome")
        .context("A genome fasta is required.")?;
    let input_length = *matches
        .get_one::<u32>("input-length")
        .context("An input length is required.")?;
    let output_length = *matches
        .get_one::<u32>("output-length")
        .context("An output length is required.")?;
    let spacing = *matches
        .get_one::<i64>("spacing")
        .context("A spacing is required.")?;
    let output = matches
        .get_one::<String>("output")
        .context("An output path is required.")?;

    let genome = Genome::from_fasta(genome_path)?;
    let blacklist = match matches.get_one::<String>("blacklist") {
        Some(path) => Some(read_bed(Path::new(path))?),
        None => None,
    };

    let segments = make_whitelist_segments(&genome, blacklist.as_deref());
    let windows = tile_segments(input_length, output_length, &segments, spacing)?;

    let mut writer = get_dynamic_writer(Path::new(output))?;
    for window in &windows {
        writeln!(writer, "{}", window.as_string())?;
    }
    finish_dynamic_writer(writer)?;
    info!("Wrote {} windows to {}", windows.len(), output);

    Ok(())
}

pub fn run_region_counts(matches: &ArgMatches) -> Result<()> {
    let bed = matches
        .get_one::<String>("bed")
        .context("A bed file is required.")?;
    let bigwigs: Vec<String> = matches
        .get_many::<String>("bigwig")
        .context("At least one bigWig is required.")?
        .cloned()
        .collect();
    let threads = *matches.get_one::<usize>("threads").unwrap_or(&1);
    let output = matches
        .get_one::<String>("output")
        .context("An output path is required.")?;

    let regions = read_bed(Path::new(bed))?;
    info!("Counting {} regions over {} tracks", regions.len(), bigwigs.len());

    let totals = count_regions(&regions, DispatcherOptions::new(threads), move |_| {
        bigwigs
            .iter()
            .map(|name| BigWigTrack::open(name))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut writer = get_dynamic_writer(Path::new(output))?;
    let mut missing = 0;
    for (region, total) in regions.iter().zip(&totals) {
        match total {
            Some(total) => writeln!(writer, "{}\t{}\t{}\t{}", region.chr, region.start, region.end, total)?,
            None => {
                missing += 1;
                writeln!(writer, "{}\t{}\t{}\tNA", region.chr, region.start, region.end)?
            }
        }
    }
    finish_dynamic_writer(writer)?;
    if missing > 0 {
        warn!("{} regions could not be counted", missing);
    }

    Ok(())
}
