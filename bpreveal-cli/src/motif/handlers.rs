use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use bpreveal_motif::{MotifScanConfig, SeqletCutoffConfig, motif_scan, seqlet_cutoffs};

use crate::init_logging;

pub fn run_seqlet_cutoffs(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<String>("config")
        .context("A configuration file is required.")?;

    let config = SeqletCutoffConfig::from_path(Path::new(config_path))
        .with_context(|| format!("Failed to read configuration {}", config_path))?;
    init_logging(config.log_level()?)?;

    let patterns = seqlet_cutoffs(&config)?;
    info!("Done: {} patterns calibrated", patterns.len());

    Ok(())
}

pub fn run_motif_scan(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<String>("config")
        .context("A configuration file is required.")?;

    let config = MotifScanConfig::from_path(Path::new(config_path))
        .with_context(|| format!("Failed to read configuration {}", config_path))?;
    init_logging(config.log_level()?)?;

    let summary = motif_scan(&config)?;
    info!("Done: {} hits in {} regions", summary.hits, summary.records);

    Ok(())
}
