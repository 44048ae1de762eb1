mod bed;
mod motif;
mod shuffle;

use anyhow::{Context, Result};
use clap::{Command, arg};
use log::LevelFilter;
use simple_logger::init_with_level;

use bpreveal_core::utils::parse_verbosity;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "bpreveal";
    pub const DEFAULT_VERBOSITY: &str = "INFO";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Calibrate and scan for motifs in contribution scores, and prepare genomic regions for training.")
        .subcommand_required(true)
        .arg(
            arg!(--verbosity <level> "CRITICAL, ERROR, WARNING, INFO or DEBUG. Motif commands use the level in their config.")
                .global(true)
                .default_value(consts::DEFAULT_VERBOSITY),
        )
        .subcommand(motif::cli::create_seqlet_cutoffs_cli())
        .subcommand(motif::cli::create_motif_scan_cli())
        .subcommand(bed::cli::create_tile_genome_cli())
        .subcommand(bed::cli::create_region_counts_cli())
        .subcommand(shuffle::cli::create_shuffle_cli())
}

/// Install the logger. Only the first call has any effect.
pub fn init_logging(level: LevelFilter) -> Result<()> {
    if let Some(level) = level.to_level() {
        init_with_level(level).context("Failed to start logging")?;
    }
    Ok(())
}

fn level_from_flag(matches: &clap::ArgMatches) -> Result<LevelFilter> {
    let verbosity = matches
        .get_one::<String>("verbosity")
        .map(String::as_str)
        .unwrap_or(consts::DEFAULT_VERBOSITY);
    Ok(parse_verbosity(verbosity)?)
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // MOTIFS
        //
        Some((motif::cli::SEQLET_CUTOFFS_CMD, matches)) => {
            motif::handlers::run_seqlet_cutoffs(matches)?;
        }
        Some((motif::cli::MOTIF_SCAN_CMD, matches)) => {
            motif::handlers::run_motif_scan(matches)?;
        }

        //
        // REGION PREPARATION
        //
        Some((bed::cli::TILE_GENOME_CMD, matches)) => {
            init_logging(level_from_flag(matches)?)?;
            bed::handlers::run_tile_genome(matches)?;
        }
        Some((bed::cli::REGION_COUNTS_CMD, matches)) => {
            init_logging(level_from_flag(matches)?)?;
            bed::handlers::run_region_counts(matches)?;
        }

        //
        // SHUFFLING
        //
        Some((shuffle::cli::SHUFFLE_CMD, matches)) => {
            init_logging(level_from_flag(matches)?)?;
            shuffle::handlers::run_shuffle(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
