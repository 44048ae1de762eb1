use clap::{Arg, Command};

pub const SEQLET_CUTOFFS_CMD: &str = "motif-seqlet-cutoffs";
pub const MOTIF_SCAN_CMD: &str = "motif-scan";

pub fn create_seqlet_cutoffs_cli() -> Command {
    Command::new(SEQLET_CUTOFFS_CMD)
        .about("Derive per-pattern score cutoffs from the seqlets found by motif discovery.")
        .arg(
            Arg::new("config")
                .required(true)
                .help("JSON configuration for the cutoff step"),
        )
}

pub fn create_motif_scan_cli() -> Command {
    Command::new(MOTIF_SCAN_CMD)
        .about("Scan contribution scores for windows that match calibrated motifs.")
        .arg(
            Arg::new("config")
                .required(true)
                .help("JSON configuration for the scan"),
        )
}
