use clap::{ArgAction, Command, arg, value_parser};

pub const TILE_GENOME_CMD: &str = "tile-genome";
pub const REGION_COUNTS_CMD: &str = "region-counts";

pub fn create_tile_genome_cli() -> Command {
    Command::new(TILE_GENOME_CMD)
        .about("Tile every N-free stretch of a genome with evenly spaced windows.")
        .arg(arg!(--genome <genome> "Genome fasta, optionally gzipped").required(true))
        .arg(
            arg!(--"input-length" <length> "Width of the model input")
                .required(true)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(--"output-length" <length> "Width of each emitted window")
                .required(true)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(--spacing <spacing> "Gap between windows; negative values overlap them")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(arg!(--blacklist <bed> "Regions to treat as missing data"))
        .arg(arg!(--output <output> "Output bed file").required(true))
}

pub fn create_region_counts_cli() -> Command {
    Command::new(REGION_COUNTS_CMD)
        .about("Sum absolute bigWig signal over every region of a bed file.")
        .arg(arg!(--bed <bed> "Regions to count").required(true))
        .arg(
            arg!(--bigwig <bigwig> "One or more bigWig tracks")
                .required(true)
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            arg!(--threads <threads> "Number of worker threads")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .arg(arg!(--output <output> "Output tsv").required(true))
}
