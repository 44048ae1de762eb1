use clap::{Command, arg, value_parser};

pub const SHUFFLE_CMD: &str = "shuffle";

pub fn create_shuffle_cli() -> Command {
    Command::new(SHUFFLE_CMD)
        .about("Shuffle every sequence of a fasta file, keeping its k-mer counts.")
        .arg(arg!(--fasta <fasta> "Input fasta, optionally gzipped").required(true))
        .arg(
            arg!(--"kmer-size" <k> "Length of the k-mers to preserve")
                .required(true)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"num-shuffles" <n> "Shuffled copies per input sequence")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .arg(arg!(--seed <seed> "Seed for reproducible shuffles").value_parser(value_parser!(u64)))
        .arg(arg!(--output <output> "Output fasta").required(true))
}
