use std::path::Path;

use anyhow::{Context, Result};
use bio::io::fasta;
use clap::ArgMatches;
use log::info;

use bpreveal_core::utils::{finish_dynamic_writer, get_dynamic_reader, get_dynamic_writer};
use bpreveal_shuffle::{seed, shuffle_string};

pub fn run_shuffle(matches: &ArgMatches) -> Result<()> {
    let input = matches
        .get_one::<String>("fasta")
        .context("An input fasta is required.")?;
    let kmer_size = *matches
        .get_one::<usize>("kmer-size")
        .context("A k-mer size is required.")?;
    let num_shuffles = *matches.get_one::<usize>("num-shuffles").unwrap_or(&1);
    let output = matches
        .get_one::<String>("output")
        .context("An output path is required.")?;

    if let Some(value) = matches.get_one::<u64>("seed") {
        seed(*value);
    }

    let reader = fasta::Reader::new(get_dynamic_reader(Path::new(input))?);
    let mut output_file = get_dynamic_writer(Path::new(output))?;
    let mut writer = fasta::Writer::new(&mut output_file);

    let mut count = 0;
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to parse {}", input))?;
        let shuffles = shuffle_string(record.seq(), kmer_size, num_shuffles)?;
        for (i, shuffled) in shuffles.iter().enumerate() {
            let id = format!("{}_shuf{}", record.id(), i);
            writer.write(&id, record.desc(), shuffled)?;
        }
        count += 1;
    }
    writer.flush()?;
    drop(writer);
    finish_dynamic_writer(output_file)?;
    info!("Shuffled {} sequences {} times each", count, num_shuffles);

    Ok(())
}
