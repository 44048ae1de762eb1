use std::collections::BTreeMap;
use std::path::Path;

use bio::io::fasta;

use bpreveal_core::utils::get_dynamic_reader;

use crate::errors::BedError;

///
/// A reference genome held in memory, keyed by chromosome name.
/// Chromosomes iterate in sorted name order.
///
#[derive(Debug, Clone, Default)]
pub struct Genome {
    chroms: BTreeMap<String, Vec<u8>>,
}

impl Genome {
    ///
    /// Read every record of a (optionally gzipped) fasta file.
    ///
    pub fn from_fasta<P: AsRef<Path>>(path: P) -> Result<Self, BedError> {
        let reader = get_dynamic_reader(path.as_ref())
            .map_err(|e| BedError::FastaError(e.to_string()))?;
        let reader = fasta::Reader::new(reader);

        let mut chroms = BTreeMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| BedError::FastaError(e.to_string()))?;
            chroms.insert(record.id().to_string(), record.seq().to_vec());
        }

        Ok(Genome { chroms })
    }

    pub fn from_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        Genome {
            chroms: sequences
                .into_iter()
                .map(|(name, seq)| (name.into(), seq))
                .collect(),
        }
    }

    pub fn chrom_names(&self) -> impl Iterator<Item = &str> {
        self.chroms.keys().map(|name| name.as_str())
    }

    pub fn chrom_length(&self, chrom: &str) -> Option<u32> {
        self.chroms.get(chrom).map(|seq| seq.len() as u32)
    }

    pub fn chrom_sequence(&self, chrom: &str) -> Option<&[u8]> {
        self.chroms.get(chrom).map(|seq| seq.as_slice())
    }

    ///
    /// Bases in `[start, end)` of a chromosome. The range is clamped to the
    /// chromosome end.
    ///
    pub fn fetch(&self, chrom: &str, start: u32, end: u32) -> Result<&[u8], BedError> {
        let seq = self
            .chroms
            .get(chrom)
            .ok_or_else(|| BedError::UnknownChromosome(chrom.to_string()))?;
        let end = (end as usize).min(seq.len());
        let start = (start as usize).min(end);
        Ok(&seq[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    #[rstest]
    fn test_read_fasta() {
        let mut file = tempfile::Builder::new().suffix(".fa").tempfile().unwrap();
        writeln!(file, ">chr2\nACGT\nNNAC\n>chr1\nGGG").unwrap();

        let genome = Genome::from_fasta(file.path()).unwrap();
        assert_eq!(genome.chrom_names().collect::<Vec<_>>(), vec!["chr1", "chr2"]);
        assert_eq!(genome.chrom_length("chr2"), Some(8));
        assert_eq!(genome.fetch("chr2", 2, 6).unwrap(), b"GTNN");
        assert_eq!(genome.fetch("chr1", 1, 100).unwrap(), b"GG");
    }

    #[rstest]
    fn test_fetch_unknown_chrom() {
        let genome = Genome::from_sequences([("chr1", b"ACGT".to_vec())]);
        assert!(matches!(
            genome.fetch("chrZ", 0, 1),
            Err(BedError::UnknownChromosome(_))
        ));
    }
}
