use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bpreveal_core::utils::get_dynamic_reader;

use crate::errors::ScanError;

/// One region of a contribution store: its sequence and hypothetical scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ContribRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub sequence: String,
    pub hyp_scores: Vec<[f32; 4]>,
}

impl ContribRecord {
    ///
    /// One-hot rows of the sequence. Bases other than ACGT (`N` and
    /// friends) become all-zero rows.
    ///
    pub fn one_hot(&self) -> Vec<[f32; 4]> {
        self.sequence
            .bytes()
            .map(|base| {
                let mut row = [0.0; 4];
                match base.to_ascii_uppercase() {
                    b'A' => row[0] = 1.0,
                    b'C' => row[1] = 1.0,
                    b'G' => row[2] = 1.0,
                    b'T' => row[3] = 1.0,
                    _ => {}
                }
                row
            })
            .collect()
    }

    /// Actual contributions: hypothetical scores masked by the sequence.
    pub fn contributions(&self, one_hot: &[[f32; 4]]) -> Vec<[f32; 4]> {
        self.hyp_scores
            .iter()
            .zip(one_hot)
            .map(|(hyp, ohe)| [hyp[0] * ohe[0], hyp[1] * ohe[1], hyp[2] * ohe[2], hyp[3] * ohe[3]])
            .collect()
    }

    pub fn check_shape(&self, index: usize) -> Result<(), ScanError> {
        let length = self.sequence.len();
        if self.hyp_scores.len() != length {
            return Err(ScanError::RecordShape {
                index,
                reason: format!(
                    "{} bases but {} rows of scores",
                    length,
                    self.hyp_scores.len()
                ),
            });
        }
        if self.end.saturating_sub(self.start) != length as u64 {
            return Err(ScanError::RecordShape {
                index,
                reason: format!(
                    "{}:{}-{} does not span {} bases",
                    self.chrom, self.start, self.end, length
                ),
            });
        }
        Ok(())
    }
}

///
/// Reads a JSON-lines contribution store, one [`ContribRecord`] per line,
/// in file order. Blank lines are skipped.
///
pub struct ContribReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_number: usize,
}

impl<R: BufRead> ContribReader<R> {
    pub fn new(reader: R) -> Self {
        ContribReader {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl ContribReader<std::io::BufReader<Box<dyn std::io::Read>>> {
    /// Open a store on disk, gzipped when the path ends in `.gz`.
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        Ok(ContribReader::new(get_dynamic_reader(path)?))
    }
}

impl<R: BufRead> Iterator for ContribReader<R> {
    type Item = Result<ContribRecord, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|err| ScanError::RecordShape {
                index: self.line_number,
                reason: err.to_string(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn record() -> ContribRecord {
        ContribRecord {
            chrom: "chr1".to_string(),
            start: 100,
            end: 104,
            sequence: "ACnT".to_string(),
            hyp_scores: vec![[1.0, 2.0, 3.0, 4.0]; 4],
        }
    }

    #[rstest]
    fn test_contributions_masked_by_sequence(record: ContribRecord) {
        let one_hot = record.one_hot();
        assert_eq!(one_hot[2], [0.0; 4]);
        assert_eq!(
            record.contributions(&one_hot),
            vec![
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 2.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 4.0]
            ]
        );
    }

    #[rstest]
    fn test_shape_checks(mut record: ContribRecord) {
        assert!(record.check_shape(0).is_ok());
        record.end = 110;
        assert!(record.check_shape(0).is_err());
        record.end = 104;
        record.hyp_scores.pop();
        assert!(matches!(
            record.check_shape(7),
            Err(ScanError::RecordShape { index: 7, .. })
        ));
    }

    #[rstest]
    fn test_reader_skips_blank_lines(record: ContribRecord) {
        let line = serde_json::to_string(&record).unwrap();
        let text = format!("{}\n\n{}\nnot json\n", line, line);
        let results: Vec<_> = ContribReader::new(Cursor::new(text)).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &record);
        assert_eq!(results[1].as_ref().unwrap(), &record);
        assert!(matches!(results[2], Err(ScanError::RecordShape { index: 4, .. })));
    }
}
