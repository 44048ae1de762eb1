use std::fmt::{self, Display};
use std::io::Write;

use bpreveal_core::models::Strand;

use crate::matrix::Scores;

/// Column names shared by the seqlet and hit tables.
pub const TSV_HEADER: [&str; 12] = [
    "chrom",
    "start",
    "end",
    "short-name",
    "contrib-magnitude",
    "strand",
    "metacluster-name",
    "pattern-name",
    "sequence",
    "region-index",
    "seq-match",
    "contrib-match",
];

///
/// One scored window: a motif hit from a scan, or a seqlet from the
/// calibration set. Seqlets carry `.` for the chromosome and coordinates
/// relative to their example.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub short_name: String,
    pub strand: Strand,
    pub metacluster_name: String,
    pub pattern_name: String,
    pub sequence: String,
    pub region_index: u64,
    pub scores: Scores,
}

impl Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.start,
            self.end,
            self.short_name,
            self.scores.contrib_magnitude,
            self.strand,
            self.metacluster_name,
            self.pattern_name,
            self.sequence,
            self.region_index,
            self.scores.seq_match,
            self.scores.contrib_match
        )
    }
}

pub fn write_header<W: Write>(writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "{}", TSV_HEADER.join("\t"))
}

pub fn write_hits<W: Write>(writer: &mut W, hits: &[Hit]) -> std::io::Result<()> {
    for hit in hits {
        writeln!(writer, "{}", hit)?;
    }
    Ok(())
}
