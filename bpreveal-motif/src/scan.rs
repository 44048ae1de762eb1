//! Genome-wide motif scanning.
//!
//! Three roles run at once: the calling thread reads contribution records
//! and feeds them to a [`Dispatcher`], the dispatcher's workers score every
//! pattern against each record, and a writer thread appends accepted hits
//! to the output. Hits come out grouped by record in completion order.
//!
//! Output goes to `<hits-tsv>.partial` first and is renamed once every
//! record has been scanned, so a failed run never leaves a file that looks
//! complete.

use std::ffi::OsString;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Sender, bounded};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use bpreveal_core::dispatch::{Dispatcher, DispatcherOptions, FailurePolicy, QueryWorker};
use bpreveal_core::models::Strand;
use bpreveal_core::utils::{DynamicSink, DynamicWriter, finish_dynamic_writer, one_hot_decode};

use crate::config::MotifScanConfig;
use crate::contribs::{ContribReader, ContribRecord};
use crate::cutoffs::seqlet_cutoffs;
use crate::errors::{ConfigError, ScanError};
use crate::matrix::reverse_complement;
use crate::pattern::{Pattern, ScanPattern, load_patterns};
use crate::tsv::{Hit, write_header, write_hits};

/// Batches of hits that may wait for the writer.
const WRITER_QUEUE_CAPACITY: usize = 256;

/// Totals for a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub records: usize,
    pub hits: u64,
}

///
/// Every window of `record` that passes all of a pattern's cutoffs, on both
/// strands. Overlapping hits of the same pattern are all kept. The hit
/// sequence is read in the orientation of the matched strand.
///
pub fn scan_record(patterns: &[ScanPattern], record: &ContribRecord, region_index: usize) -> Vec<Hit> {
    let one_hot = record.one_hot();
    let contrib = record.contributions(&one_hot);
    let length = one_hot.len();

    let mut hits = Vec::new();
    for scan_pattern in patterns {
        let width = scan_pattern.width();
        if width > length {
            continue;
        }
        let pattern = &scan_pattern.pattern;
        for offset in 0..=(length - width) {
            let window = &one_hot[offset..offset + width];
            let window_contrib = &contrib[offset..offset + width];
            for strand in [Strand::Forward, Strand::Reverse] {
                let scores = scan_pattern.score(window, window_contrib, strand);
                if !pattern.accepts(&scores) {
                    continue;
                }
                let sequence = match strand {
                    Strand::Reverse => one_hot_decode(&reverse_complement(window)),
                    _ => one_hot_decode(window),
                };
                hits.push(Hit {
                    chrom: record.chrom.clone(),
                    start: record.start + offset as u64,
                    end: record.start + (offset + width) as u64,
                    short_name: pattern.short_name.clone(),
                    strand,
                    metacluster_name: pattern.metacluster_name.clone(),
                    pattern_name: pattern.pattern_name.clone(),
                    sequence,
                    region_index: region_index as u64,
                    scores,
                });
            }
        }
    }
    hits
}

/// Scores records against its own copy of the pattern table.
pub struct ScanWorker {
    patterns: Vec<ScanPattern>,
}

impl ScanWorker {
    pub fn new(patterns: &[Pattern]) -> Result<Self, ScanError> {
        let patterns = patterns
            .iter()
            .cloned()
            .map(ScanPattern::new)
            .collect::<Result<_, _>>()?;
        Ok(ScanWorker { patterns })
    }
}

impl QueryWorker for ScanWorker {
    type Query = (ContribRecord, usize);
    type Output = Vec<Hit>;
    type Error = ScanError;

    fn process(&mut self, (record, region_index): Self::Query) -> Result<Vec<Hit>, ScanError> {
        record.check_shape(region_index)?;
        Ok(scan_record(&self.patterns, &record, region_index))
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

fn open_hits_writer(final_path: &Path, partial: &Path) -> Result<DynamicWriter, ScanError> {
    let gzipped = final_path.extension().is_some_and(|ext| ext == "gz");
    Ok(BufWriter::new(DynamicSink::create(partial, gzipped)?))
}

fn spawn_writer(
    final_path: &Path,
    partial: &Path,
) -> Result<(Sender<Vec<Hit>>, thread::JoinHandle<Result<u64, ScanError>>), ScanError> {
    let mut writer = open_hits_writer(final_path, partial)?;
    let (hit_tx, hit_rx) = bounded::<Vec<Hit>>(WRITER_QUEUE_CAPACITY);

    let handle = thread::Builder::new()
        .name("bpreveal-hit-writer".to_string())
        .spawn(move || {
            let mut written = 0u64;
            write_header(&mut writer)?;
            for batch in hit_rx {
                write_hits(&mut writer, &batch)?;
                written += batch.len() as u64;
            }
            finish_dynamic_writer(writer)?;
            Ok(written)
        })?;
    Ok((hit_tx, handle))
}

fn feed<S>(
    pool: &mut Dispatcher<(ContribRecord, usize), Vec<Hit>, usize>,
    records: S,
    hit_tx: &Sender<Vec<Hit>>,
    progress: &ProgressBar,
) -> Result<usize, ScanError>
where
    S: Iterator<Item = Result<ContribRecord, ScanError>>,
{
    let forward = |batch: Vec<Hit>| -> Result<(), ScanError> {
        progress.inc(1);
        if batch.is_empty() {
            return Ok(());
        }
        hit_tx.send(batch).map_err(|_| ScanError::WriterClosed)
    };

    let mut submitted = 0;
    for (index, record) in records.enumerate() {
        let record = record?;
        pool.submit((record, index), index)?;
        submitted += 1;
        for (hits, _) in pool.poll_results()? {
            forward(hits)?;
        }
    }
    while let Some((hits, _)) = pool.result()? {
        forward(hits)?;
    }
    Ok(submitted)
}

///
/// Scan every record from `records` with `patterns` on `num_threads`
/// threads and write the hits to `hits_path`. One thread feeds, one writes
/// and the rest score, so at least three are needed.
///
pub fn scan_contributions<S>(
    patterns: &[Pattern],
    records: S,
    hits_path: &Path,
    num_threads: usize,
) -> Result<ScanSummary, ScanError>
where
    S: Iterator<Item = Result<ContribRecord, ScanError>>,
{
    if num_threads < 3 {
        return Err(ConfigError::TooFewThreads(num_threads).into());
    }
    if patterns.is_empty() {
        return Err(ScanError::NoPatterns);
    }
    for pattern in patterns {
        pattern.check_shape()?;
    }

    let table = Arc::new(patterns.to_vec());
    let options = DispatcherOptions::new(num_threads - 2).with_policy(FailurePolicy::Strict);
    let mut pool = Dispatcher::spawn(options, move |worker_id| {
        debug!("Scanner {} loading {} patterns", worker_id, table.len());
        ScanWorker::new(&table)
    })?;

    let partial = partial_path(hits_path);
    let (hit_tx, writer) = spawn_writer(hits_path, &partial)?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {pos} regions scanned ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let fed = feed(&mut pool, records, &hit_tx, &progress);
    let shutdown = pool.shutdown();
    let leftovers = match (&fed, shutdown) {
        (Ok(_), Ok(leftovers)) => leftovers
            .into_iter()
            .try_for_each(|(hits, _)| hit_tx.send(hits).map_err(|_| ScanError::WriterClosed)),
        (_, Err(err)) => Err(err.into()),
        (Err(_), Ok(_)) => Ok(()),
    };
    drop(hit_tx);
    progress.finish_and_clear();

    // a writer failure explains a closed channel, so it wins
    let written = writer.join().map_err(|_| ScanError::WriterPanicked)??;
    let records = fed?;
    leftovers?;

    fs::rename(&partial, hits_path)?;
    info!("Scanned {} regions, {} hits written to {:?}", records, written, hits_path);
    Ok(ScanSummary {
        records,
        hits: written,
    })
}

///
/// Run a whole scan from its configuration: obtain the pattern table
/// (calibrating it or reading a saved one), then scan the contribution
/// store.
///
pub fn motif_scan(config: &MotifScanConfig) -> Result<ScanSummary, ScanError> {
    config.validate()?;

    let patterns = match (&config.seqlet_cutoff_settings, &config.seqlet_cutoff_json) {
        (Some(settings), _) => seqlet_cutoffs(settings)?,
        (None, Some(path)) => {
            info!("Loading pattern cutoffs from {:?}", path);
            load_patterns(path)?
        }
        (None, None) => return Err(ConfigError::NoCutoffSource.into()),
    };

    let settings = &config.scan_settings;
    info!(
        "Scanning {:?} with {} patterns on {} threads",
        settings.scan_contrib_h5,
        patterns.len(),
        settings.num_threads
    );
    let records = ContribReader::open(&settings.scan_contrib_h5)?;
    scan_contributions(&patterns, records, &settings.hits_tsv, settings.num_threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use bpreveal_core::utils::get_dynamic_reader;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::tempdir;

    use crate::errors::PatternError;

    // "AG" motif, matched on the forward strand by AG and on the reverse by CT
    #[fixture]
    fn pattern() -> Pattern {
        Pattern {
            metacluster_name: "pos_patterns".to_string(),
            pattern_name: "pattern_0".to_string(),
            short_name: "AG".to_string(),
            cwm: vec![[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
            pssm: vec![[1.0, -1.0, -1.0, -1.0], [-1.0, -1.0, 1.0, -1.0]],
            seq_match_cutoff: Some(2.0),
            contrib_match_cutoff: Some(0.5),
            contrib_magnitude_cutoff: Some(0.1),
        }
    }

    fn record(chrom: &str, start: u64, sequence: &str) -> ContribRecord {
        ContribRecord {
            chrom: chrom.to_string(),
            start,
            end: start + sequence.len() as u64,
            sequence: sequence.to_string(),
            hyp_scores: vec![[1.0; 4]; sequence.len()],
        }
    }

    #[rstest]
    fn test_scan_record_both_strands(pattern: Pattern) {
        let patterns = vec![ScanPattern::new(pattern).unwrap()];
        let hits = scan_record(&patterns, &record("chr1", 100, "TAGGCTA"), 5);

        let found: Vec<(u64, u64, Strand, &str)> = hits
            .iter()
            .map(|h| (h.start, h.end, h.strand, h.sequence.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (101, 103, Strand::Forward, "AG"),
                (104, 106, Strand::Reverse, "AG"),
            ]
        );
        assert!(hits.iter().all(|h| h.region_index == 5 && h.chrom == "chr1"));
    }

    #[rstest]
    fn test_overlapping_hits_are_all_kept(mut pattern: Pattern) {
        pattern.cwm = vec![[1.0, 0.0, 0.0, 0.0]];
        pattern.pssm = vec![[1.0, -1.0, -1.0, -1.0]];
        pattern.seq_match_cutoff = Some(1.0);
        let hits = scan_record(&[ScanPattern::new(pattern).unwrap()], &record("chr1", 0, "AAAA"), 0);
        assert_eq!(hits.len(), 4);
    }

    #[rstest]
    fn test_null_cutoffs_accept_every_window(mut pattern: Pattern) {
        pattern.seq_match_cutoff = None;
        pattern.contrib_match_cutoff = None;
        pattern.contrib_magnitude_cutoff = None;
        let hits = scan_record(&[ScanPattern::new(pattern).unwrap()], &record("chr1", 0, "ACGTNAC"), 0);
        // six windows, two strands each
        assert_eq!(hits.len(), 12);
    }

    #[rstest]
    fn test_pattern_wider_than_record(pattern: Pattern) {
        let hits = scan_record(&[ScanPattern::new(pattern).unwrap()], &record("chr1", 0, "A"), 0);
        assert!(hits.is_empty());
    }

    #[rstest]
    fn test_scan_contributions_writes_hits(pattern: Pattern) {
        let dir = tempdir().unwrap();
        let hits_path = dir.path().join("hits.tsv");
        let records: Vec<Result<ContribRecord, ScanError>> = (0..50)
            .map(|i| Ok(record("chr2", i * 10, if i % 2 == 0 { "CCAGCC" } else { "CCCCCC" })))
            .collect();

        let summary = scan_contributions(&[pattern], records.into_iter(), &hits_path, 4).unwrap();
        assert_eq!(summary, ScanSummary { records: 50, hits: 25 });

        let text = fs::read_to_string(&hits_path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("chrom\tstart\tend"));
        let mut starts: Vec<u64> = lines
            .map(|l| l.split('\t').nth(1).unwrap().parse().unwrap())
            .collect();
        starts.sort();
        let expected: Vec<u64> = (0..50).step_by(2).map(|i| i * 10 + 2).collect();
        assert_eq!(starts, expected);
        assert!(!partial_path(&hits_path).exists());
    }

    #[rstest]
    fn test_bad_record_leaves_partial_file(pattern: Pattern) {
        let dir = tempdir().unwrap();
        let hits_path = dir.path().join("hits.tsv");
        let mut broken = record("chr1", 0, "ACGT");
        broken.hyp_scores.pop();
        let records = vec![Ok(record("chr1", 0, "CAGT")), Ok(broken)];

        let result = scan_contributions(&[pattern], records.into_iter(), &hits_path, 3);
        assert!(result.is_err());
        assert!(!hits_path.exists());
        assert!(partial_path(&hits_path).exists());
    }

    #[rstest]
    fn test_mismatched_pattern_stops_scan_before_writing(mut pattern: Pattern) {
        pattern.cwm.push([0.0, 1.0, 0.0, 0.0]);
        pattern.pssm.truncate(1);
        pattern.seq_match_cutoff = Some(1.0);
        pattern.contrib_match_cutoff = None;
        pattern.contrib_magnitude_cutoff = None;
        let dir = tempdir().unwrap();
        let hits_path = dir.path().join("hits.tsv");
        let records = vec![Ok(record("chr1", 0, "ACCCCC"))];

        let result = scan_contributions(&[pattern], records.into_iter(), &hits_path, 3);
        assert!(matches!(
            result,
            Err(ScanError::Pattern(PatternError::ShapeMismatch { .. }))
        ));
        assert!(!hits_path.exists());
        assert!(!partial_path(&hits_path).exists());
    }

    #[rstest]
    fn test_zero_width_pattern_stops_scan(mut pattern: Pattern) {
        pattern.cwm.clear();
        pattern.pssm.clear();
        let dir = tempdir().unwrap();
        let hits_path = dir.path().join("hits.tsv");
        let records = vec![Ok(record("chr1", 0, "ACGT"))];

        let result = scan_contributions(&[pattern], records.into_iter(), &hits_path, 3);
        assert!(matches!(
            result,
            Err(ScanError::Pattern(PatternError::ZeroWidth(_)))
        ));
    }

    #[rstest]
    fn test_gzipped_hits_are_complete(pattern: Pattern) {
        let dir = tempdir().unwrap();
        let hits_path = dir.path().join("hits.tsv.gz");
        let records: Vec<Result<ContribRecord, ScanError>> =
            (0..20).map(|i| Ok(record("chr3", i * 10, "CCAGCC"))).collect();

        let summary = scan_contributions(&[pattern], records.into_iter(), &hits_path, 3).unwrap();
        assert_eq!(summary.hits, 20);
        assert!(!partial_path(&hits_path).exists());

        let mut text = String::new();
        get_dynamic_reader(&hits_path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text.lines().count(), 21);
    }

    #[rstest]
    fn test_scan_needs_three_threads(pattern: Pattern) {
        let dir = tempdir().unwrap();
        let result = scan_contributions(&[pattern], std::iter::empty(), &dir.path().join("h.tsv"), 2);
        assert!(matches!(
            result,
            Err(ScanError::Config(ConfigError::TooFewThreads(2)))
        ));
    }
}
