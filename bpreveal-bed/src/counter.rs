use std::fmt::Debug;

use indicatif::ProgressBar;

use bpreveal_core::dispatch::{Dispatcher, DispatcherOptions, QueryWorker};
use bpreveal_core::models::Region;

use crate::coverage::{BigWigTrack, SignalTrack, coverage};
use crate::errors::CoverageError;

/// Sums signal over regions with tracks it opened itself.
pub struct CountWorker<T: SignalTrack> {
    tracks: Vec<T>,
}

impl<T: SignalTrack> QueryWorker for CountWorker<T> {
    type Query = Region;
    type Output = f64;
    type Error = CoverageError;

    fn process(&mut self, region: Region) -> Result<f64, CoverageError> {
        coverage(&region, &mut self.tracks)
    }
}

///
/// Queues up [`coverage`] jobs and runs them on a pool of workers, each
/// holding its own open tracks.
///
/// Results are **not** returned in submission order; every result comes
/// with the index given to [`ParallelCounter::add_query`].
///
pub struct ParallelCounter<I> {
    pool: Dispatcher<Region, f64, I>,
}

impl<I: Debug + Send + 'static> ParallelCounter<I> {
    /// One worker per thread, each opening every bigWig in `bigwig_names`.
    pub fn new(bigwig_names: Vec<String>, num_threads: usize) -> Result<Self, CoverageError> {
        Self::with_tracks(DispatcherOptions::new(num_threads), move |_| {
            bigwig_names
                .iter()
                .map(|name| BigWigTrack::open(name))
                .collect::<Result<Vec<_>, _>>()
        })
    }

    ///
    /// Build workers from any track source. `open_tracks` runs once on each
    /// worker thread.
    ///
    pub fn with_tracks<T, F>(options: DispatcherOptions, open_tracks: F) -> Result<Self, CoverageError>
    where
        T: SignalTrack + 'static,
        F: Fn(usize) -> Result<Vec<T>, CoverageError> + Send + Sync + 'static,
    {
        let pool = Dispatcher::spawn(options, move |worker_id| {
            open_tracks(worker_id).map(|tracks| CountWorker { tracks })
        })?;
        Ok(ParallelCounter { pool })
    }

    /// Add a region to the task list. `idx` comes back with its result.
    pub fn add_query(&mut self, region: Region, idx: I) -> Result<(), CoverageError> {
        Ok(self.pool.submit(region, idx)?)
    }

    /// Results finished so far, without blocking.
    pub fn poll_results(&mut self) -> Result<Vec<(f64, I)>, CoverageError> {
        Ok(self.pool.poll_results()?)
    }

    /// Next `(counts, idx)`, blocking; `None` when nothing is in flight.
    pub fn get_result(&mut self) -> Result<Option<(f64, I)>, CoverageError> {
        Ok(self.pool.result()?)
    }

    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Close the workers, handing back anything not yet retrieved.
    pub fn done(self) -> Result<Vec<(f64, I)>, CoverageError> {
        Ok(self.pool.shutdown()?)
    }
}

///
/// Count every region on `num_threads` workers and return the totals in
/// the order of `regions`. Regions whose query failed are `None`.
///
pub fn count_regions<T, F>(
    regions: &[Region],
    options: DispatcherOptions,
    open_tracks: F,
) -> Result<Vec<Option<f64>>, CoverageError>
where
    T: SignalTrack + 'static,
    F: Fn(usize) -> Result<Vec<T>, CoverageError> + Send + Sync + 'static,
{
    let mut counter = ParallelCounter::with_tracks(options, open_tracks)?;
    let mut totals = vec![None; regions.len()];
    let bar = ProgressBar::new(regions.len() as u64);

    for (idx, region) in regions.iter().enumerate() {
        counter.add_query(region.clone(), idx)?;
        for (counts, done_idx) in counter.poll_results()? {
            totals[done_idx] = Some(counts);
            bar.inc(1);
        }
    }
    while let Some((counts, done_idx)) = counter.get_result()? {
        totals[done_idx] = Some(counts);
        bar.inc(1);
    }
    for (counts, done_idx) in counter.done()? {
        totals[done_idx] = Some(counts);
    }
    bar.finish_and_clear();

    Ok(totals)
}
