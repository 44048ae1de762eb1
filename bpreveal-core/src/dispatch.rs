//! A fixed pool of worker threads answering indexed queries.
//!
//! Every query travels with an opaque index chosen by the caller. Results
//! come back as `(result, index)` pairs in *completion* order, never in
//! submission order, so callers that care about order must reassemble it
//! from the indices.
//!
//! Each worker builds its own state (open files, pattern tables, ...) on its
//! own thread through the factory passed to [`Dispatcher::spawn`]. Workers
//! pull from one shared bounded input queue and push to one shared output
//! queue. Shutdown puts one sentinel per worker on the input queue and then
//! joins every worker.

use std::collections::VecDeque;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{
    Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError, bounded, unbounded,
};
use log::{debug, warn};

use crate::errors::DispatchError;

/// How long a submit or a blocking retrieval may wait on a queue.
pub const QUEUE_TIMEOUT: Duration = Duration::from_secs(240);

/// Default number of queries that may wait in the input queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// One unit of per-query work. A worker is created on its own thread and
/// owns everything it touches, so no locking is needed inside `process`.
pub trait QueryWorker {
    type Query: Send + 'static;
    type Output: Send + 'static;
    type Error: Display;

    fn process(&mut self, query: Self::Query) -> Result<Self::Output, Self::Error>;
}

/// What a worker does when a single query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and contribute no result for that query.
    #[default]
    Lenient,
    /// Report the failure to the caller and stop the whole pool.
    Strict,
}

#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub timeout: Duration,
    pub policy: FailurePolicy,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        DispatcherOptions {
            num_workers: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            timeout: QUEUE_TIMEOUT,
            policy: FailurePolicy::Lenient,
        }
    }
}

impl DispatcherOptions {
    pub fn new(num_workers: usize) -> Self {
        DispatcherOptions {
            num_workers,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

enum WorkerMessage<Q, I> {
    Query(Q, I),
    Shutdown,
}

enum WorkerEvent<R, I> {
    Done(R, I),
    Dropped(I),
    Failed { index: I, message: String },
    SetupFailed(String),
}

pub struct Dispatcher<Q, R, I> {
    input: Option<Sender<WorkerMessage<Q, I>>>,
    output: Receiver<WorkerEvent<R, I>>,
    workers: Vec<JoinHandle<()>>,
    buffer: VecDeque<(R, I)>,
    in_flight: usize,
    abort: Arc<AtomicBool>,
    timeout: Duration,
}

impl<Q, R, I> Dispatcher<Q, R, I>
where
    Q: Send + 'static,
    R: Send + 'static,
    I: Debug + Send + 'static,
{
    ///
    /// Start `options.num_workers` threads. `make_worker` is called once on
    /// each worker thread with the worker's number.
    ///
    pub fn spawn<W, F, E>(options: DispatcherOptions, make_worker: F) -> Result<Self, DispatchError>
    where
        W: QueryWorker<Query = Q, Output = R>,
        F: Fn(usize) -> Result<W, E> + Send + Sync + 'static,
        E: Display,
    {
        if options.num_workers == 0 {
            return Err(DispatchError::WorkerSetup(
                "a dispatcher needs at least one worker".to_string(),
            ));
        }

        let (input_tx, input_rx) = bounded(options.queue_capacity.max(1));
        let (output_tx, output_rx) = unbounded();
        let abort = Arc::new(AtomicBool::new(false));
        let make_worker = Arc::new(make_worker);

        let mut workers = Vec::with_capacity(options.num_workers);
        for worker_id in 0..options.num_workers {
            let input_rx = input_rx.clone();
            let output_tx = output_tx.clone();
            let abort = Arc::clone(&abort);
            let make_worker = Arc::clone(&make_worker);
            let policy = options.policy;

            let handle = thread::Builder::new()
                .name(format!("bpreveal-worker-{}", worker_id))
                .spawn(move || match make_worker(worker_id) {
                    Ok(worker) => {
                        worker_loop(worker, worker_id, input_rx, output_tx, &abort, policy)
                    }
                    Err(err) => {
                        let _ = output_tx
                            .send(WorkerEvent::SetupFailed(format!("worker {}: {}", worker_id, err)));
                    }
                })
                .map_err(|e| DispatchError::WorkerSetup(e.to_string()))?;
            workers.push(handle);
        }

        Ok(Dispatcher {
            input: Some(input_tx),
            output: output_rx,
            workers,
            buffer: VecDeque::new(),
            in_flight: 0,
            abort,
            timeout: options.timeout,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Queries submitted whose result has not been retrieved or dropped yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    ///
    /// Queue a query. Blocks while the input queue is full, failing with
    /// [`DispatchError::DispatchTimeout`] if no space frees up in time.
    /// Any results that are already done are moved into the local buffer.
    ///
    pub fn submit(&mut self, query: Q, index: I) -> Result<(), DispatchError> {
        let input = self.input.as_ref().ok_or(DispatchError::Disconnected)?;
        match input.send_timeout(WorkerMessage::Query(query, index), self.timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                return Err(DispatchError::DispatchTimeout(self.timeout));
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                // every worker is gone; surface the reason if one was sent
                self.drain_ready()?;
                return Err(DispatchError::Disconnected);
            }
        }
        self.in_flight += 1;
        self.drain_ready()
    }

    /// Every result available right now, without blocking.
    pub fn poll_results(&mut self) -> Result<Vec<(R, I)>, DispatchError> {
        self.drain_ready()?;
        Ok(self.buffer.drain(..).collect())
    }

    ///
    /// The next available result, blocking until one arrives. Returns
    /// `None` once nothing is in flight any more.
    ///
    pub fn result(&mut self) -> Result<Option<(R, I)>, DispatchError> {
        loop {
            if let Some(done) = self.buffer.pop_front() {
                return Ok(Some(done));
            }
            if self.in_flight == 0 {
                return Ok(None);
            }
            match self.output.recv_timeout(self.timeout) {
                Ok(event) => self.absorb(event)?,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(DispatchError::DispatchTimeout(self.timeout));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(DispatchError::Disconnected),
            }
        }
    }

    ///
    /// Stop the pool: one sentinel per worker, then join them all. Results
    /// that finished but were never retrieved are returned.
    ///
    pub fn shutdown(mut self) -> Result<Vec<(R, I)>, DispatchError> {
        // a halted pool has already dropped its input queue
        if let Some(input) = self.input.take() {
            for _ in 0..self.workers.len() {
                match input.send_timeout(WorkerMessage::Shutdown, self.timeout) {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => {
                        return Err(DispatchError::DispatchTimeout(self.timeout));
                    }
                    // workers that already exited need no sentinel
                    Err(SendTimeoutError::Disconnected(_)) => break,
                }
            }
        }

        let mut panicked = false;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                panicked = true;
            }
        }
        debug!("All workers joined");

        let mut failure = None;
        while let Ok(event) = self.output.try_recv() {
            if let Err(err) = self.absorb(event) {
                failure.get_or_insert(err);
            }
        }

        if panicked {
            return Err(DispatchError::WorkerPanicked);
        }
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(self.buffer.drain(..).collect())
    }

    fn drain_ready(&mut self) -> Result<(), DispatchError> {
        loop {
            match self.output.try_recv() {
                Ok(event) => self.absorb(event)?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }

    fn absorb(&mut self, event: WorkerEvent<R, I>) -> Result<(), DispatchError> {
        match event {
            WorkerEvent::Done(result, index) => {
                self.in_flight -= 1;
                self.buffer.push_back((result, index));
                Ok(())
            }
            WorkerEvent::Dropped(_) => {
                self.in_flight -= 1;
                Ok(())
            }
            WorkerEvent::Failed { index, message } => {
                self.in_flight -= 1;
                self.halt();
                Err(DispatchError::WorkerFailed {
                    index: format!("{:?}", index),
                    message,
                })
            }
            WorkerEvent::SetupFailed(message) => {
                self.halt();
                Err(DispatchError::WorkerSetup(message))
            }
        }
    }

    /// Tell every worker to stop before its next query.
    fn halt(&mut self) {
        self.abort.store(true, Ordering::SeqCst);
        self.input = None;
    }
}

fn worker_loop<W, I>(
    mut worker: W,
    worker_id: usize,
    input: Receiver<WorkerMessage<W::Query, I>>,
    output: Sender<WorkerEvent<W::Output, I>>,
    abort: &AtomicBool,
    policy: FailurePolicy,
) where
    W: QueryWorker,
    I: Debug,
{
    while let Ok(WorkerMessage::Query(query, index)) = input.recv() {
        if abort.load(Ordering::SeqCst) {
            break;
        }
        let event = match worker.process(query) {
            Ok(result) => WorkerEvent::Done(result, index),
            Err(err) => match policy {
                FailurePolicy::Lenient => {
                    warn!("Worker {} dropped query {:?}: {}", worker_id, index, err);
                    WorkerEvent::Dropped(index)
                }
                FailurePolicy::Strict => {
                    let _ = output.send(WorkerEvent::Failed {
                        index,
                        message: err.to_string(),
                    });
                    break;
                }
            },
        };
        if output.send(event).is_err() {
            break;
        }
    }
    debug!("Worker {} exiting", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    /// Squares its input after sleeping for the requested time.
    struct SquareWorker;

    impl QueryWorker for SquareWorker {
        type Query = (u64, u64);
        type Output = u64;
        type Error = String;

        fn process(&mut self, query: (u64, u64)) -> Result<u64, String> {
            let (value, sleep_ms) = query;
            thread::sleep(Duration::from_millis(sleep_ms));
            if value == u64::MAX {
                return Err("refusing to square u64::MAX".to_string());
            }
            Ok(value * value)
        }
    }

    fn square_pool(
        num_workers: usize,
        policy: FailurePolicy,
    ) -> Dispatcher<(u64, u64), u64, usize> {
        let options = DispatcherOptions::new(num_workers)
            .with_timeout(Duration::from_secs(10))
            .with_policy(policy);
        Dispatcher::spawn(options, |_| Ok::<_, String>(SquareWorker)).unwrap()
    }

    #[rstest]
    fn test_every_index_comes_back_once() {
        let mut pool = square_pool(4, FailurePolicy::Lenient);
        let mut seen = Vec::new();

        for index in 0..200usize {
            pool.submit((index as u64, 0), index).unwrap();
            // interleave draining with submission, as callers do
            if index % 7 == 0 {
                for (value, idx) in pool.poll_results().unwrap() {
                    assert_eq!(value, (idx * idx) as u64);
                    seen.push(idx);
                }
            }
        }
        for _ in 0..50 {
            if let Some((_, idx)) = pool.result().unwrap() {
                seen.push(idx);
            }
        }
        for (_, idx) in pool.shutdown().unwrap() {
            seen.push(idx);
        }

        seen.sort();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_results_arrive_in_completion_order() {
        // a single worker drains its queue in order, so this needs one worker per query
        // with the earliest query being the slowest
        let mut pool = square_pool(3, FailurePolicy::Lenient);
        pool.submit((0, 600), 0).unwrap();
        pool.submit((1, 300), 1).unwrap();
        pool.submit((2, 10), 2).unwrap();

        let mut order = Vec::new();
        while let Some((_, idx)) = pool.result().unwrap() {
            order.push(idx);
        }
        assert_eq!(order, vec![2, 1, 0]);
        assert!(pool.shutdown().unwrap().is_empty());
    }

    #[rstest]
    fn test_lenient_drops_failed_query() {
        let mut pool = square_pool(2, FailurePolicy::Lenient);
        pool.submit((3, 0), 0).unwrap();
        pool.submit((u64::MAX, 0), 1).unwrap();
        pool.submit((4, 0), 2).unwrap();

        let mut got = Vec::new();
        while let Some((value, idx)) = pool.result().unwrap() {
            got.push((idx, value));
        }
        got.sort();
        assert_eq!(got, vec![(0, 9), (2, 16)]);
        assert_eq!(pool.in_flight(), 0);
        pool.shutdown().unwrap();
    }

    #[rstest]
    fn test_strict_propagates_failure() {
        let mut pool = square_pool(1, FailurePolicy::Strict);
        pool.submit((u64::MAX, 0), 7).unwrap();

        let err = loop {
            match pool.result() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("the failure was swallowed"),
                Err(err) => break err,
            }
        };
        assert!(matches!(err, DispatchError::WorkerFailed { ref index, .. } if index == "7"));
        // further submissions are refused once the pool has halted
        assert!(pool.submit((2, 0), 8).is_err());
        pool.shutdown().unwrap();
    }

    #[rstest]
    fn test_full_queue_times_out() {
        let options = DispatcherOptions::new(1)
            .with_queue_capacity(1)
            .with_timeout(Duration::from_millis(50));
        let mut pool: Dispatcher<(u64, u64), u64, usize> =
            Dispatcher::spawn(options, |_| Ok::<_, String>(SquareWorker)).unwrap();

        let mut timed_out = false;
        for index in 0..4 {
            if let Err(err) = pool.submit((1, 1_000), index) {
                assert!(matches!(err, DispatchError::DispatchTimeout(_)));
                timed_out = true;
                break;
            }
        }
        assert!(timed_out);
    }

    #[rstest]
    fn test_setup_failure_is_reported() {
        let options = DispatcherOptions::new(1).with_timeout(Duration::from_secs(5));
        let mut pool: Dispatcher<(u64, u64), u64, usize> = Dispatcher::spawn(options, |_| {
            Err::<SquareWorker, _>("cannot open track".to_string())
        })
        .unwrap();

        let err = match pool.submit((1, 0), 0) {
            Err(err) => err,
            Ok(()) => pool.result().unwrap_err(),
        };
        assert!(matches!(err, DispatchError::WorkerSetup(_)));
    }

    #[rstest]
    fn test_zero_workers_rejected() {
        let result: Result<Dispatcher<(u64, u64), u64, usize>, _> =
            Dispatcher::spawn(DispatcherOptions::new(0), |_| Ok::<_, String>(SquareWorker));
        assert!(result.is_err());
    }
}
