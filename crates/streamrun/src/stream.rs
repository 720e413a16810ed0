//! # Stream Session
//!
//! A stream owns the guarded run handle for its session and a pool of
//! worker threads that stamp submitted records with the bound run.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ─> spawn_workers() ─> init_run(m) ─> submit()* ─> shutdown()
//!                 │                                          │
//!                 └─ records that reach a worker before ─────┘
//!                    init_run are rejected, not retried
//! ```
//!
//! Only `init_run` binds the handle. Workers only read it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use streamrun_core::{GuardedRunHandle, RunMetadata};

use crate::config::StreamConfig;
use crate::error::{ConfigError, StreamError, StreamResult};
use crate::record::{Record, StampedRecord};

/// Counters for a stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Records stamped and emitted.
    pub processed: u64,
    /// Records a worker received before the run was bound.
    pub rejected_unbound: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    rejected_unbound: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> StreamStats {
        StreamStats {
            processed: self.processed.load(Ordering::Acquire),
            rejected_unbound: self.rejected_unbound.load(Ordering::Acquire),
        }
    }
}

/// A stream session bound to a single run.
///
/// ## Usage
///
/// ```rust
/// use streamrun::{Record, Stream, StreamConfig};
/// use streamrun::core::{RunId, RunMetadata};
///
/// let mut stream = Stream::new(StreamConfig::default()).unwrap();
/// stream.init_run(RunMetadata::new(RunId::new("run-1").unwrap())).unwrap();
/// stream.spawn_workers().unwrap();
///
/// let outputs = stream.outputs();
/// stream.submit(Record::new(0, "loss=1.0")).unwrap();
/// let stats = stream.shutdown().unwrap();
///
/// assert_eq!(stats.processed, 1);
/// assert_eq!(outputs.recv().unwrap().run_id.as_str(), "run-1");
/// ```
pub struct Stream {
    config: StreamConfig,
    /// The session's run. Bound once by `init_run`.
    run: Arc<GuardedRunHandle>,
    /// `None` once the stream is closed.
    input_tx: Option<Sender<Record>>,
    input_rx: Receiver<Record>,
    output_tx: Sender<StampedRecord>,
    output_rx: Receiver<StampedRecord>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl Stream {
    /// Creates a stream with an unbound run and no workers.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `config` fails validation.
    pub fn new(config: StreamConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (input_tx, input_rx) = bounded(config.queue_capacity);
        // Unbounded so a slow consumer can never wedge shutdown.
        let (output_tx, output_rx) = unbounded();

        Ok(Self {
            config,
            run: Arc::new(GuardedRunHandle::new()),
            input_tx: Some(input_tx),
            input_rx,
            output_tx,
            output_rx,
            workers: Vec::new(),
            counters: Arc::new(Counters::default()),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Returns a shared reference to the run handle, for other readers.
    #[must_use]
    pub fn run_handle(&self) -> Arc<GuardedRunHandle> {
        Arc::clone(&self.run)
    }

    /// Binds the session's run. Call exactly once.
    ///
    /// # Errors
    ///
    /// [`StreamError::RunState`] if a run is already bound; the first run
    /// stays in place.
    pub fn init_run(&self, metadata: impl Into<Arc<RunMetadata>>) -> StreamResult<()> {
        let metadata = metadata.into();
        let run_id = metadata.id.clone();
        let stream_id = &self.config.stream_id;

        if let Err(err) = self.run.bind(metadata) {
            tracing::error!("Stream {stream_id}: refusing to bind run {run_id}: {err}");
            return Err(err.into());
        }

        tracing::info!("Stream {stream_id}: run {run_id} initialized");
        Ok(())
    }

    /// Returns the bound run.
    ///
    /// # Errors
    ///
    /// [`StreamError::RunState`] if `init_run` has not completed.
    pub fn run_metadata(&self) -> StreamResult<Arc<RunMetadata>> {
        Ok(self.run.get()?)
    }

    /// Starts `config.workers` worker threads.
    ///
    /// # Errors
    ///
    /// [`StreamError::WorkersAlreadyRunning`] on a second call,
    /// [`StreamError::Closed`] after [`close`](Self::close),
    /// [`StreamError::Spawn`] if the OS refuses a thread. Workers started
    /// before the failure keep running and are joined on shutdown.
    pub fn spawn_workers(&mut self) -> StreamResult<()> {
        if !self.workers.is_empty() {
            return Err(StreamError::WorkersAlreadyRunning);
        }
        if self.input_tx.is_none() {
            return Err(StreamError::Closed);
        }

        for index in 0..self.config.workers {
            let worker = Worker {
                index,
                stream_id: self.config.stream_id.clone(),
                run: Arc::clone(&self.run),
                input: self.input_rx.clone(),
                output: self.output_tx.clone(),
                counters: Arc::clone(&self.counters),
            };
            let handle = thread::Builder::new()
                .name(format!("{}-worker-{index}", self.config.stream_id))
                .spawn(move || worker.run())
                .map_err(|err| StreamError::Spawn {
                    worker: index,
                    reason: err.to_string(),
                })?;
            self.workers.push(handle);
        }

        Ok(())
    }

    /// Queues a record.
    ///
    /// With workers running this blocks while the input queue is full.
    /// Before [`spawn_workers`](Self::spawn_workers) nothing drains the
    /// queue, so a full queue is an error instead.
    ///
    /// # Errors
    ///
    /// [`StreamError::Closed`] once the stream is closed,
    /// [`StreamError::NotStarted`] if the queue is full and no workers are
    /// running.
    pub fn submit(&self, record: Record) -> StreamResult<()> {
        let input = self.input_tx.as_ref().ok_or(StreamError::Closed)?;

        if self.workers.is_empty() {
            return input.try_send(record).map_err(|err| match err {
                TrySendError::Full(_) => StreamError::NotStarted,
                TrySendError::Disconnected(_) => StreamError::Closed,
            });
        }
        input.send(record).map_err(|_| StreamError::Closed)
    }

    /// Returns a receiver for stamped records.
    ///
    /// It disconnects once the stream has shut down and all its records
    /// have been drained.
    #[must_use]
    pub fn outputs(&self) -> Receiver<StampedRecord> {
        self.output_rx.clone()
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.counters.snapshot()
    }

    /// Stops accepting records. Queued records are still processed.
    pub fn close(&mut self) {
        self.input_tx = None;
    }

    /// Closes the stream, waits for the workers to drain the queue and
    /// returns the final counters.
    ///
    /// # Errors
    ///
    /// [`StreamError::WorkerPanicked`] with the index of the first worker
    /// that panicked.
    pub fn shutdown(mut self) -> StreamResult<StreamStats> {
        if let Some(index) = self.join_workers() {
            return Err(StreamError::WorkerPanicked(index));
        }
        Ok(self.stats())
    }

    /// Closes the input and joins every worker. Returns the first panicked
    /// worker index.
    fn join_workers(&mut self) -> Option<usize> {
        self.close();

        let mut panicked = None;
        for (index, worker) in self.workers.drain(..).enumerate() {
            if worker.join().is_err() && panicked.is_none() {
                panicked = Some(index);
            }
        }
        panicked
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        let _ = self.join_workers();
    }
}

/// State moved into one worker thread.
struct Worker {
    index: usize,
    stream_id: String,
    run: Arc<GuardedRunHandle>,
    input: Receiver<Record>,
    output: Sender<StampedRecord>,
    counters: Arc<Counters>,
}

impl Worker {
    fn run(self) {
        let Self {
            index,
            stream_id,
            run,
            input,
            output,
            counters,
        } = self;
        tracing::debug!("Stream {stream_id}: worker {index} started");

        // Ends once every sender is gone and the queue is empty.
        for record in &input {
            match run.get() {
                Ok(metadata) => {
                    let stamped = record.stamp(&metadata);
                    counters.processed.fetch_add(1, Ordering::AcqRel);
                    if output.send(stamped).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        "Stream {stream_id}: worker {index} rejected record at step {}: {err}",
                        record.step
                    );
                    counters.rejected_unbound.fetch_add(1, Ordering::AcqRel);
                }
            }
        }

        tracing::debug!("Stream {stream_id}: worker {index} stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamrun_core::{AlreadyBoundError, NotBoundError, RunId, RunStateError};

    fn config(workers: usize) -> StreamConfig {
        StreamConfig {
            stream_id: "test".to_owned(),
            workers,
            queue_capacity: 64,
            run: None,
        }
    }

    fn run(id: &str) -> RunMetadata {
        RunMetadata::new(RunId::new(id).unwrap())
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(matches!(Stream::new(config(0)), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_run_metadata_before_init() {
        let stream = Stream::new(config(1)).unwrap();
        assert_eq!(
            stream.run_metadata().unwrap_err(),
            StreamError::RunState(RunStateError::NotBound(NotBoundError))
        );
    }

    #[test]
    fn test_init_run_twice_keeps_first() {
        let stream = Stream::new(config(1)).unwrap();
        stream.init_run(run("run-1")).unwrap();

        assert_eq!(
            stream.init_run(run("run-2")).unwrap_err(),
            StreamError::RunState(RunStateError::AlreadyBound(AlreadyBoundError))
        );
        assert_eq!(stream.run_metadata().unwrap().id.as_str(), "run-1");
    }

    #[test]
    fn test_run_handle_is_shared() {
        let stream = Stream::new(config(1)).unwrap();
        let handle = stream.run_handle();
        assert!(!handle.is_bound());

        stream.init_run(run("run-1")).unwrap();
        assert!(Arc::ptr_eq(&handle.get().unwrap(), &stream.run_metadata().unwrap()));
    }

    #[test]
    fn test_spawn_twice_fails() {
        let mut stream = Stream::new(config(2)).unwrap();
        stream.spawn_workers().unwrap();
        assert_eq!(stream.spawn_workers(), Err(StreamError::WorkersAlreadyRunning));
    }

    #[test]
    fn test_submit_after_close_fails() {
        let mut stream = Stream::new(config(1)).unwrap();
        stream.close();
        assert_eq!(stream.submit(Record::new(0, "x")), Err(StreamError::Closed));
        assert_eq!(stream.spawn_workers(), Err(StreamError::Closed));
    }

    #[test]
    fn test_records_before_bind_are_rejected() {
        let mut stream = Stream::new(config(1)).unwrap();
        stream.spawn_workers().unwrap();
        for step in 0..3 {
            stream.submit(Record::new(step, "early")).unwrap();
        }

        let outputs = stream.outputs();
        let stats = stream.shutdown().unwrap();

        assert_eq!(stats, StreamStats { processed: 0, rejected_unbound: 3 });
        assert!(outputs.try_recv().is_err());
    }

    #[test]
    fn test_records_after_bind_are_stamped() {
        let mut stream = Stream::new(config(3)).unwrap();
        stream.init_run(run("run-1").with_project("vision")).unwrap();
        stream.spawn_workers().unwrap();

        let outputs = stream.outputs();
        for step in 0..20 {
            stream.submit(Record::new(step, format!("step={step}"))).unwrap();
        }
        let stats = stream.shutdown().unwrap();

        assert_eq!(stats, StreamStats { processed: 20, rejected_unbound: 0 });

        let mut steps: Vec<u64> = outputs
            .iter()
            .map(|stamped| {
                assert_eq!(stamped.run_id.as_str(), "run-1");
                assert_eq!(stamped.project.as_deref(), Some("vision"));
                stamped.step
            })
            .collect();
        steps.sort_unstable();
        assert_eq!(steps, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_submit_without_workers_fails_when_queue_full() {
        let mut small = config(1);
        small.queue_capacity = 2;
        let mut stream = Stream::new(small).unwrap();
        stream.init_run(run("run-1")).unwrap();

        stream.submit(Record::new(0, "a")).unwrap();
        stream.submit(Record::new(1, "b")).unwrap();
        assert_eq!(stream.submit(Record::new(2, "c")), Err(StreamError::NotStarted));

        // The queued records survive and drain once workers start.
        stream.spawn_workers().unwrap();
        let stats = stream.shutdown().unwrap();
        assert_eq!(stats.processed, 2);
    }

    #[test]
    fn test_worker_names_follow_stream_id() {
        let mut stream = Stream::new(config(2)).unwrap();
        stream.spawn_workers().unwrap();
        let names: Vec<_> = stream
            .workers
            .iter()
            .map(|w| w.thread().name().map(str::to_owned))
            .collect();
        assert_eq!(
            names,
            vec![Some("test-worker-0".to_owned()), Some("test-worker-1".to_owned())]
        );
    }

    #[test]
    fn test_shutdown_reports_panicked_worker() {
        let mut stream = Stream::new(config(1)).unwrap();
        stream.spawn_workers().unwrap();
        let panicking: JoinHandle<()> = thread::spawn(|| panic!("worker blew up"));
        stream.workers.push(panicking);

        assert_eq!(stream.shutdown(), Err(StreamError::WorkerPanicked(1)));
    }

    #[test]
    fn test_queued_records_drain_when_workers_start_late() {
        let mut stream = Stream::new(config(2)).unwrap();
        stream.init_run(run("run-1")).unwrap();
        for step in 0..5 {
            stream.submit(Record::new(step, "queued")).unwrap();
        }
        stream.spawn_workers().unwrap();

        let stats = stream.shutdown().unwrap();
        assert_eq!(stats.processed, 5);
    }
}
