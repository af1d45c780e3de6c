//! Online profiler.
//!
//! A [`Profiler`] owns two background threads:
//!
//! - `tsp-ingest` drains the bounded input queue into the [`Buffer`] and runs
//!   one discretization cycle every `buffersize` accepted samples, feeding the
//!   resulting states into the root counter, the period tree and the phase
//!   detector.
//! - `tsp-output` (optional) hands a fresh [`Profile`] to a callback at a
//!   fixed interval.
//!
//! Every component guards its own state; a cycle takes one lock at a time.

pub mod buffer;
pub mod counter;
pub mod discretizer;
pub mod period;
pub mod phase;
pub mod rescale;

pub use buffer::{Buffer, MetricBuffer};
pub use counter::Counter;
pub use discretizer::Discretizer;
pub use period::{advance_path, Period, PeriodChange};
pub use phase::Phase;
pub use rescale::{change_dimension, Dimension, Rescaled};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};
use tsp_common::{Error, MetricState, Profile, Result, Sample, Settings, Stats};
use tsp_config::validate_settings;

use crate::logging::event_names;

/// Receives periodic profile snapshots.
pub type OutputCallback = Box<dyn Fn(Profile) + Send + 'static>;

struct Shared {
    settings: Settings,
    buffer: Buffer,
    discretizer: Discretizer,
    root: Mutex<Counter>,
    period: Period,
    phase: Phase,
    current: Mutex<Vec<MetricState>>,
    cycles: AtomicU64,
    accepted: AtomicU64,
}

impl Shared {
    fn new(settings: Settings) -> Self {
        Self {
            buffer: Buffer::new(&settings),
            discretizer: Discretizer::new(settings.states),
            root: Mutex::new(Counter::from_settings(&settings)),
            period: Period::new(&settings),
            phase: Phase::new(&settings),
            current: Mutex::new(Vec::new()),
            cycles: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            settings,
        }
    }

    fn run_cycle(&self) {
        let buffers = self.buffer.reset();
        let batch = self.discretizer.discretize(&buffers);
        if batch.is_empty() {
            debug!(
                event = event_names::CYCLE_EMPTY,
                buffers = buffers.len(),
                "no metric produced a state"
            );
            return;
        }

        let stats = {
            let mut root = self.root.lock().unwrap_or_else(PoisonError::into_inner);
            root.count(&batch);
            root.all_stats()
        };
        self.period.count(&batch);
        self.phase.count(&batch);

        for (metric, s) in &stats {
            self.buffer.set_reference(metric, s.avg, s.stddev);
        }
        let metrics = batch.len();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = batch;

        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            event = event_names::CYCLE_COMPLETED,
            cycle,
            metrics,
            "discretization cycle completed"
        );
    }

    fn profile(&self) -> Profile {
        let root_tx = self
            .root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_tx();
        Profile {
            name: self.settings.name.clone(),
            root_tx,
            period_tree: self.period.tree(),
            phases: self.phase.phases_tx(),
            settings: self.settings.clone(),
        }
    }
}

fn ingest_loop(shared: &Shared, input: Receiver<Sample>) {
    info!(
        event = event_names::INGEST_STARTED,
        name = %shared.settings.name,
        buffer_size = shared.settings.buffer_size,
        states = shared.settings.states,
        "profiler ingestion started"
    );

    let mut pending = 0usize;
    // ends once every sender is gone and the queue is drained
    for sample in input {
        if shared.buffer.add(&sample) == 0 {
            debug!(
                event = event_names::INGEST_REJECTED,
                metrics = sample.metrics.len(),
                "sample carried no accepted value"
            );
            continue;
        }
        shared.accepted.fetch_add(1, Ordering::SeqCst);
        pending += 1;
        if pending >= shared.settings.buffer_size {
            pending = 0;
            shared.run_cycle();
        }
    }

    info!(
        event = event_names::INGEST_STOPPED,
        accepted = shared.accepted.load(Ordering::SeqCst),
        cycles = shared.cycles.load(Ordering::SeqCst),
        "profiler ingestion stopped"
    );
}

fn output_loop(shared: &Shared, interval: Duration, stop: Receiver<()>, callback: OutputCallback) {
    info!(
        event = event_names::OUTPUT_STARTED,
        interval_ms = interval.as_millis() as u64,
        "profile output started"
    );
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let profile = shared.profile();
                debug!(
                    event = event_names::OUTPUT_TICK,
                    cycles = shared.cycles.load(Ordering::SeqCst),
                    "emitting profile"
                );
                callback(profile);
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!(event = event_names::OUTPUT_STOPPED, "profile output stopped");
}

/// Online Markov-chain profiler over a stream of [`Sample`]s.
pub struct Profiler {
    shared: Arc<Shared>,
    input: Mutex<Option<SyncSender<Sample>>>,
    stop: Mutex<Option<Sender<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    terminated: AtomicBool,
}

impl Profiler {
    /// Validate `settings` and start ingesting. Profiles are pulled with
    /// [`Profiler::get`].
    pub fn new(settings: Settings) -> Result<Self> {
        Self::start(settings, None)
    }

    /// Like [`Profiler::new`], additionally pushing a profile to `callback`
    /// every `interval`. A zero interval disables the output thread.
    pub fn with_output<F>(mut settings: Settings, interval: Duration, callback: F) -> Result<Self>
    where
        F: Fn(Profile) + Send + 'static,
    {
        settings.output_interval = Some(interval);
        Self::start(settings, Some(Box::new(callback)))
    }

    fn start(settings: Settings, callback: Option<OutputCallback>) -> Result<Self> {
        validate_settings(&settings)?;

        let (input_tx, input_rx) = mpsc::sync_channel(settings.input_capacity);
        let interval = settings.output_interval.filter(|i| !i.is_zero());
        let shared = Arc::new(Shared::new(settings));

        let ingest_shared = Arc::clone(&shared);
        let ingest = thread::Builder::new()
            .name("tsp-ingest".to_string())
            .spawn(move || ingest_loop(&ingest_shared, input_rx))
            .map_err(|e| Error::WorkerSpawn(format!("ingestion thread: {}", e)))?;

        let profiler = Self {
            shared,
            input: Mutex::new(Some(input_tx)),
            stop: Mutex::new(None),
            workers: Mutex::new(vec![ingest]),
            terminated: AtomicBool::new(false),
        };

        if let (Some(interval), Some(callback)) = (interval, callback) {
            let (stop_tx, stop_rx) = mpsc::channel();
            let output_shared = Arc::clone(&profiler.shared);
            let output = thread::Builder::new()
                .name("tsp-output".to_string())
                .spawn(move || output_loop(&output_shared, interval, stop_rx, callback))
                .map_err(|e| Error::WorkerSpawn(format!("output thread: {}", e)))?;
            *profiler.stop.lock().unwrap_or_else(PoisonError::into_inner) = Some(stop_tx);
            profiler
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(output);
        }

        Ok(profiler)
    }

    /// Queue a sample. Blocks while the input queue is full.
    pub fn put(&self, sample: Sample) -> Result<()> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(Error::ProfilerTerminated);
        }
        let sender = self
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::ProfilerTerminated)?;
        sender.send(sample).map_err(|_| Error::ProfilerTerminated)
    }

    /// Snapshot of everything learned so far.
    pub fn get(&self) -> Profile {
        self.shared.profile()
    }

    /// States of the most recent cycle.
    pub fn get_current_state(&self) -> Vec<MetricState> {
        self.shared
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Running statistics of every metric.
    pub fn get_current_stats(&self) -> BTreeMap<String, Stats> {
        self.shared
            .root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .all_stats()
            .into_iter()
            .collect()
    }

    pub fn get_current_phase(&self) -> usize {
        self.shared.phase.current_phase()
    }

    pub fn get_current_period_path(&self) -> Vec<usize> {
        self.shared.period.current_path()
    }

    pub fn get_period_changes(&self) -> Vec<PeriodChange> {
        self.shared.period.recent_changes()
    }

    /// Completed discretization cycles.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Stop accepting samples, process what is queued and join the
    /// background threads. Calling it again does nothing.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }

        drop(self.input.lock().unwrap_or_else(PoisonError::into_inner).take());
        drop(self.stop.lock().unwrap_or_else(PoisonError::into_inner).take());

        let workers: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for worker in workers {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                warn!(
                    event = event_names::PROFILER_TERMINATED,
                    thread = %name,
                    "background thread panicked"
                );
            }
        }

        info!(
            event = event_names::PROFILER_TERMINATED,
            cycles = self.cycles(),
            "profiler terminated"
        );
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for Profiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiler")
            .field("name", &self.shared.settings.name)
            .field("cycles", &self.cycles())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
