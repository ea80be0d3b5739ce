//! Buffered persistence engine.
//!
//! The engine decouples the feed thread from sink I/O. Producers push ticks into a
//! bounded queue without blocking; one background worker wakes up every flush
//! interval, drains whatever is queued and writes each trading tick to the sink with a
//! single `insert_one` call.
//!
//! Lifecycle: `Created → Initialized → Running → Stopping → Drained → Stopped`, with
//! `Failed` when `initialize` cannot set up the sink. A stopped engine can be started
//! again.
//!
//! Shutdown guarantee: `stop()` joins the worker and then drains the queue on the
//! calling thread, so every tick accepted by `enqueue` before `stop()` was called is
//! either written or explicitly discarded by the time it returns.
//!
//! The sink is moved into the worker on `start()` and handed back through the join
//! handle, so the worker and the final drain never touch it at the same time. An
//! insert that panics counts as a failed write for that record only. A sink
//! call that hangs blocks the worker (and therefore `stop()`); there is no per-write
//! timeout.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use log::{debug, error, info, warn};
use thiserror::Error;
use tick_common::config::{DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_QUEUE_CAPACITY};
use tick_common::{EngineConfig, RecorderError, Result, Tick};

use crate::destination::Destination;
use crate::document::TickDocument;
use crate::sink::{DocumentSink, SinkConnector, validate_config};

const WORKER_NAME: &str = "tick-persist";

/// Engine lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Initialized,
    Running,
    Stopping,
    Drained,
    Stopped,
    Failed,
}

/// Producer-side rejection. The tick is handed back so the caller can decide what to
/// do with it.
#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("queue is full")]
    Full(Tick),
    #[error("queue is disconnected")]
    Disconnected(Tick),
}

impl EnqueueError {
    /// Takes back the rejected tick.
    pub fn into_tick(self) -> Tick {
        match self {
            EnqueueError::Full(tick) | EnqueueError::Disconnected(tick) => tick,
        }
    }
}

impl From<EnqueueError> for RecorderError {
    fn from(err: EnqueueError) -> Self {
        match err {
            EnqueueError::Full(tick) => RecorderError::QueueFull(tick.instrument_id),
            EnqueueError::Disconnected(tick) => RecorderError::QueueDisconnected(tick.instrument_id),
        }
    }
}

/// Handle that pushes ticks into an engine's queue.
///
/// The queue keeps FIFO order per producer; with a single producer (the feed thread)
/// that is the order ticks are written in.
#[derive(Debug, Clone)]
pub struct TickProducer {
    tx: Sender<Tick>,
}

impl TickProducer {
    /// Stamps `record_time` and pushes the tick without blocking.
    pub fn enqueue(&self, mut tick: Tick) -> std::result::Result<(), EnqueueError> {
        tick.record_time = Some(Utc::now());
        self.tx.try_send(tick).map_err(|e| match e {
            TrySendError::Full(tick) => EnqueueError::Full(tick),
            TrySendError::Disconnected(tick) => EnqueueError::Disconnected(tick),
        })
    }

    /// Ticks waiting in the queue.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

#[derive(Debug, Default)]
struct Counters {
    written: AtomicU64,
    ignored: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

/// Per-outcome totals since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Ticks written to the sink.
    pub written: u64,
    /// Zero-volume ticks discarded.
    pub ignored: u64,
    /// Ticks discarded because of an invalid destination.
    pub rejected: u64,
    /// Ticks the sink failed to write, including inserts that panicked.
    pub failed: u64,
}

/// Consumer side: the queue receiver plus the sink.
struct Drainer {
    rx: Receiver<Tick>,
    sink: Box<dyn DocumentSink>,
    counters: Arc<Counters>,
}

impl Drainer {
    /// Processes everything currently queued and returns how many ticks were popped.
    fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(tick) = self.rx.try_recv() {
            self.process(tick);
            count += 1;
        }
        count
    }

    fn process(&mut self, tick: Tick) {
        if !tick.is_trading() {
            info!(
                "Ignore one tick! Inst:{},actionDate:{},actionTime:{},volume:{},marketVol:{},Turnover:{},mdTradingDay:{},mdUpdateTime:{}",
                tick.instrument_id,
                tick.action_day,
                tick.action_time,
                tick.volume,
                tick.market_volume,
                tick.turnover,
                tick.trading_day,
                tick.update_time
            );
            self.counters.ignored.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let destination = match Destination::parse(&tick.destination_id) {
            Ok(destination) => destination,
            Err(e) => {
                warn!("Drop tick for {}: {}", tick.instrument_id, e);
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let written = panic::catch_unwind(AssertUnwindSafe(|| self.write(&destination, &tick)));
        match written {
            Ok(Ok(())) => {
                debug!(
                    "Record one tick ok! Inst:{},updateTime:{}",
                    tick.instrument_id, tick.update_time
                );
                self.counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                error!("Insert failed! Inst:{},{}", tick.instrument_id, e);
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                error!("Insert panicked! Inst:{}", tick.instrument_id);
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn write(&mut self, destination: &Destination, tick: &Tick) -> Result<()> {
        let document = TickDocument::from_tick(tick).to_value()?;
        self.sink.insert_one(destination, &document)
    }

    /// Worker loop: drain, then wait for the flush interval or a stop signal.
    fn run(mut self, running: Arc<AtomicBool>, stop_rx: Receiver<()>, interval: Duration) -> Self {
        while running.load(Ordering::Acquire) {
            let count = self.drain();
            debug!("Drain pass done, count:{}", count);
            select! {
                recv(stop_rx) -> _ => break,
                default(interval) => {}
            }
        }
        self
    }
}

struct Worker {
    handle: JoinHandle<Drainer>,
    stop_tx: Sender<()>,
}

/// Bounded queue plus one background writer.
pub struct PersistenceEngine {
    state: EngineState,
    config: Option<EngineConfig>,
    tx: Sender<Tick>,
    rx: Receiver<Tick>,
    sink: Option<Box<dyn DocumentSink>>,
    worker: Option<Worker>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    flush_interval: Duration,
}

impl Default for PersistenceEngine {
    fn default() -> Self {
        Self::new(
            DEFAULT_QUEUE_CAPACITY,
            Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS),
        )
    }
}

impl PersistenceEngine {
    /// Creates an engine with a queue bounded to `capacity` (at least 1).
    pub fn new(capacity: usize, flush_interval: Duration) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            state: EngineState::Created,
            config: None,
            tx,
            rx,
            sink: None,
            worker: None,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            flush_interval,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Config of the last successful initialization.
    pub fn config(&self) -> Option<&EngineConfig> {
        self.config.as_ref()
    }

    /// Ticks waiting in the queue.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Validates `config` and sets up the sink connection through `connector`.
    ///
    /// On failure the engine moves to `Failed`, keeps no sink and can only be
    /// initialized again. Rejected while the worker runs.
    pub fn initialize<C: SinkConnector + ?Sized>(
        &mut self,
        connector: &C,
        config: EngineConfig,
    ) -> Result<()> {
        if self.worker.is_some() {
            return Err(RecorderError::AlreadyRunning);
        }
        match validate_config(&config).and_then(|_| connector.connect(&config)) {
            Ok(sink) => {
                info!("Persistence engine initialized, address:{},db:{}", config.address, config.db);
                self.sink = Some(sink);
                self.config = Some(config);
                self.state = EngineState::Initialized;
                Ok(())
            }
            Err(e) => {
                error!("Persistence engine init failed! {}", e);
                self.sink = None;
                self.config = None;
                self.state = EngineState::Failed;
                Err(e)
            }
        }
    }

    /// Spawns the background worker.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            EngineState::Initialized | EngineState::Stopped => {}
            EngineState::Running | EngineState::Stopping | EngineState::Drained => {
                return Err(RecorderError::AlreadyRunning);
            }
            EngineState::Created | EngineState::Failed => return Err(RecorderError::NotInitialized),
        }
        let sink = self.sink.take().ok_or(RecorderError::NotInitialized)?;
        let drainer = Drainer {
            rx: self.rx.clone(),
            sink,
            counters: Arc::clone(&self.counters),
        };
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let running = Arc::clone(&self.running);
        let interval = self.flush_interval;

        running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name(String::from(WORKER_NAME))
            .spawn(move || drainer.run(running, stop_rx, interval));

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker { handle, stop_tx });
                self.state = EngineState::Running;
                info!("Persistence engine started, flush interval {:?}", self.flush_interval);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.state = EngineState::Failed;
                error!("Persistence worker spawn failed! {}", e);
                Err(RecorderError::Io(e))
            }
        }
    }

    /// Pushes a tick into the queue without blocking.
    ///
    /// `Err(EnqueueError::Full)` hands the tick back; the engine never drops or retries
    /// on the caller's behalf.
    pub fn enqueue(&self, tick: Tick) -> std::result::Result<(), EnqueueError> {
        self.producer().enqueue(tick)
    }

    /// A handle for feeding the queue from another thread, e.g. a dispatcher handler.
    pub fn producer(&self) -> TickProducer {
        TickProducer { tx: self.tx.clone() }
    }

    /// Stops the worker and drains the rest of the queue on the calling thread.
    ///
    /// A no-op when the engine is not running.
    pub fn stop(&mut self) -> Result<DrainStats> {
        let Some(worker) = self.worker.take() else {
            return Ok(self.stats());
        };

        self.running.store(false, Ordering::Release);
        self.state = EngineState::Stopping;
        // ignored: the worker may have exited already
        let _ = worker.stop_tx.try_send(());

        let mut drainer = match worker.handle.join() {
            Ok(drainer) => drainer,
            Err(_) => {
                error!("Persistence worker panicked, {} ticks left in queue", self.pending());
                self.state = EngineState::Failed;
                return Err(RecorderError::WorkerPanicked);
            }
        };

        let remaining = drainer.drain();
        self.state = EngineState::Drained;
        info!("Persistence engine drained {} ticks on stop", remaining);

        self.sink = Some(drainer.sink);
        self.state = EngineState::Stopped;
        let stats = self.stats();
        info!(
            "Persistence engine stopped, written:{},ignored:{},rejected:{},failed:{}",
            stats.written, stats.ignored, stats.rejected, stats.failed
        );
        Ok(stats)
    }

    pub fn stats(&self) -> DrainStats {
        DrainStats {
            written: self.counters.written.load(Ordering::Relaxed),
            ignored: self.counters.ignored.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PersistenceEngine {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                error!("Persistence engine stop on drop failed! {}", e);
            }
        }
    }
}
