//! Tick recorder binary.
//!
//! Wires a feed binding to the persistence engine:
//!
//! - `SinkDriver` — created once at start-up, torn down at exit; the engine connects
//!   through it.
//! - `PersistenceEngine` — bounded queue and background writer.
//! - `FeedDispatcher` — receives feed events; its `Tick` handler enqueues into the
//!   engine and never blocks.
//! - `SimulatedFeed` — the feed binding, owning the delivery thread.
//!
//! Shutdown (Ctrl+C): stop the feed, clear all handlers, stop the engine (which drains
//! the queue), tear down the driver.
//!
//! Usage example:
//! ```bash
//! tick_recorder --address file:///var/lib/ticks --db md --instrument IF2012 --instrument IC2012
//! ```
#![warn(missing_docs)]
mod args;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info, warn};
use tick_common::{RecorderConfig, RecorderError, Result};
use tick_recorder::simulator::{FeedSettings, SimulatedFeed};
use tick_recorder::{EnqueueError, FeedDispatcher, Handler, PersistenceEngine, SinkDriver, TickProducer};

use crate::args::Args;

/// Installs the application handlers on `dispatcher`.
///
/// Handlers run on the feed thread under the dispatcher lock, so they only log or
/// hand ticks to the engine.
fn register_handlers(dispatcher: &FeedDispatcher, producer: TickProducer, dropped: Arc<AtomicU64>) {
    dispatcher.register(Handler::tick(move |tick| {
        if let Err(e) = producer.enqueue(tick) {
            let count = dropped.fetch_add(1, Ordering::Relaxed) + 1;
            match e {
                EnqueueError::Full(tick) => {
                    warn!("Persistence queue full, tick dropped! Inst:{},dropped:{}", tick.instrument_id, count)
                }
                EnqueueError::Disconnected(tick) => {
                    error!("Persistence queue closed, tick dropped! Inst:{}", tick.instrument_id)
                }
            }
        }
    }));
    dispatcher.register(Handler::disconnected(|reason| {
        warn!("Feed session lost, reason:{}", reason);
    }));
    dispatcher.register(Handler::login_result(|login, info| {
        if let (Some(login), None) = (login, info.filter(|i| i.is_error())) {
            info!("Session opened, trading day {}", login.trading_day);
        }
    }));
    dispatcher.register(Handler::subscribe_result(|instrument, info| {
        if let Some(info) = info.filter(|i| i.is_error()) {
            let err = RecorderError::from(info);
            error!(
                "Subscription for {} rejected: {}",
                instrument.map(|i| i.instrument_id.as_str()).unwrap_or("?"),
                err
            );
        }
    }));
}

fn run(config: RecorderConfig, exchange: String) -> Result<()> {
    let driver = SinkDriver::init()?;

    let mut engine = PersistenceEngine::new(
        config.queue_capacity,
        Duration::from_secs(config.flush_interval_secs),
    );
    engine.initialize(&driver, config.engine.clone())?;
    engine.start()?;

    let dropped = Arc::new(AtomicU64::new(0));
    let dispatcher = Arc::new(FeedDispatcher::new());
    register_handlers(&dispatcher, engine.producer(), Arc::clone(&dropped));

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down recorder...");
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| RecorderError::Io(io::Error::other(e)))?;

    let mut feed = SimulatedFeed::start(
        dispatcher.clone(),
        FeedSettings {
            instruments: config.instruments.clone(),
            exchange_id: exchange,
            destination_id: config.destination.clone(),
            tick_interval: Duration::from_millis(config.tick_interval_ms),
        },
    )?;
    info!(
        "Recorder is running for {:?} into {}/{}. Press Ctrl+C to exit.",
        config.instruments, config.engine.address, config.engine.db
    );

    let _ = shutdown_rx.recv();

    if let Err(e) = feed.stop() {
        error!("Feed stop failed: {}", e);
    }
    dispatcher.clear_all();
    let stats = engine.stop()?;
    info!(
        "Recorder stopped. written:{},ignored:{},rejected:{},failed:{},dropped:{}",
        stats.written,
        stats.ignored,
        stats.rejected,
        stats.failed,
        dropped.load(Ordering::Relaxed)
    );
    drop(engine);
    drop(driver);
    Ok(())
}

fn main() -> Result<(), RecorderError> {
    init_logger();
    let args = Args::parse();
    let config = args.resolve().inspect_err(|e| error!("Invalid configuration: {}", e))?;
    run(config, args.exchange)
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
