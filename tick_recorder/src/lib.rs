//! Tick recorder: captures market-data ticks from a feed and persists them without
//! blocking the feed's delivery thread.
//!
//! Modules:
//! - `feed` — `FeedEventSink`, the interface a feed binding calls into.
//! - `dispatcher` — `FeedDispatcher`, the event-kind → handler registry.
//! - `engine` — `PersistenceEngine`, bounded queue plus background writer.
//! - `sink` — document sinks, connectors and the process-wide `SinkDriver`.
//! - `document` — tick → persisted document mapping.
//! - `destination` — validated partition names.
//! - `simulator` — a feed binding producing synthetic ticks.
pub mod destination;
pub mod dispatcher;
pub mod document;
pub mod engine;
pub mod feed;
pub mod simulator;
pub mod sink;

pub use dispatcher::{FeedDispatcher, Handler};
pub use engine::{DrainStats, EngineState, EnqueueError, PersistenceEngine, TickProducer};
pub use feed::FeedEventSink;
pub use sink::{DocumentSink, SinkConnector, SinkDriver};
