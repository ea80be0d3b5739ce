//! Error types shared by the recorder crates.
//!
//! The `RecorderError` enum covers every failure the recorder can observe. None of
//! them is fatal: each one is isolated to a single record, a single initialization
//! attempt or a single enqueue, and the caller decides whether to log and move on.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by the recorder crates.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// I/O error originating from the standard library or the file store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// The sink connection context could not be established.
    #[error("Connection setup failed: {0}")]
    ConnectionSetup(String),

    /// Address, namespace or another configuration value is malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error payload reported by the market-data feed.
    #[error("Feed error {error_id}: {error_msg}")]
    FeedError {
        /// Feed specific error code, never zero.
        error_id: i32,
        /// Message attached by the feed.
        error_msg: String,
    },

    /// A single document could not be written to the sink.
    #[error("Persistence write failed: {0}")]
    PersistenceWrite(String),

    /// The bounded queue is full; the record was handed back to the producer.
    #[error("Queue is full, record for {0} rejected")]
    QueueFull(String),

    /// The consuming side of the queue is gone.
    #[error("Queue is disconnected, record for {0} rejected")]
    QueueDisconnected(String),

    /// A destination id failed the partition name rules.
    #[error("Invalid destination: {0:?}")]
    InvalidDestination(String),

    /// The engine has no sink yet; `initialize` must succeed first.
    #[error("Engine is not initialized")]
    NotInitialized,

    /// The engine already runs a worker thread.
    #[error("Engine is already running")]
    AlreadyRunning,

    /// Another sink driver is still alive in this process.
    #[error("Sink driver is already initialized")]
    DriverAlreadyInitialized,

    /// The background worker panicked and its state was lost.
    #[error("Worker thread panicked")]
    WorkerPanicked,

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for RecorderError {
    fn from(err: PoisonError<T>) -> Self {
        RecorderError::MutexLock(err.to_string())
    }
}
