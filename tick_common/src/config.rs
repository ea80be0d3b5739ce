//! Configuration values for the persistence engine and the recorder binary.
//!
//! Both types are plain data. `RecorderConfig` is read from a JSON file; every field
//! except `engine` falls back to a default.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::result::Result;

/// Default bound of the producer/consumer queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 65_536;
/// Default pause between two drain passes of the worker.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;
/// Default pacing of the simulated feed.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 500;
/// Default sink partition for recorded ticks.
pub const DEFAULT_DESTINATION: &str = "ticks";

/// Sink connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Connection URI of the document store.
    pub address: String,
    /// Namespace (database) name inside the store.
    pub db: String,
}

impl EngineConfig {
    /// Creates a config from an address and a namespace.
    pub fn new(address: &str, db: &str) -> Self {
        EngineConfig {
            address: String::from(address),
            db: String::from(db),
        }
    }
}

/// Full configuration of the recorder binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Sink connection settings.
    pub engine: EngineConfig,
    /// Bound of the producer/consumer queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Seconds between two drain passes.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Instruments to subscribe to.
    #[serde(default)]
    pub instruments: Vec<String>,
    /// Sink partition recorded ticks are routed to.
    #[serde(default = "default_destination")]
    pub destination: String,
    /// Milliseconds between two simulated feed rounds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_flush_interval_secs() -> u64 {
    DEFAULT_FLUSH_INTERVAL_SECS
}

fn default_destination() -> String {
    String::from(DEFAULT_DESTINATION)
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl RecorderConfig {
    /// Creates a config with default settings around `engine`.
    pub fn new(engine: EngineConfig) -> Self {
        RecorderConfig {
            engine,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            instruments: Vec::new(),
            destination: default_destination(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }

    /// Parses a JSON config from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}
