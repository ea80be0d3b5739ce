//! Document sinks.
//!
//! - `DocumentSink` — "insert one document into partition P", one blocking call per
//!   record.
//! - `SinkConnector` — turns an `EngineConfig` into a connected sink.
//! - `driver` — the process-wide `SinkDriver`, the production connector.
//! - `json_lines` — directory-backed store, one `.jsonl` file per partition.
//! - `memory` — in-process store, shared between clones.

pub mod driver;
pub mod json_lines;
pub mod memory;

use tick_common::{EngineConfig, RecorderError, Result};
use url::Url;

use crate::destination::Destination;

pub use driver::SinkDriver;
pub use json_lines::JsonLinesStore;
pub use memory::MemoryStore;

/// Destination for persisted documents.
///
/// A sink is owned by exactly one thread at a time, so implementations need `Send`
/// but not `Sync`.
pub trait DocumentSink: Send {
    /// Inserts one document into `partition`.
    ///
    /// Called once per record; a returned error is logged by the caller and the
    /// record is dropped.
    fn insert_one(&mut self, partition: &Destination, document: &serde_json::Value) -> Result<()>;
}

/// Connection setup for a sink.
pub trait SinkConnector {
    /// Establishes a sink for `config`.
    fn connect(&self, config: &EngineConfig) -> Result<Box<dyn DocumentSink>>;
}

/// Checks that `config` names a parseable address and a valid namespace.
pub fn validate_config(config: &EngineConfig) -> Result<(Url, Destination)> {
    let url = Url::parse(&config.address).map_err(|e| {
        RecorderError::InvalidConfig(format!("address {:?}: {}", config.address, e))
    })?;
    let db = Destination::parse(&config.db)
        .map_err(|_| RecorderError::InvalidConfig(format!("db name {:?}", config.db)))?;
    Ok((url, db))
}
