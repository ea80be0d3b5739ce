//! In-process document store.
//!
//! Every clone shares the same contents, so a caller can hand one clone to the engine
//! and inspect what was written through another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tick_common::{EngineConfig, Result};

use super::{DocumentSink, SinkConnector};
use crate::destination::Destination;

/// Documents grouped by partition, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    partitions: Arc<Mutex<HashMap<String, Vec<serde_json::Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents written to `partition` so far.
    pub fn documents(&self, partition: &str) -> Result<Vec<serde_json::Value>> {
        let partitions = self.partitions.lock()?;
        Ok(partitions.get(partition).cloned().unwrap_or_default())
    }

    /// Total number of documents across all partitions.
    pub fn len(&self) -> Result<usize> {
        let partitions = self.partitions.lock()?;
        Ok(partitions.values().map(Vec::len).sum())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl DocumentSink for MemoryStore {
    fn insert_one(&mut self, partition: &Destination, document: &serde_json::Value) -> Result<()> {
        let mut partitions = self.partitions.lock()?;
        partitions
            .entry(partition.to_string())
            .or_default()
            .push(document.clone());
        Ok(())
    }
}

/// Connects every engine to the same shared store.
impl SinkConnector for MemoryStore {
    fn connect(&self, _config: &EngineConfig) -> Result<Box<dyn DocumentSink>> {
        Ok(Box::new(self.clone()))
    }
}
