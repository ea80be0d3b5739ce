//! Command-line arguments for the tick recorder.
//!
//! Either `--config` points at a JSON `RecorderConfig`, or `--address` and `--db`
//! describe the sink directly. Any other flag overrides the matching config value.
use std::path::PathBuf;

use clap::Parser;
use tick_common::{EngineConfig, RecorderConfig, RecorderError, Result};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a JSON config file.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Sink address, e.g. `file:///var/lib/ticks` or `memory://`.
    #[clap(long)]
    pub address: Option<String>,

    /// Namespace (database) name inside the sink.
    #[clap(long)]
    pub db: Option<String>,

    /// Instrument to subscribe to; repeat for several.
    #[clap(long = "instrument")]
    pub instruments: Vec<String>,

    /// Partition recorded ticks are routed to.
    #[clap(long)]
    pub destination: Option<String>,

    /// Bound of the persistence queue.
    #[clap(long)]
    pub queue_capacity: Option<usize>,

    /// Seconds between two drain passes.
    #[clap(long)]
    pub flush_interval_secs: Option<u64>,

    /// Milliseconds between two simulated feed rounds.
    #[clap(long)]
    pub tick_interval_ms: Option<u64>,

    /// Exchange id stamped on simulated ticks.
    #[clap(long, default_value = "SIM")]
    pub exchange: String,
}

impl Args {
    /// Merges the config file (if any) with the command-line overrides.
    pub fn resolve(&self) -> Result<RecorderConfig> {
        let mut config = match (&self.config, &self.address, &self.db) {
            (Some(path), _, _) => RecorderConfig::load(path)?,
            (None, Some(address), Some(db)) => RecorderConfig::new(EngineConfig::new(address, db)),
            _ => {
                return Err(RecorderError::InvalidConfig(String::from(
                    "either --config or both --address and --db are required",
                )));
            }
        };

        if self.config.is_some() {
            if let Some(address) = &self.address {
                config.engine.address = address.clone();
            }
            if let Some(db) = &self.db {
                config.engine.db = db.clone();
            }
        }
        if !self.instruments.is_empty() {
            config.instruments = self.instruments.clone();
        }
        if let Some(destination) = &self.destination {
            config.destination = destination.clone();
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(secs) = self.flush_interval_secs {
            config.flush_interval_secs = secs;
        }
        if let Some(ms) = self.tick_interval_ms {
            config.tick_interval_ms = ms;
        }

        if config.instruments.is_empty() {
            return Err(RecorderError::InvalidConfig(String::from(
                "at least one --instrument is required",
            )));
        }
        Ok(config)
    }
}
