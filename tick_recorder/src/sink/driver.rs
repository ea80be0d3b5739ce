//! Process-wide sink driver.
//!
//! Store drivers typically need one runtime instance per process. `SinkDriver` makes
//! that explicit: it is created once at process start, passed by reference to every
//! engine that needs a connection, and torn down when dropped. A second driver cannot
//! be created while the first one is alive.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use tick_common::{EngineConfig, RecorderError, Result};

use super::{DocumentSink, JsonLinesStore, MemoryStore, SinkConnector, validate_config};

static DRIVER_ALIVE: AtomicBool = AtomicBool::new(false);

/// Scheme of the directory-backed store.
pub const FILE_SCHEME: &str = "file";
/// Scheme of the in-process store.
pub const MEMORY_SCHEME: &str = "memory";

/// Handle to the process-wide driver.
#[derive(Debug)]
pub struct SinkDriver {
    _private: (),
}

impl SinkDriver {
    /// Initializes the driver.
    ///
    /// Fails with `DriverAlreadyInitialized` while another handle is alive.
    pub fn init() -> Result<Self> {
        DRIVER_ALIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RecorderError::DriverAlreadyInitialized)?;
        info!("Sink driver initialized");
        Ok(SinkDriver { _private: () })
    }

    /// Returns `true` while a driver handle exists in this process.
    pub fn is_alive() -> bool {
        DRIVER_ALIVE.load(Ordering::Acquire)
    }
}

impl Drop for SinkDriver {
    fn drop(&mut self) {
        DRIVER_ALIVE.store(false, Ordering::Release);
        info!("Sink driver torn down");
    }
}

impl SinkConnector for SinkDriver {
    /// Selects a store from the address scheme:
    /// `file:///root` opens a JSON-lines store in `<root>/<db>`, `memory://` a fresh
    /// in-process store.
    fn connect(&self, config: &EngineConfig) -> Result<Box<dyn DocumentSink>> {
        let (url, db) = validate_config(config)?;

        match url.scheme() {
            FILE_SCHEME => {
                let root = url.to_file_path().map_err(|_| {
                    RecorderError::InvalidConfig(format!("address {:?} is not a local path", config.address))
                })?;
                let store = JsonLinesStore::open(&root.join(db.as_str()))?;
                debug!("Connected to {} db {}", config.address, db);
                Ok(Box::new(store))
            }
            MEMORY_SCHEME => {
                debug!("Connected to in-memory store, db {}", db);
                Ok(Box::new(MemoryStore::new()))
            }
            other => Err(RecorderError::ConnectionSetup(format!(
                "unsupported scheme {:?} in {}",
                other, config.address
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    // Single test: the driver is process-wide and tests run in parallel.
    #[test]
    fn driver_lifecycle_and_connect() {
        let driver = SinkDriver::init().unwrap();
        assert!(SinkDriver::is_alive());
        assert!(matches!(SinkDriver::init(), Err(RecorderError::DriverAlreadyInitialized)));

        let dir = tempfile::tempdir().unwrap();
        let address = Url::from_directory_path(dir.path()).unwrap().to_string();
        assert!(driver.connect(&EngineConfig::new(&address, "md")).is_ok());
        assert!(dir.path().join("md").is_dir());

        assert!(driver.connect(&EngineConfig::new("memory://", "md")).is_ok());

        for (address, db) in [
            ("not a uri", "md"),
            ("mongodb://localhost:27017", "md"),
            ("memory://", ""),
            ("memory://", "../md"),
        ] {
            assert!(
                driver.connect(&EngineConfig::new(address, db)).is_err(),
                "{address} / {db} should fail"
            );
        }

        drop(driver);
        assert!(!SinkDriver::is_alive());
        let again = SinkDriver::init().unwrap();
        drop(again);
    }
}
