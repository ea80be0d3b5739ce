//!
//! Common types shared by the tick recorder and the feed bindings that drive it.
//!
//! This crate aggregates:
//! - `error` — unified error type `RecorderError` used across the workspace.
//! - `result` — handy `Result<T, RecorderError>` alias.
//! - `tick` — the depth-market-data record persisted by the recorder.
//! - `feed` — feed event kinds and response payloads.
//! - `config` — engine and recorder configuration values.
#![warn(missing_docs)]
pub mod config;
pub mod error;
pub mod feed;
pub mod result;
pub mod tick;

pub use config::{EngineConfig, RecorderConfig};
pub use error::RecorderError;
pub use feed::EventKind;
pub use result::Result;
pub use tick::Tick;
