//! Result type alias shared across the workspace.
//!
//! This module defines a convenient alias that defaults the error type to the
//! common `RecorderError`, so functions can simply return `Result<T>`.
use crate::error::RecorderError;

/// Workspace-wide `Result` alias with `RecorderError` as the default error.
pub type Result<T, E = RecorderError> = std::result::Result<T, E>;
