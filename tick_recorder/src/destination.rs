//! Sink partition names.
//!
//! A tick's `destination_id` comes straight from feed data and ends up as a
//! collection name (a file name for the JSON-lines store), so it goes through an
//! allow-list before it reaches any sink.

use std::fmt;

use tick_common::{RecorderError, Result};

/// Longest accepted partition name.
pub const MAX_DESTINATION_LEN: usize = 64;

const RESERVED_PREFIX: &str = "system.";

/// A validated partition name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination(String);

impl Destination {
    /// Validates `raw` as a partition name.
    ///
    /// Accepts 1 to 64 ASCII letters, digits, `_`, `-` and `.`; rejects names that
    /// start with `.` or `system.` and names containing `..`.
    pub fn parse(raw: &str) -> Result<Self> {
        let valid_chars = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

        if raw.is_empty()
            || raw.len() > MAX_DESTINATION_LEN
            || !valid_chars
            || raw.starts_with('.')
            || raw.starts_with(RESERVED_PREFIX)
            || raw.contains("..")
        {
            return Err(RecorderError::InvalidDestination(String::from(raw)));
        }
        Ok(Destination(String::from(raw)))
    }

    /// The partition name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Destination {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
