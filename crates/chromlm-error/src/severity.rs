//! Coarse-grained classification for programmatic handling of errors.
//!
//! Typical mappings:
//! - Warning: the request was refused before any I/O, nothing to recover
//! - Error: a round trip or storage operation failed and may be retried
//! - Fatal: the process cannot continue with its current configuration
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}
