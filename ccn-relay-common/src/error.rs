//! Error types for the relay.

use thiserror::Error;

/// All possible errors that can occur within the relay.
///
/// Every variant is local to one operation: the forwarding engine reports it
/// and moves on to the next event.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed wire bytes or a malformed textual name.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A name, table or queue would grow past its configured bound.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Storage could not be reserved.
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// A lookup missed. This is an expected outcome, not a fault.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A duplicate nonce, packet or content object was dropped.
    #[error("Duplicate suppressed: {0}")]
    DuplicateSuppressed(String),

    /// Invalid relay configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// True for outcomes the data plane treats as routine (misses, duplicates).
    pub fn is_benign(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::DuplicateSuppressed(_))
    }
}
