//! Error types for process management

use std::io;
use thiserror::Error;

/// Process management errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Program could not be found or executed
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Signal delivery failed for a reason other than the process being gone
    #[error("Failed to send {signal} to process {pid}: {source}")]
    Signal {
        pid: u32,
        signal: &'static str,
        #[source]
        source: io::Error,
    },

    /// Waiting on or polling the process failed at the OS level
    #[error("Failed to wait for process: {0}")]
    Wait(#[source] io::Error),

    /// Reading a captured output stream failed
    #[error("Failed to read process output: {0}")]
    Io(#[from] io::Error),

    /// Command resolved to an empty argument list
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
