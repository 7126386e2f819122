//! Protocol errors

use thiserror::Error;

use crate::datalog::LoggerError;
use crate::link::LinkError;
use crate::storage::StorageError;

/// Errors that can occur while serving a request
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The response could not be sent
    #[error("Link error: {0}")]
    LinkError(#[from] LinkError),

    /// Listing or accounting failed
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    /// The log file could not be reopened after a download
    #[error("Logger error: {0}")]
    LoggerError(#[from] LoggerError),
}

impl ProtocolError {
    /// Whether the device can no longer log
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::LoggerError(e) if e.is_fatal())
    }
}
