//! Storage errors

use thiserror::Error;

/// Errors reported by a storage driver
#[derive(Error, Debug)]
pub enum StorageError {
    /// The card is missing or unmounted
    #[error("Storage medium not present")]
    NotPresent,

    /// No entry with that name
    #[error("File not found: {0}")]
    NotFound(String),

    /// The file is already held by another handle
    #[error("File already open: {0}")]
    FileInUse(String),

    /// Every available handle is in use
    #[error("Too many open files (limit {limit})")]
    TooManyOpenFiles {
        /// Handles the driver allows at once
        limit: usize,
    },

    /// The handle is closed or was never issued
    #[error("Invalid file handle")]
    InvalidHandle,

    /// Read on an append handle or append on a read handle
    #[error("File '{0}' is not open for this operation")]
    WrongMode(String),

    /// Empty name or one that would leave the root
    #[error("Invalid file name: '{0}'")]
    InvalidName(String),

    /// Not enough free space for the write
    #[error("Storage full: {requested} bytes requested, {available} available")]
    StorageFull {
        /// Bytes the write needed
        requested: u64,
        /// Bytes left on the volume
        available: u64,
    },

    /// Host filesystem error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
