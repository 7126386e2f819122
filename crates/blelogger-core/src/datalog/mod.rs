//! Data Logging
//!
//! Samples the sensor, appends human-readable records to a dated log file
//! and rotates to a freshly selected file every few records.

mod format;
mod info;
mod recorder;

pub use format::{log_file_name, parse_info_line, INFO_FILE_NAME};
pub use info::{provision_info, read_start_date};
pub use recorder::{FileStatus, Logger, LoggerStats};

use thiserror::Error;

use crate::storage::StorageError;
use crate::time::CalendarTime;

/// Records written to a log file before it is rotated
pub const DEFAULT_ROTATION_THRESHOLD: u32 = 10;

/// One sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    /// Raw sensor sample
    pub sensor_value: i32,
    /// When the sample was taken
    pub timestamp: CalendarTime,
}

impl LogRecord {
    /// Create a new log record
    pub fn new(sensor_value: i32, timestamp: CalendarTime) -> Self {
        Self {
            sensor_value,
            timestamp,
        }
    }
}

/// Errors raised on the logging path
#[derive(Error, Debug)]
pub enum LoggerError {
    /// The active log file could not be opened; logging cannot continue
    #[error("Log file '{name}' unavailable: {source}")]
    StorageUnavailable {
        /// File that could not be opened
        name: String,
        /// Driver error behind it
        #[source]
        source: StorageError,
    },

    /// A tick ran with no file selected
    #[error("No active log file")]
    NoActiveFile,

    /// Append or flush of a record failed
    #[error("Failed to write log record: {0}")]
    WriteFailed(#[source] StorageError),

    /// The driver refused to close the active file
    #[error("Failed to close log file: {0}")]
    CloseFailed(#[source] StorageError),
}

impl LoggerError {
    /// Whether this error leaves the logger without a usable file
    ///
    /// A write that fails because the medium is gone counts; a full card
    /// or a transient write error does not.
    pub fn is_fatal(&self) -> bool {
        match self {
            LoggerError::StorageUnavailable { .. } | LoggerError::NoActiveFile => true,
            LoggerError::WriteFailed(source) => matches!(
                source,
                StorageError::NotPresent | StorageError::InvalidHandle
            ),
            LoggerError::CloseFailed(_) => false,
        }
    }
}
