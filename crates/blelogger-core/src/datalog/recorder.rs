//! Data logger / recorder
//!
//! Owns the active log file handle. Every tick appends and flushes one
//! record; after `rotation_threshold` records the file is closed and a new
//! one is selected from the current date.

use tracing::{debug, error, info, warn};

use super::format::log_file_name;
use super::{LogRecord, LoggerError, DEFAULT_ROTATION_THRESHOLD};
use crate::sensor::Sensor;
use crate::storage::{FileHandle, OpenMode, Storage};
use crate::time::Clock;

/// Outcome of selecting the active log file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// No file existed for today; one was created
    OpenedNew,
    /// Today's file already existed and was opened for append
    ReopenedExisting,
}

/// Counters describing the logger's progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerStats {
    /// Records durably written since start
    pub records_written: u64,
    /// Completed rotations
    pub rotations: u64,
    /// Records written to the active file since the last rotation
    pub records_since_rotation: u32,
}

#[derive(Debug)]
struct ActiveFile {
    name: String,
    handle: FileHandle,
}

/// Data logger state
#[derive(Debug)]
pub struct Logger {
    rotation_threshold: u32,
    active: Option<ActiveFile>,
    /// Writes since the last rotation
    counter: u32,
    records_written: u64,
    rotations: u64,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(DEFAULT_ROTATION_THRESHOLD)
    }
}

impl Logger {
    /// Create a logger that rotates every `rotation_threshold` records
    pub fn new(rotation_threshold: u32) -> Self {
        Self {
            rotation_threshold: rotation_threshold.max(1),
            active: None,
            counter: 0,
            records_written: 0,
            rotations: 0,
        }
    }

    /// Records per file before rotation
    pub fn rotation_threshold(&self) -> u32 {
        self.rotation_threshold
    }

    /// Name of the file currently held open, if any
    pub fn active_file_name(&self) -> Option<&str> {
        self.active.as_ref().map(|f| f.name.as_str())
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> LoggerStats {
        LoggerStats {
            records_written: self.records_written,
            rotations: self.rotations,
            records_since_rotation: self.counter,
        }
    }

    /// Open today's log file, creating it if needed
    ///
    /// Any file already held is closed first. Failure to open is fatal for
    /// the logging path and leaves the logger without an active file.
    pub fn select_log_file<S, C>(
        &mut self,
        storage: &mut S,
        clock: &C,
    ) -> Result<FileStatus, LoggerError>
    where
        S: Storage + ?Sized,
        C: Clock + ?Sized,
    {
        self.release(storage)?;

        let name = log_file_name(&clock.now());
        let (opened, status) = if storage.exists(&name) {
            (
                storage.open(&name, OpenMode::Append),
                FileStatus::ReopenedExisting,
            )
        } else {
            (storage.create(&name), FileStatus::OpenedNew)
        };

        let handle = opened.map_err(|source| {
            error!("Cannot open log file {}: {}", name, source);
            LoggerError::StorageUnavailable {
                name: name.clone(),
                source,
            }
        })?;

        match status {
            FileStatus::OpenedNew => info!("Opened new log file {}", name),
            FileStatus::ReopenedExisting => info!("Reopened existing log file {}", name),
        }
        self.active = Some(ActiveFile { name, handle });
        Ok(status)
    }

    /// Sample once and persist the record
    ///
    /// The write counter only advances once the record is flushed. Reaching
    /// the rotation threshold closes the file and selects the next one.
    pub fn tick<S, C, P>(
        &mut self,
        storage: &mut S,
        clock: &C,
        sensor: &mut P,
    ) -> Result<LogRecord, LoggerError>
    where
        S: Storage + ?Sized,
        C: Clock + ?Sized,
        P: Sensor + ?Sized,
    {
        let handle = self
            .active
            .as_ref()
            .map(|f| f.handle)
            .ok_or(LoggerError::NoActiveFile)?;

        let record = LogRecord::new(sensor.sample(), clock.now());
        storage
            .append(handle, record.to_text().as_bytes())
            .and_then(|_| storage.flush(handle))
            .map_err(LoggerError::WriteFailed)?;

        self.counter += 1;
        self.records_written += 1;
        debug!(
            "Logged value {} at {} ({}/{})",
            record.sensor_value, record.timestamp, self.counter, self.rotation_threshold
        );

        if self.counter >= self.rotation_threshold {
            self.rotate(storage, clock)?;
        }
        Ok(record)
    }

    fn rotate<S, C>(&mut self, storage: &mut S, clock: &C) -> Result<(), LoggerError>
    where
        S: Storage + ?Sized,
        C: Clock + ?Sized,
    {
        self.release(storage)?;
        self.select_log_file(storage, clock)?;
        self.counter = 0;
        self.rotations += 1;
        info!("Rotated log file (rotation #{})", self.rotations);
        Ok(())
    }

    /// Run `f` with the active log file closed, then reopen it
    ///
    /// The reopen goes through [`Logger::select_log_file`] and happens
    /// whatever `f` returns, so a failed read never leaves logging
    /// suspended. The write counter is untouched.
    pub fn with_file_released<S, C, R>(
        &mut self,
        storage: &mut S,
        clock: &C,
        f: impl FnOnce(&mut S) -> R,
    ) -> Result<R, LoggerError>
    where
        S: Storage + ?Sized,
        C: Clock + ?Sized,
    {
        if let Err(e) = self.release(storage) {
            // The handle is gone either way; reopening below recovers.
            warn!("{}", e);
        }
        let result = f(storage);
        self.select_log_file(storage, clock)?;
        Ok(result)
    }

    /// Close the active file, if any
    pub fn release<S: Storage + ?Sized>(&mut self, storage: &mut S) -> Result<(), LoggerError> {
        if let Some(active) = self.active.take() {
            storage
                .close(active.handle)
                .map_err(LoggerError::CloseFailed)?;
            debug!("Closed log file {}", active.name);
        }
        Ok(())
    }
}
