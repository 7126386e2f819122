//! # BLE Logger Core Library
//!
//! Core functionality for a sensor data logger that writes readings to
//! removable storage and serves them to a paired phone app over a
//! short-range radio link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Dated log files with fixed-size rotation
//! - A line-oriented request/response protocol for listing and downloading
//!   files and reporting device info
//! - Storage space accounting
//! - A cooperative scheduler tying the logger and protocol engine together
//!
//! Board hardware is reached through small capability traits
//! ([`time::Clock`], [`storage::Storage`], [`link::RadioLink`],
//! [`sensor::Sensor`], [`sensor::BatteryMonitor`]) so the same code runs
//! against real drivers, host adapters or test doubles.
//!
//! ## Example
//!
//! ```rust,ignore
//! use blelogger_core::prelude::*;
//!
//! let ctx = DeviceContext::new(
//!     SystemClock,
//!     FsStorage::new("/mnt/sd", VolumeGeometry::default()),
//!     TcpLink::bind("0.0.0.0:7878")?,
//!     ScriptedSensor::constant(512),
//!     FixedBattery(3.7),
//! );
//! let mut device = Device::initialize(ctx, &DeviceConfig::default())?;
//! loop {
//!     device.tick()?;
//! }
//! ```

pub mod config;
pub mod datalog;
pub mod device;
pub mod link;
pub mod protocol;
pub mod sensor;
pub mod session;
pub mod storage;
pub mod time;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::DeviceConfig;
    pub use crate::datalog::{FileStatus, LogRecord, Logger, LoggerError};
    pub use crate::device::{Device, DeviceContext, DeviceError, FatalInitError, TickReport};
    pub use crate::link::{MemoryLink, RadioLink, TcpLink};
    pub use crate::protocol::{Command, ProtocolEngine, Response};
    pub use crate::sensor::{BatteryMonitor, FixedBattery, ScriptedSensor, Sensor};
    pub use crate::session::{SessionEvent, SessionMonitor};
    pub use crate::storage::{FsStorage, MemStorage, Storage, StorageAccounting, VolumeGeometry};
    pub use crate::time::{CalendarTime, Clock, ManualClock, SystemClock};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
