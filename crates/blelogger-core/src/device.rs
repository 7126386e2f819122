//! Device scheduler
//!
//! Bundles the board capabilities into a [`DeviceContext`] and runs the
//! cooperative loop: each tick logs a record when one is due, then serves at
//! most one request if a peer is connected. Logging and serving never
//! interleave within a tick.
//!
//! Bringing up the radio is the caller's job: it builds the link (and maps a
//! missing module to [`FatalInitError::RadioUnavailable`]) before handing it
//! over in the context.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::DeviceConfig;
use crate::datalog::{provision_info, LogRecord, Logger, LoggerError};
use crate::link::{LinkError, RadioLink};
use crate::protocol::{Command, ProtocolEngine, ProtocolError};
use crate::sensor::{BatteryMonitor, Sensor};
use crate::session::{SessionEvent, SessionMonitor};
use crate::storage::{Storage, StorageAccounting, StorageError};
use crate::time::Clock;

/// The board's capabilities, passed by reference to the logger and the
/// protocol engine
#[derive(Debug)]
pub struct DeviceContext<C, S, R, P, B> {
    /// Real-time clock
    pub clock: C,
    /// Removable storage
    pub storage: S,
    /// Link to the paired app
    pub radio: R,
    /// Logged input
    pub sensor: P,
    /// Supply voltage
    pub battery: B,
}

impl<C, S, R, P, B> DeviceContext<C, S, R, P, B> {
    /// Bundle the capabilities
    pub fn new(clock: C, storage: S, radio: R, sensor: P, battery: B) -> Self {
        Self {
            clock,
            storage,
            radio,
            sensor,
            battery,
        }
    }
}

/// Start-up failures; the device cannot run in any of these states
#[derive(Error, Debug)]
pub enum FatalInitError {
    /// The radio link could not be brought up; raised by whoever opens the link
    #[error("Radio module unavailable: {0}")]
    RadioUnavailable(#[from] LinkError),

    /// No card at start-up
    #[error("Storage medium not found")]
    StorageNotPresent,

    /// The info file could not be written on first boot
    #[error("Failed to provision info file: {0}")]
    Provisioning(#[source] StorageError),

    /// The configuration was rejected
    #[error("Invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Today's log file could not be opened
    #[error(transparent)]
    Logger(#[from] LoggerError),
}

/// Runtime failure that stops the loop
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Fatal error on the logging path
    #[error("Logging halted: {0}")]
    Logging(#[from] LoggerError),

    /// Fatal error while serving a request
    #[error("Logging halted while serving a request: {0}")]
    Protocol(#[from] ProtocolError),
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Record persisted this tick
    pub record: Option<LogRecord>,
    /// Request served this tick
    pub command: Option<Command>,
}

/// Decides when the next sample is due
#[derive(Debug, Clone)]
struct SampleTimer {
    interval: Duration,
    last_sample: Option<Instant>,
}

impl SampleTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sample: None,
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        match self.last_sample {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    fn mark(&mut self, now: Instant) {
        self.last_sample = Some(now);
    }
}

/// A running logger device
#[derive(Debug)]
pub struct Device<C, S, R, P, B> {
    ctx: DeviceContext<C, S, R, P, B>,
    logger: Logger,
    engine: ProtocolEngine,
    session: SessionMonitor,
    timer: SampleTimer,
    accounting: StorageAccounting,
}

impl<C, S, R, P, B> Device<C, S, R, P, B>
where
    C: Clock,
    S: Storage,
    R: RadioLink,
    P: Sensor,
    B: BatteryMonitor,
{
    /// Bring the device up
    ///
    /// Checks the medium, writes the info file on first boot, fixes the
    /// total capacity for the session and opens today's log file.
    pub fn initialize(
        mut ctx: DeviceContext<C, S, R, P, B>,
        config: &DeviceConfig,
    ) -> Result<Self, FatalInitError> {
        config.validate()?;
        if !ctx.storage.is_present() {
            error!("Storage medium not found");
            return Err(FatalInitError::StorageNotPresent);
        }

        let today = ctx.clock.now();
        provision_info(&mut ctx.storage, &today).map_err(FatalInitError::Provisioning)?;

        let accounting = StorageAccounting::new(ctx.storage.geometry());
        info!(
            "Storage ready: {} KB total",
            accounting.max_storage_kb()
        );

        let mut logger = Logger::new(config.rotation_threshold);
        logger.select_log_file(&mut ctx.storage, &ctx.clock)?;

        Ok(Self {
            ctx,
            logger,
            engine: ProtocolEngine::new(accounting),
            session: SessionMonitor::new(),
            timer: SampleTimer::new(Duration::from_millis(config.sample_interval_ms)),
            accounting,
        })
    }

    /// Run one tick now
    pub fn tick(&mut self) -> Result<TickReport, DeviceError> {
        self.tick_at(Instant::now())
    }

    /// Run one tick as if the time were `now`
    pub fn tick_at(&mut self, now: Instant) -> Result<TickReport, DeviceError> {
        let mut report = TickReport::default();

        if self.timer.is_due(now) {
            self.timer.mark(now);
            let ctx = &mut self.ctx;
            match self
                .logger
                .tick(&mut ctx.storage, &ctx.clock, &mut ctx.sensor)
            {
                Ok(record) => report.record = Some(record),
                Err(e) if e.is_fatal() => {
                    error!("{}", e);
                    return Err(e.into());
                }
                Err(e) => warn!("{}", e),
            }
        }

        match self.session.poll(&mut self.ctx.radio) {
            SessionEvent::Disconnected => self.engine.reset(),
            event if event.is_connected() => {
                match self.engine.pump(&mut self.ctx, &mut self.logger) {
                    Ok(command) => report.command = command,
                    Err(e) if e.is_fatal() => {
                        error!("{}", e);
                        return Err(e.into());
                    }
                    Err(e) => warn!("Request failed: {}", e),
                }
            }
            _ => {}
        }

        Ok(report)
    }

    /// Close the active log file and hand the capabilities back
    pub fn shutdown(mut self) -> Result<DeviceContext<C, S, R, P, B>, LoggerError> {
        self.logger.release(&mut self.ctx.storage)?;
        info!("Logger stopped after {} records", self.logger.stats().records_written);
        Ok(self.ctx)
    }

    /// Capabilities the device runs on
    pub fn context(&self) -> &DeviceContext<C, S, R, P, B> {
        &self.ctx
    }

    /// Mutable access to the capabilities
    pub fn context_mut(&mut self) -> &mut DeviceContext<C, S, R, P, B> {
        &mut self.ctx
    }

    /// Logger state
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Protocol engine state
    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }

    /// Storage figures fixed at start-up
    pub fn accounting(&self) -> &StorageAccounting {
        &self.accounting
    }

    /// Whether a peer was connected at the last tick
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }
}
