//! Desktop runner for the BLE logger
//!
//! Usage: blelogger-sim [config.json]
//!
//! Logs simulated sensor readings into a directory standing in for the card
//! and serves the phone app protocol over TCP or a serial-attached radio.
//! Set `RUST_LOG` to adjust log output.

mod config;
mod sim;

use std::time::Duration;

use anyhow::{Context, Result};
use blelogger_core::config::load_json;
use blelogger_core::device::{Device, DeviceContext, FatalInitError};
use blelogger_core::link::{open_serial_link, RadioLink, TcpLink};
use blelogger_core::storage::FsStorage;
use blelogger_core::time::SystemClock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{LinkConfig, SimConfig};
use crate::sim::{SimulatedBattery, SimulatedSensor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_json::<SimConfig, _>(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => SimConfig::default(),
    };
    info!("blelogger-sim {}", blelogger_core::VERSION);

    std::fs::create_dir_all(&config.storage_dir).with_context(|| {
        format!("Failed to create card directory {}", config.storage_dir.display())
    })?;

    match &config.link {
        LinkConfig::Tcp { addr } => {
            let link = TcpLink::bind(addr.as_str()).map_err(FatalInitError::RadioUnavailable)?;
            info!("Waiting for a client on {}", link.local_addr()?);
            run(link, &config).await
        }
        LinkConfig::Serial { port, baud, signal } => {
            let link =
                open_serial_link(port, *baud, *signal).map_err(FatalInitError::RadioUnavailable)?;
            info!("Radio module on {} at {} baud", port, baud);
            run(link, &config).await
        }
    }
}

async fn run<R: RadioLink>(link: R, config: &SimConfig) -> Result<()> {
    let ctx = DeviceContext::new(
        SystemClock,
        FsStorage::new(&config.storage_dir, config.geometry),
        link,
        SimulatedSensor::new(config.seed),
        SimulatedBattery::new(config.seed),
    );
    let mut device = Device::initialize(ctx, &config.device)?;
    if let Some(name) = device.logger().active_file_name() {
        info!("Logging to {}", config.storage_dir.join(name).display());
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Shutdown requested");
                break Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = device.tick() {
                    error!("Device halted: {}", e);
                    break Err(e);
                }
            }
        }
    };

    let stats = device.logger().stats();
    let served = device.engine().commands_handled();
    if let Err(e) = device.shutdown() {
        warn!("{}", e);
    }
    info!(
        "Stopped after {} records, {} rotations, {} requests",
        stats.records_written, stats.rotations, served
    );
    Ok(outcome?)
}
