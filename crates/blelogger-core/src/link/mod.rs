//! Radio link
//!
//! The wireless module appears to the firmware as a connection-oriented
//! byte pipe: a connected flag, a non-blocking receive side and a buffered
//! transmit side. Adapters cover an in-memory pipe for tests, a TCP socket
//! for desktop runs and a UART-attached BLE module.

mod memory;
mod serial;
mod tcp;

pub use memory::MemoryLink;
pub use serial::{open_serial_link, ConnectionSignal, SerialLink};
pub use tcp::TcpLink;

use thiserror::Error;

/// Errors raised by a radio link
#[derive(Error, Debug)]
pub enum LinkError {
    /// The module or port does not exist
    #[error("Radio module not found: {0}")]
    NotFound(String),

    /// Write attempted with nobody on the other end
    #[error("No peer connected")]
    NotConnected,

    /// The serial driver rejected an operation
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Socket or port I/O failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Byte transport to the paired peer
pub trait RadioLink {
    /// Whether a peer is currently connected
    fn is_connected(&mut self) -> bool;

    /// Number of received bytes ready to read without blocking
    fn available(&mut self) -> usize;

    /// Next received byte, if any
    fn read(&mut self) -> Option<u8>;

    /// Queue bytes for transmission
    fn write(&mut self, data: &[u8]) -> Result<(), LinkError>;

    /// Push queued bytes out to the peer
    fn flush(&mut self) -> Result<(), LinkError>;
}
