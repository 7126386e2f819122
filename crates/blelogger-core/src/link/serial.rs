//! UART-attached radio
//!
//! HM-10 / HC-05 style modules bridge BLE or classic Bluetooth to a serial
//! port. The module's connection state is reported on a modem line when it
//! is wired up; otherwise the link counts as connected while the port is
//! open.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use tracing::debug;

use super::{LinkError, RadioLink};

/// Where the module reports its connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionSignal {
    /// No state line; treat an open port as connected
    #[default]
    Always,
    /// STATE pin wired to the adapter's carrier-detect input
    CarrierDetect,
    /// STATE pin wired to the adapter's data-set-ready input
    DataSetReady,
}

/// Radio module on a serial port
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    signal: ConnectionSignal,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

/// Open and configure a serial port for the radio module (8N1, no flow control)
pub fn open_serial_link(
    name: &str,
    baud: u32,
    signal: ConnectionSignal,
) -> Result<SerialLink, LinkError> {
    let port = serialport::new(name, baud)
        .timeout(Duration::from_millis(10))
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => LinkError::NotFound(name.to_string()),
            _ => LinkError::SerialError(e.to_string()),
        })?;
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| LinkError::SerialError(e.to_string()))?;
    Ok(SerialLink::new(port, signal))
}

impl SerialLink {
    /// Wrap an already configured port
    pub fn new(port: Box<dyn SerialPort>, signal: ConnectionSignal) -> Self {
        Self {
            port,
            signal,
            rx: VecDeque::new(),
            tx: Vec::new(),
        }
    }

    fn fill_rx(&mut self) {
        let pending = match self.port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => {
                debug!("bytes_to_read failed: {}", e);
                return;
            }
        };
        if pending == 0 {
            return;
        }
        let mut buf = vec![0u8; pending];
        match self.port.read(&mut buf) {
            Ok(n) => self.rx.extend(&buf[..n]),
            Err(e) => debug!("Serial read failed: {}", e),
        }
    }
}

impl RadioLink for SerialLink {
    fn is_connected(&mut self) -> bool {
        let line = match self.signal {
            ConnectionSignal::Always => return true,
            ConnectionSignal::CarrierDetect => self.port.read_carrier_detect(),
            ConnectionSignal::DataSetReady => self.port.read_data_set_ready(),
        };
        line.unwrap_or(false)
    }

    fn available(&mut self) -> usize {
        self.fill_rx();
        self.rx.len()
    }

    fn read(&mut self) -> Option<u8> {
        if self.rx.is_empty() {
            self.fill_rx();
        }
        self.rx.pop_front()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        let result = self.port.write_all(&self.tx).and_then(|_| self.port.flush());
        self.tx.clear();
        result?;
        Ok(())
    }
}
