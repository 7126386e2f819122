//! Request dispatch
//!
//! Drains the link, picks off one complete command per pump and runs its
//! handler to completion before returning.

use tracing::{debug, info, warn};

use super::frame::{file_download_header, file_download_trailer, Response};
use super::{Command, CommandReader, ProtocolError};
use crate::datalog::{read_start_date, Logger, INFO_FILE_NAME};
use crate::device::DeviceContext;
use crate::link::RadioLink;
use crate::sensor::{BatteryMonitor, Sensor};
use crate::storage::{FileHandle, OpenMode, Storage, StorageAccounting, StorageError};
use crate::time::Clock;

/// Chunk size used when streaming a file to the link
const STREAM_CHUNK: usize = 64;

/// Outcome of serving a file request
#[derive(Debug)]
enum Download {
    Sent(u64),
    NotOpened(StorageError),
    Truncated(u64, StorageError),
}

/// Command parser and request handlers
#[derive(Debug)]
pub struct ProtocolEngine {
    reader: CommandReader,
    accounting: StorageAccounting,
    commands_handled: u64,
}

impl ProtocolEngine {
    /// Engine reporting storage figures from `accounting`
    pub fn new(accounting: StorageAccounting) -> Self {
        Self {
            reader: CommandReader::new(),
            accounting,
            commands_handled: 0,
        }
    }

    /// Commands served since start
    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }

    /// Drop any partially received command
    pub fn reset(&mut self) {
        if self.reader.buffered() > 0 {
            debug!("Discarding {} buffered bytes", self.reader.buffered());
        }
        self.reader.clear();
    }

    /// Drain the link and serve at most one command
    ///
    /// Returns the command that was handled, if any.
    pub fn pump<C, S, R, P, B>(
        &mut self,
        ctx: &mut DeviceContext<C, S, R, P, B>,
        logger: &mut Logger,
    ) -> Result<Option<Command>, ProtocolError>
    where
        C: Clock,
        S: Storage,
        R: RadioLink,
        P: Sensor,
        B: BatteryMonitor,
    {
        self.reader.drain(&mut ctx.radio);
        let Some(text) = self.reader.next_command() else {
            return Ok(None);
        };
        let command = Command::parse(&text);
        debug!("Received {} command: {:?}", command.kind(), text);
        self.dispatch(&command, ctx, logger)?;
        self.commands_handled += 1;
        Ok(Some(command))
    }

    fn dispatch<C, S, R, P, B>(
        &mut self,
        command: &Command,
        ctx: &mut DeviceContext<C, S, R, P, B>,
        logger: &mut Logger,
    ) -> Result<(), ProtocolError>
    where
        C: Clock,
        S: Storage,
        R: RadioLink,
        P: Sensor,
        B: BatteryMonitor,
    {
        match command {
            Command::DownloadRequest => {
                let response = self.file_list(&ctx.storage)?;
                send(&mut ctx.radio, &response)
            }
            Command::InfoRequest => {
                let response = self.info(ctx, logger)?;
                send(&mut ctx.radio, &response)
            }
            Command::FileRequest(name) => self.serve_file(name, ctx, logger),
            Command::Unknown(text) => {
                warn!("Unrecognised command {:?}", text);
                send(&mut ctx.radio, &Response::BadCommand(text.clone()))
            }
        }
    }

    /// Every root entry except the info file
    fn file_list<S: Storage>(&self, storage: &S) -> Result<Response, StorageError> {
        let names: Vec<String> = storage
            .entries()?
            .into_iter()
            .map(|e| e.name)
            .filter(|name| !name.eq_ignore_ascii_case(INFO_FILE_NAME))
            .collect();
        debug!("Listing {} files", names.len());
        Ok(Response::Files(names))
    }

    /// Info frame; the info file is read with the logger's handle released
    fn info<C, S, R, P, B>(
        &self,
        ctx: &mut DeviceContext<C, S, R, P, B>,
        logger: &mut Logger,
    ) -> Result<Response, ProtocolError>
    where
        C: Clock,
        S: Storage,
        R: RadioLink,
        P: Sensor,
        B: BatteryMonitor,
    {
        let read = logger.with_file_released(&mut ctx.storage, &ctx.clock, |storage| {
            read_start_date(storage)
        })?;
        let start_date = match read {
            Ok(Some(date)) => date,
            Ok(None) => {
                warn!("{} has no start date", INFO_FILE_NAME);
                String::new()
            }
            Err(e) => {
                warn!("Cannot read {}: {}", INFO_FILE_NAME, e);
                String::new()
            }
        };
        Ok(Response::Info {
            start_date,
            voltage: ctx.battery.voltage(),
            storage_kb: self.accounting.current_storage_kb(&ctx.storage)?,
            total_kb: self.accounting.max_storage_kb(),
        })
    }

    /// Stream one file with the logger's handle released
    fn serve_file<C, S, R, P, B>(
        &mut self,
        name: &str,
        ctx: &mut DeviceContext<C, S, R, P, B>,
        logger: &mut Logger,
    ) -> Result<(), ProtocolError>
    where
        C: Clock,
        S: Storage,
        R: RadioLink,
        P: Sensor,
        B: BatteryMonitor,
    {
        let radio = &mut ctx.radio;
        let outcome = logger.with_file_released(&mut ctx.storage, &ctx.clock, |storage| {
            stream_file(storage, &mut *radio, name)
        })?;

        match outcome? {
            Download::Sent(bytes) => {
                info!("Sent {} ({} bytes)", name, bytes);
                Ok(())
            }
            Download::NotOpened(e) => {
                warn!("Cannot open requested file {}: {}", name, e);
                send(radio, &Response::FileError(name.to_string()))
            }
            Download::Truncated(bytes, e) => {
                warn!("Read of {} failed after {} bytes: {}", name, bytes, e);
                send(radio, &Response::FileError(name.to_string()))
            }
        }
    }
}

fn send<R: RadioLink + ?Sized>(link: &mut R, response: &Response) -> Result<(), ProtocolError> {
    link.write(&response.encode())?;
    link.flush()?;
    Ok(())
}

/// Write `%FILEDL%&<name>&<content>&%END%` to the link
///
/// A read failure part-way still closes the frame so the peer stays in
/// sync; the caller follows it with an error frame.
fn stream_file<S, R>(storage: &mut S, link: &mut R, name: &str) -> Result<Download, ProtocolError>
where
    S: Storage + ?Sized,
    R: RadioLink + ?Sized,
{
    let handle = match storage.open(name, OpenMode::Read) {
        Ok(handle) => handle,
        Err(e) => return Ok(Download::NotOpened(e)),
    };

    let streamed = stream_contents(storage, link, handle, name);
    storage.close(handle)?;
    streamed
}

fn stream_contents<S, R>(
    storage: &mut S,
    link: &mut R,
    handle: FileHandle,
    name: &str,
) -> Result<Download, ProtocolError>
where
    S: Storage + ?Sized,
    R: RadioLink + ?Sized,
{
    link.write(&file_download_header(name))?;
    let mut sent = 0u64;
    let mut buf = [0u8; STREAM_CHUNK];
    let read_error = loop {
        match storage.read(handle, &mut buf) {
            Ok(0) => break None,
            Ok(n) => {
                link.write(&buf[..n])?;
                sent += n as u64;
            }
            Err(e) => break Some(e),
        }
    };
    link.write(&file_download_trailer())?;
    link.flush()?;

    Ok(match read_error {
        None => Download::Sent(sent),
        Some(e) => Download::Truncated(sent, e),
    })
}
