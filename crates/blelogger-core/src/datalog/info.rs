//! First-boot info file
//!
//! Written once when the card is first provisioned and read back by the
//! info request handler.

use tracing::info;

use super::format::{info_line, parse_info_line, INFO_FILE_NAME};
use crate::storage::{FileHandle, OpenMode, Storage, StorageError};
use crate::time::CalendarTime;

const READ_CHUNK: usize = 64;

/// Write the info file if it does not exist yet
///
/// Returns `true` when the file was created by this call.
pub fn provision_info<S: Storage + ?Sized>(
    storage: &mut S,
    today: &CalendarTime,
) -> Result<bool, StorageError> {
    if storage.exists(INFO_FILE_NAME) {
        return Ok(false);
    }
    let handle = storage.create(INFO_FILE_NAME)?;
    let written = storage
        .append(handle, info_line(today).as_bytes())
        .and_then(|_| storage.flush(handle));
    storage.close(handle)?;
    written?;
    info!("Provisioned {} with start date {}", INFO_FILE_NAME, today.date_string());
    Ok(true)
}

/// Start date recorded in the info file
///
/// Only the first line is read; `Ok(None)` means the line has no `=`.
pub fn read_start_date<S: Storage + ?Sized>(storage: &mut S) -> Result<Option<String>, StorageError> {
    let handle = storage.open(INFO_FILE_NAME, OpenMode::Read)?;
    let line = read_first_line(storage, handle);
    storage.close(handle)?;
    Ok(parse_info_line(&line?).map(str::to_string))
}

fn read_first_line<S: Storage + ?Sized>(
    storage: &mut S,
    handle: FileHandle,
) -> Result<String, StorageError> {
    let mut line = Vec::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = storage.read(handle, &mut buf)?;
        if n == 0 {
            break;
        }
        if let Some(end) = buf[..n].iter().position(|&b| b == b'\n') {
            line.extend_from_slice(&buf[..end]);
            break;
        }
        line.extend_from_slice(&buf[..n]);
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}
