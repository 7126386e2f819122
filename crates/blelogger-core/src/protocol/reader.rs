//! Inbound command buffering
//!
//! The link delivers bytes with no framing of its own. A command ends at a
//! newline; if a drain ends without one, whatever arrived is taken as the
//! whole command, which is how the app has always talked to the device.

use super::MAX_COMMAND_LEN;
use crate::link::RadioLink;

/// Byte buffer that splits link input into commands
#[derive(Debug, Default)]
pub struct CommandReader {
    buf: Vec<u8>,
}

impl CommandReader {
    /// Empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Move every available byte from the link into the buffer
    ///
    /// Stops early once `MAX_COMMAND_LEN` bytes follow the last newline in
    /// the buffer; the rest stays queued on the link. Returns the number of
    /// bytes moved.
    pub fn drain<R: RadioLink + ?Sized>(&mut self, link: &mut R) -> usize {
        let mut moved = 0;
        let mut tail = self.unterminated_len();
        while tail < MAX_COMMAND_LEN && link.available() > 0 {
            match link.read() {
                Some(byte) => {
                    self.buf.push(byte);
                    moved += 1;
                    tail = if byte == b'\n' { 0 } else { tail + 1 };
                }
                None => break,
            }
        }
        moved
    }

    /// Bytes after the last newline
    fn unterminated_len(&self) -> usize {
        match self.buf.iter().rposition(|&b| b == b'\n') {
            Some(pos) => self.buf.len() - pos - 1,
            None => self.buf.len(),
        }
    }

    /// Take the next complete command, without its line ending
    pub fn next_command(&mut self) -> Option<String> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = strip_line_ending(&line[..pos]);
            if !text.is_empty() {
                return Some(String::from_utf8_lossy(text).into_owned());
            }
        }
        if self.buf.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        let text = strip_line_ending(&line);
        if text.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(text).into_owned())
    }

    /// Bytes waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Discard anything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
