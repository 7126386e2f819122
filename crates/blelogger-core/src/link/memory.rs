//! In-memory link
//!
//! Inbound bytes are scripted by the caller; outbound bytes are captured once
//! flushed.

use std::collections::VecDeque;

use super::{LinkError, RadioLink};

/// Scripted link for tests; starts disconnected
#[derive(Debug, Default)]
pub struct MemoryLink {
    connected: bool,
    inbound: VecDeque<u8>,
    pending: Vec<u8>,
    sent: Vec<u8>,
    flushes: usize,
}

impl MemoryLink {
    /// A link with a peer already attached
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    /// Attach or detach the peer
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Make bytes available to the receiver
    pub fn push_inbound(&mut self, data: impl AsRef<[u8]>) {
        self.inbound.extend(data.as_ref());
    }

    /// Bytes not yet drained by the receiver
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Everything flushed so far
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Flushed output as text
    pub fn sent_str(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }

    /// Take the flushed output, leaving the capture empty
    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }

    /// Number of flush calls observed
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl RadioLink for MemoryLink {
    fn is_connected(&mut self) -> bool {
        self.connected
    }

    fn available(&mut self) -> usize {
        self.inbound.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.inbound.pop_front()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.pending.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.flushes += 1;
        self.sent.append(&mut self.pending);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_visible_after_flush() {
        let mut link = MemoryLink::connected();
        link.write(b"abc").unwrap();
        assert!(link.sent().is_empty());
        link.flush().unwrap();
        assert_eq!(link.sent(), b"abc");
        assert_eq!(link.flush_count(), 1);
    }

    #[test]
    fn test_disconnected_write_fails() {
        let mut link = MemoryLink::default();
        assert!(matches!(link.write(b"x"), Err(LinkError::NotConnected)));
    }

    #[test]
    fn test_read_drains_inbound() {
        let mut link = MemoryLink::connected();
        link.push_inbound("hi");
        assert_eq!(link.available(), 2);
        assert_eq!(link.read(), Some(b'h'));
        assert_eq!(link.read(), Some(b'i'));
        assert_eq!(link.read(), None);
    }
}
