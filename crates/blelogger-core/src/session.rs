//! Connection monitoring
//!
//! Watches the link's connected flag from tick to tick and reports edges,
//! so the scheduler can gate the protocol engine and drop stale input.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::link::RadioLink;

/// What the last poll observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A peer connected since the previous poll
    Connected,
    /// The peer went away since the previous poll
    Disconnected,
    /// Still connected
    Active,
    /// Still disconnected
    Idle,
}

impl SessionEvent {
    /// Whether the protocol engine should run this tick
    pub fn is_connected(self) -> bool {
        matches!(self, SessionEvent::Connected | SessionEvent::Active)
    }
}

/// Connection edge detector
#[derive(Debug, Default)]
pub struct SessionMonitor {
    connected: bool,
    sessions: u64,
}

impl SessionMonitor {
    /// Monitor that starts out disconnected
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the link's connection state
    pub fn poll<R: RadioLink + ?Sized>(&mut self, link: &mut R) -> SessionEvent {
        let now = link.is_connected();
        let event = match (self.connected, now) {
            (false, true) => {
                self.sessions += 1;
                info!("Session {} started", self.sessions);
                SessionEvent::Connected
            }
            (true, false) => {
                info!("Session {} ended", self.sessions);
                SessionEvent::Disconnected
            }
            (true, true) => SessionEvent::Active,
            (false, false) => SessionEvent::Idle,
        };
        self.connected = now;
        event
    }

    /// Connection state seen by the last poll
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Sessions started since boot
    pub fn sessions(&self) -> u64 {
        self.sessions
    }
}
