//! TCP link
//!
//! Stands in for the radio when the device loop runs on a desktop: a
//! listening socket accepts one peer at a time, and further connection
//! attempts are refused while a session is active.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use super::{LinkError, RadioLink};

/// Radio stand-in backed by a TCP listener
pub struct TcpLink {
    listener: TcpListener,
    peer: Option<TcpStream>,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl TcpLink {
    /// Bind a non-blocking listener
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, LinkError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            peer: None,
            rx: VecDeque::new(),
            tx: Vec::new(),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.listener.local_addr()?)
    }

    fn accept_pending(&mut self) {
        match self.listener.accept() {
            Ok((stream, addr)) => {
                if self.peer.is_some() {
                    debug!("Refusing second peer {}", addr);
                    return;
                }
                if let Err(e) = stream.set_nonblocking(true) {
                    debug!("Dropping peer {}: {}", addr, e);
                    return;
                }
                info!("Peer connected from {}", addr);
                self.peer = Some(stream);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => debug!("Accept failed: {}", e),
        }
    }

    fn drop_peer(&mut self) {
        if self.peer.take().is_some() {
            info!("Peer disconnected");
        }
        self.rx.clear();
        self.tx.clear();
    }

    /// Pull whatever the socket has without blocking
    fn fill_rx(&mut self) {
        let Some(stream) = self.peer.as_mut() else {
            return;
        };
        let mut buf = [0u8; 512];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    self.drop_peer();
                    return;
                }
                Ok(n) => self.rx.extend(&buf[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Read failed: {}", e);
                    self.drop_peer();
                    return;
                }
            }
        }
    }
}

impl RadioLink for TcpLink {
    fn is_connected(&mut self) -> bool {
        self.accept_pending();
        self.fill_rx();
        self.peer.is_some()
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
        if self.peer.is_none() {
            return Err(LinkError::NotConnected);
        }
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        let Some(stream) = self.peer.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        // Blocking for the duration of the write so large downloads are not
        // cut short by a full socket buffer.
        stream.set_nonblocking(false)?;
        let result = stream.write_all(&self.tx).and_then(|_| stream.flush());
        stream.set_nonblocking(true)?;
        self.tx.clear();
        if let Err(e) = result {
            self.drop_peer();
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_tcp_round_trip() {
        let mut link = TcpLink::bind("127.0.0.1:0").unwrap();
        let addr = link.local_addr().unwrap();
        assert!(!link.is_connected());

        let mut client = TcpStream::connect(addr).unwrap();
        assert!(wait_until(|| link.is_connected()));

        client.write_all(b"REQ+DATA").unwrap();
        assert!(wait_until(|| link.available() == 8));
        let received: Vec<u8> = std::iter::from_fn(|| link.read()).collect();
        assert_eq!(received, b"REQ+DATA");

        link.write(b"%END%").unwrap();
        link.flush().unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"%END%");

        drop(client);
        assert!(wait_until(|| !link.is_connected()));
    }
}
