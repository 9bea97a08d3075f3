//! Readiness flare.
//!
//! A pair of connected Unix sockets: writing one byte makes the read end
//! readable so that `select`/`poll`/`epoll` loops can wait on a mailbox.
//! The flare is level-triggered: it stays readable until extinguished.

use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

#[derive(Debug)]
pub struct Flare {
    read: UnixStream,
    write: UnixStream,
    lit: AtomicBool,
}

impl Flare {
    /// Create an unlit flare.
    pub fn new() -> io::Result<Self> {
        let (read, write) = UnixStream::pair()?;
        read.set_nonblocking(true)?;
        write.set_nonblocking(true)?;
        Ok(Self {
            read,
            write,
            lit: AtomicBool::new(false),
        })
    }

    /// Make the descriptor readable. Idempotent.
    pub fn fire(&self) {
        if !self.lit.swap(true, Ordering::SeqCst) {
            match (&self.write).write(&[1]) {
                Ok(_) => {}
                // the socket buffer already holds bytes
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => warn!("[FLARE] Failed to signal readiness: {}", e),
            }
        }
    }

    /// Make the descriptor unreadable again.
    ///
    /// The socket is drained while the flare still counts as lit, so a
    /// concurrent `fire` either sees it lit and writes nothing, or runs after
    /// the reset and writes a fresh byte. The caller must re-check its queue
    /// afterwards and fire again if it is not empty.
    pub fn extinguish(&self) {
        if self.lit.load(Ordering::Acquire) {
            self.drain();
            self.lit.store(false, Ordering::SeqCst);
        }
    }

    fn drain(&self) {
        let mut sink = [0u8; 64];
        while matches!((&self.read).read(&mut sink), Ok(n) if n > 0) {}
    }

    #[must_use]
    pub fn is_lit(&self) -> bool {
        self.lit.load(Ordering::Acquire)
    }

    /// The descriptor to poll for readability.
    #[must_use]
    pub fn fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }
}
