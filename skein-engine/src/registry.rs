//! Listener registry.
//!
//! Endpoints of one [`Context`](crate::context::Context) find each other
//! through this table: `listen` binds an `(address, port)` pair to the
//! endpoint's core, `peer` resolves it.
//!
//! - Thread-safe: backed by `DashMap`
//! - Wildcard listeners (`0.0.0.0`, `::`, empty) accept any host
//! - `localhost` is an alias of `127.0.0.1`
//! - Port 0 allocates from the ephemeral range

use crate::hub::HubCmd;
use crate::error::{Error, Result};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use flume::Sender;
use skein_core::status::EndpointId;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

const EPHEMERAL_FIRST: u16 = 49152;
const EPHEMERAL_COUNT: u32 = (u16::MAX - EPHEMERAL_FIRST) as u32 + 1;
const WILDCARDS: [&str; 3] = ["0.0.0.0", "::", ""];

/// A bound listener.
#[derive(Debug, Clone)]
pub(crate) struct Listener {
    pub node: EndpointId,
    pub core: Sender<HubCmd>,
    /// Set once the owning core starts shutting down.
    pub closed: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    listeners: DashMap<(String, u16), Listener>,
    next_ephemeral: AtomicU32,
}

/// Canonical host form used as registry key.
pub(crate) fn normalize_host(address: &str) -> Result<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if trimmed.eq_ignore_ascii_case("localhost") {
        return Ok("127.0.0.1".to_owned());
    }
    let unbracketed = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    unbracketed
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| Error::invalid_address(address))
}

impl Registry {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bind `(address, port)` to an endpoint core.
    ///
    /// Returns the bound port, which differs from `port` only when `port` is 0.
    pub(crate) fn bind(&self, address: &str, port: u16, listener: Listener) -> Result<u16> {
        let host = normalize_host(address)?;
        if port != 0 {
            return self.bind_exact(host, port, listener);
        }
        for _ in 0..EPHEMERAL_COUNT {
            let offset = self.next_ephemeral.fetch_add(1, Ordering::Relaxed) % EPHEMERAL_COUNT;
            let candidate = EPHEMERAL_FIRST + offset as u16;
            if self.bind_exact(host.clone(), candidate, listener.clone()).is_ok() {
                return Ok(candidate);
            }
        }
        Err(Error::AddrInUse {
            address: host,
            port: 0,
        })
    }

    fn bind_exact(&self, host: String, port: u16, listener: Listener) -> Result<u16> {
        match self.listeners.entry((host, port)) {
            Entry::Occupied(e) if !e.get().core.is_disconnected() => Err(Error::AddrInUse {
                address: e.key().0.clone(),
                port,
            }),
            Entry::Occupied(mut e) => {
                // stale entry of an endpoint whose core already exited
                e.insert(listener);
                Ok(port)
            }
            Entry::Vacant(e) => {
                e.insert(listener);
                Ok(port)
            }
        }
    }

    /// Resolve a peer address to a live listener.
    pub(crate) fn lookup(&self, address: &str, port: u16) -> Option<Listener> {
        let host = normalize_host(address).ok()?;
        let found = std::iter::once(host.as_str())
            .chain(WILDCARDS)
            .filter_map(|h| self.listeners.get(&(h.to_owned(), port)))
            .map(|l| l.value().clone())
            .find(|l| !l.core.is_disconnected());
        found
    }

    /// Remove every listener owned by `node`.
    pub(crate) fn unbind_all(&self, node: EndpointId) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|_, l| l.node != node);
        before - self.listeners.len()
    }

    /// Currently bound `(address, port)` pairs, sorted.
    #[must_use]
    pub(crate) fn list(&self) -> Vec<(String, u16)> {
        let mut out: Vec<_> = self.listeners.iter().map(|e| e.key().clone()).collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener(id: u64) -> (Listener, flume::Receiver<HubCmd>) {
        let (tx, rx) = flume::unbounded();
        (
            Listener {
                node: EndpointId(id),
                core: tx,
                closed: Arc::default(),
            },
            rx,
        )
    }

    #[test]
    fn bind_and_lookup() {
        let reg = Registry::new();
        let (l, _rx) = listener(1);
        assert_eq!(reg.bind("127.0.0.1", 9999, l).unwrap(), 9999);
        assert_eq!(reg.lookup("localhost", 9999).unwrap().node, EndpointId(1));
        assert!(reg.lookup("127.0.0.1", 9998).is_none());
        assert!(reg.lookup("10.0.0.1", 9999).is_none());
    }

    #[test]
    fn duplicate_bind_fails() {
        let reg = Registry::new();
        let (a, _ra) = listener(1);
        let (b, _rb) = listener(2);
        reg.bind("127.0.0.1", 4000, a).unwrap();
        assert!(matches!(
            reg.bind("127.0.0.1", 4000, b),
            Err(Error::AddrInUse { port: 4000, .. })
        ));
    }

    #[test]
    fn stale_listener_is_replaced() {
        let reg = Registry::new();
        let (a, ra) = listener(1);
        reg.bind("127.0.0.1", 4000, a).unwrap();
        drop(ra);
        assert!(reg.lookup("127.0.0.1", 4000).is_none());
        let (b, _rb) = listener(2);
        assert_eq!(reg.bind("127.0.0.1", 4000, b).unwrap(), 4000);
    }

    #[test]
    fn wildcard_matches_any_host() {
        let reg = Registry::new();
        let (l, _rx) = listener(3);
        reg.bind("0.0.0.0", 5000, l).unwrap();
        assert_eq!(reg.lookup("127.0.0.1", 5000).unwrap().node, EndpointId(3));
    }

    #[test]
    fn ephemeral_ports_are_distinct() {
        let reg = Registry::new();
        let (a, _ra) = listener(1);
        let (b, _rb) = listener(1);
        let p1 = reg.bind("127.0.0.1", 0, a).unwrap();
        let p2 = reg.bind("127.0.0.1", 0, b).unwrap();
        assert!(p1 >= EPHEMERAL_FIRST);
        assert_ne!(p1, p2);
        assert_eq!(reg.unbind_all(EndpointId(1)), 2);
        assert!(reg.list().is_empty());
    }

    #[test]
    fn rejects_garbage_address() {
        let reg = Registry::new();
        let (l, _rx) = listener(1);
        assert!(matches!(
            reg.bind("not an address", 1, l),
            Err(Error::InvalidAddress(_))
        ));
    }
}
