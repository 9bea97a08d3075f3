//! Key-value stores attached to endpoints.
//!
//! A master owns the data; clones on the same endpoint or on a peer resolve
//! the master and read and write through it. When the master's endpoint
//! shuts down, the master handle reports `Closed` and clones report
//! `StaleData`.

use crate::error::{Error, Result};

use hashbrown::HashMap;
use parking_lot::Mutex;
use skein_core::convert::IntoData;
use skein_core::data::{Data, Set, Table};
use skein_core::status::{EndpointId, ErrorCode};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Role of a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frontend {
    Master,
    Clone,
}

/// Storage engine behind a master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    #[default]
    Memory,
}

/// Backend-specific options.
///
/// The memory backend understands `"initial_capacity"` (a count).
pub type BackendOptions = Table;

/// Storage operations a master delegates to.
pub trait StoreBackend: Send {
    fn put(&mut self, key: Data, value: Data);
    fn get(&self, key: &Data) -> Option<Data>;
    fn exists(&self, key: &Data) -> bool;
    fn erase(&mut self, key: &Data) -> bool;
    fn clear(&mut self);
    fn keys(&self) -> Set;
    fn size(&self) -> usize;
}

/// In-memory hash table backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<Data, Data>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: &BackendOptions) -> Self {
        let capacity = options
            .get(&Data::from("initial_capacity"))
            .and_then(Data::as_count)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }
}

impl StoreBackend for MemoryBackend {
    fn put(&mut self, key: Data, value: Data) {
        self.entries.insert(key, value);
    }

    fn get(&self, key: &Data) -> Option<Data> {
        self.entries.get(key).cloned()
    }

    fn exists(&self, key: &Data) -> bool {
        self.entries.contains_key(key)
    }

    fn erase(&mut self, key: &Data) -> bool {
        self.entries.remove(key).is_some()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn keys(&self) -> Set {
        self.entries.keys().cloned().collect()
    }

    fn size(&self) -> usize {
        self.entries.len()
    }
}

impl Backend {
    pub(crate) fn open(self, options: &BackendOptions) -> Box<dyn StoreBackend> {
        match self {
            Self::Memory => Box::new(MemoryBackend::with_options(options)),
        }
    }
}

/// A master's data, shared by every handle that resolved it.
pub(crate) struct MasterState {
    name: String,
    owner: EndpointId,
    backend: Mutex<Box<dyn StoreBackend>>,
    closed: AtomicBool,
}

impl fmt::Debug for MasterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterState")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl MasterState {
    pub fn new(name: impl Into<String>, owner: EndpointId, backend: Box<dyn StoreBackend>) -> Self {
        Self {
            name: name.into(),
            owner,
            backend: Mutex::new(backend),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            trace!(store = %self.name, owner = %self.owner, "[STORE] Master closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Handle to a master or clone store.
///
/// # Examples
///
/// ```
/// use skein_engine::context::Context;
/// use skein_engine::store::{Backend, BackendOptions};
///
/// let ctx = Context::new();
/// let ep = ctx.endpoint().unwrap();
/// let store = ep.attach_master("kv", Backend::Memory, BackendOptions::new()).unwrap();
/// store.put("a", 1u64).unwrap();
/// assert_eq!(store.get("a").unwrap(), Some(1u64.into()));
/// ```
#[derive(Clone)]
pub struct Store {
    frontend: Frontend,
    state: Arc<MasterState>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.state.name)
            .field("frontend", &self.frontend)
            .finish()
    }
}

impl Store {
    pub(crate) fn new(frontend: Frontend, state: Arc<MasterState>) -> Self {
        Self { frontend, state }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    #[must_use]
    pub const fn frontend(&self) -> Frontend {
        self.frontend
    }

    fn with_backend<R>(&self, f: impl FnOnce(&mut dyn StoreBackend) -> R) -> Result<R> {
        if self.state.is_closed() {
            return Err(match self.frontend {
                Frontend::Master => Error::Closed,
                Frontend::Clone => Error::Store(ErrorCode::StaleData),
            });
        }
        let mut backend = self.state.backend.lock();
        Ok(f(backend.as_mut()))
    }

    /// Insert or overwrite `key`.
    pub fn put(&self, key: impl IntoData, value: impl IntoData) -> Result<()> {
        let key = key.into_data()?;
        let value = value.into_data()?;
        self.with_backend(|b| b.put(key, value))
    }

    pub fn get(&self, key: impl IntoData) -> Result<Option<Data>> {
        let key = key.into_data()?;
        self.with_backend(|b| b.get(&key))
    }

    pub fn exists(&self, key: impl IntoData) -> Result<bool> {
        let key = key.into_data()?;
        self.with_backend(|b| b.exists(&key))
    }

    /// Remove `key`; `Ok(false)` if it was absent.
    pub fn erase(&self, key: impl IntoData) -> Result<bool> {
        let key = key.into_data()?;
        self.with_backend(|b| b.erase(&key))
    }

    pub fn clear(&self) -> Result<()> {
        self.with_backend(|b| b.clear())
    }

    pub fn keys(&self) -> Result<Set> {
        self.with_backend(|b| b.keys())
    }

    pub fn size(&self) -> Result<usize> {
        self.with_backend(|b| b.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master() -> Arc<MasterState> {
        Arc::new(MasterState::new(
            "test",
            EndpointId(1),
            Backend::Memory.open(&BackendOptions::new()),
        ))
    }

    #[test]
    fn memory_backend_basics() {
        let mut b = MemoryBackend::new();
        b.put(Data::from("k"), Data::from(1u64));
        b.put(Data::from("k"), Data::from(2u64));
        assert_eq!(b.size(), 1);
        assert_eq!(b.get(&Data::from("k")), Some(Data::Count(2)));
        assert!(b.erase(&Data::from("k")));
        assert!(!b.erase(&Data::from("k")));
        assert!(!b.exists(&Data::from("k")));
    }

    #[test]
    fn initial_capacity_option() {
        let mut opts = BackendOptions::new();
        opts.insert(Data::from("initial_capacity"), Data::Count(128));
        let b = MemoryBackend::with_options(&opts);
        assert!(b.entries.capacity() >= 128);
    }

    #[test]
    fn clone_sees_master_writes() {
        let state = master();
        let m = Store::new(Frontend::Master, state.clone());
        let c = Store::new(Frontend::Clone, state);
        m.put("x", -3i64).unwrap();
        assert_eq!(c.get("x").unwrap(), Some(Data::Integer(-3)));
        c.put("y", true).unwrap();
        assert_eq!(m.keys().unwrap().len(), 2);
        m.clear().unwrap();
        assert_eq!(c.size().unwrap(), 0);
    }

    #[test]
    fn closed_master() {
        let state = master();
        let m = Store::new(Frontend::Master, state.clone());
        let c = Store::new(Frontend::Clone, state.clone());
        state.close();
        assert!(matches!(m.get("x"), Err(Error::Closed)));
        assert!(matches!(c.get("x"), Err(Error::Store(ErrorCode::StaleData))));
    }
}
