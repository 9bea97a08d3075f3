//! The endpoint facade.
//!
//! An [`Endpoint`] owns one core thread. Every method here is a thin
//! front that validates and converts on the caller's thread, then hands a
//! command to the core.
//!
//! ```text
//! Created ──listen──▶ Listening ──peer──▶ Peered
//!    │                    │                  │
//!    └────────────────────┴──── shutdown ────┴──▶ Shutdown
//! ```

use crate::config::EndpointConfig;
use crate::hub::{Hub, HubCmd, HubHandle, PeerInfo, Shared, Sink};
use crate::error::{Error, Result};
use crate::publisher::Publisher;
use crate::registry::{Listener, Registry};
use crate::store::{Backend, BackendOptions, Frontend, MasterState, Store};
use crate::subscriber::{StatusSubscriber, Subscriber};

use flume::Sender;
use parking_lot::Mutex;
use skein_core::codec;
use skein_core::convert::IntoData;
use skein_core::mailbox;
use skein_core::message::Message;
use skein_core::status::{EndpointId, ErrorCode, NetworkInfo, Status};
use skein_core::topic::{topics, Topic};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Coarse lifecycle stage of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointState {
    Created,
    Listening,
    Peered,
    Shutdown,
}

/// A publish/subscribe participant.
///
/// Created through [`Context::endpoint`](crate::context::Context::endpoint).
/// Dropping an endpoint shuts it down.
pub struct Endpoint {
    pub(crate) core: HubHandle,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.core.shared.id)
            .field("state", &self.state())
            .finish()
    }
}

fn random_id() -> EndpointId {
    loop {
        let id = EndpointId(rand::random());
        if !id.is_unknown() {
            return id;
        }
    }
}

impl Endpoint {
    pub(crate) fn spawn(registry: Arc<Registry>, config: EndpointConfig) -> Result<Self> {
        let id = random_id();
        let shared = Arc::new(Shared::new(id, config, registry));
        let (tx, rx) = flume::unbounded();
        let core = Hub::new(shared.clone(), tx.clone(), rx);
        let thread = thread::Builder::new()
            .name(format!("skein-core-{id}"))
            .spawn(move || core.run())?;
        debug!(endpoint = %id, "[ENDPOINT] Spawned");
        Ok(Self {
            core: HubHandle { tx, shared },
            thread: Mutex::new(Some(thread)),
        })
    }

    #[must_use]
    pub fn id(&self) -> EndpointId {
        self.core.shared.id
    }

    #[must_use]
    pub fn config(&self) -> &EndpointConfig {
        &self.core.shared.config
    }

    #[must_use]
    pub fn state(&self) -> EndpointState {
        let shared = &self.core.shared;
        if shared.is_closed() {
            EndpointState::Shutdown
        } else if shared.peers.load(Ordering::Acquire) > 0 {
            EndpointState::Peered
        } else if shared.listeners.load(Ordering::Acquire) > 0 {
            EndpointState::Listening
        } else {
            EndpointState::Created
        }
    }

    // --- peering ---

    /// Accept peerings on `address:port`; port 0 picks a free port.
    ///
    /// Calling `listen` again adds another listener. Returns the bound port.
    pub fn listen(&self, address: &str, port: u16) -> Result<u16> {
        self.core.ensure_open()?;
        let listener = Listener {
            node: self.id(),
            core: self.core.tx.clone(),
            closed: self.core.shared.closed.clone(),
        };
        let bound = self.core.shared.registry.bind(address, port, listener)?;
        self.core.shared.listeners.fetch_add(1, Ordering::AcqRel);
        self.core.send(HubCmd::Listening { port: bound })?;
        info!(endpoint = %self.id(), "[ENDPOINT] Listening on {}:{}", address, bound);
        Ok(bound)
    }

    /// Peer with the endpoint listening on `address:port`.
    ///
    /// Blocks until the handshake completes or `timeout` elapses. Failed
    /// attempts are retried every `retry_interval` while time remains, and
    /// each one reports `PeerUnavailable` on the status stream.
    pub fn peer(&self, address: &str, port: u16, timeout: Duration) -> Result<bool> {
        let network = NetworkInfo::new(address, port, self.config().retry_interval);
        let deadline = Instant::now() + timeout;
        self.core.request(|reply| HubCmd::Peer {
            network,
            deadline: Some(deadline),
            reply: Some(reply),
        })
    }

    /// Start peering in the background.
    ///
    /// The outcome is only reported on the status stream. Attempts repeat
    /// every `retry`; zero means a single attempt.
    pub fn peer_nosync(&self, address: &str, port: u16, retry: Duration) -> Result<()> {
        self.core.send(HubCmd::Peer {
            network: NetworkInfo::new(address, port, retry),
            deadline: None,
            reply: None,
        })
    }

    /// Tear down the peering with `address:port`, or cancel attempts to it.
    pub fn unpeer(&self, address: &str, port: u16) -> Result<()> {
        self.core.send(HubCmd::Unpeer {
            address: address.to_owned(),
            port,
        })
    }

    /// Current and pending peerings.
    pub fn peers(&self) -> Result<Vec<PeerInfo>> {
        self.core.request(|reply| HubCmd::Peers { reply })
    }

    /// Union of the topic prefixes peers subscribed to.
    pub fn peer_subscriptions(&self) -> Result<Vec<Topic>> {
        self.core.request(|reply| HubCmd::PeerSubscriptions { reply })
    }

    // --- publishing ---

    /// Convert `value` and send it to every peer subscribed to `topic`.
    ///
    /// Local subscribers of this endpoint do not see the message.
    pub fn publish(&self, topic: impl Into<Topic>, value: impl IntoData) -> Result<()> {
        let data = value.into_data()?;
        self.core.send(HubCmd::Publish {
            topic: topic.into(),
            payload: codec::encode(&data),
        })
    }

    /// Publish several messages in order.
    ///
    /// Every value is converted before anything is sent.
    pub fn publish_batch<I, T, V>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = (T, V)>,
        T: Into<Topic>,
        V: IntoData,
    {
        let batch = items
            .into_iter()
            .map(|(topic, value)| Ok((topic.into(), codec::encode(&value.into_data()?))))
            .collect::<Result<Vec<_>>>()?;
        self.core.send(HubCmd::PublishBatch(batch))
    }

    pub fn make_publisher(&self, topic: impl Into<Topic>) -> Result<Publisher> {
        self.core.ensure_open()?;
        Ok(Publisher::new(topic.into(), self.core.clone()))
    }

    // --- subscribing ---

    /// Subscribe to every topic starting with one of `topics`.
    pub fn make_subscriber<I, T>(&self, topics: I) -> Result<Subscriber>
    where
        I: IntoIterator<Item = T>,
        T: Into<Topic>,
    {
        let filter = topics.into_iter().map(Into::into).collect();
        self.mailbox_subscriber(filter)
    }

    /// Subscribe to this endpoint's notifications.
    ///
    /// Errors are always delivered; other statuses only with
    /// `receive_statuses`.
    pub fn make_status_subscriber(&self, receive_statuses: bool) -> Result<StatusSubscriber> {
        let sub = self.mailbox_subscriber(status_filter(receive_statuses))?;
        Ok(StatusSubscriber::new(sub))
    }

    fn mailbox_subscriber(&self, filter: Vec<Topic>) -> Result<Subscriber> {
        self.core.ensure_open()?;
        let cfg = self.config();
        let (tx, mailbox) = mailbox::channel(cfg.mailbox_capacity, cfg.enable_flare)?;
        let key = self.core.shared.next_key();
        self.core.send(HubCmd::Subscribe {
            key,
            filter,
            sink: Sink::Mailbox(tx),
        })?;
        Ok(Subscriber::new(key, mailbox, self.core.clone()))
    }

    /// Run `callback` on the core thread for every message under `topic`.
    ///
    /// The callback must not block and must not call blocking endpoint
    /// operations such as [`peer`](Self::peer).
    pub fn subscribe<F>(&self, topic: impl Into<Topic>, callback: F) -> Result<()>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let topic = topic.into();
        self.callback_sink(topic.clone(), vec![topic], Arc::new(callback))
    }

    /// Drop every callback registered for exactly `topic`.
    pub fn unsubscribe(&self, topic: impl Into<Topic>) -> Result<()> {
        self.core.ensure_open()?;
        let keys = self
            .core
            .shared
            .callbacks
            .lock()
            .remove(&topic.into())
            .unwrap_or_default();
        for key in keys {
            self.core.send(HubCmd::RemoveSink { key })?;
        }
        Ok(())
    }

    /// Run `callback` on the core thread for every notification.
    ///
    /// Registered under [`topics::ERRORS`] for [`unsubscribe`](Self::unsubscribe).
    pub fn on_status<F>(&self, receive_statuses: bool, callback: F) -> Result<()>
    where
        F: Fn(Status) + Send + Sync + 'static,
    {
        let id = self.id();
        let wrapped = move |msg: Message| match msg.get::<Status>() {
            Ok(status) => callback(status),
            Err(e) => warn!(endpoint = %id, "[ENDPOINT] Undecodable status: {}", e),
        };
        self.callback_sink(
            Topic::from(topics::ERRORS),
            status_filter(receive_statuses),
            Arc::new(wrapped),
        )
    }

    fn callback_sink(
        &self,
        name: Topic,
        filter: Vec<Topic>,
        callback: crate::hub::Callback,
    ) -> Result<()> {
        self.core.ensure_open()?;
        let key = self.core.shared.next_key();
        self.core
            .shared
            .callbacks
            .lock()
            .entry(name)
            .or_default()
            .push(key);
        self.core.send(HubCmd::Subscribe {
            key,
            filter,
            sink: Sink::Callback(callback),
        })
    }

    // --- stores ---

    /// Attach a master or clone store named `name`.
    ///
    /// `backend` and `options` only apply to masters.
    pub fn attach(
        &self,
        frontend: Frontend,
        name: &str,
        backend: Backend,
        options: BackendOptions,
    ) -> Result<Store> {
        match frontend {
            Frontend::Master => self.attach_master(name, backend, options),
            Frontend::Clone => self.attach_clone(name),
        }
    }

    /// Create the master of `name`.
    ///
    /// Fails with `MasterExists` when this endpoint or one of its peers
    /// already has one.
    pub fn attach_master(
        &self,
        name: &str,
        backend: Backend,
        options: BackendOptions,
    ) -> Result<Store> {
        if self.find_master(name)?.is_some() {
            return Err(Error::Store(ErrorCode::MasterExists));
        }
        let state = Arc::new(MasterState::new(name, self.id(), backend.open(&options)));
        let attached = self.core.request(|reply| HubCmd::AttachMaster {
            state: state.clone(),
            reply,
        })?;
        if !attached {
            return Err(Error::Store(ErrorCode::MasterExists));
        }
        Ok(Store::new(Frontend::Master, state))
    }

    /// Attach to the master of `name` on this endpoint or a peer.
    pub fn attach_clone(&self, name: &str) -> Result<Store> {
        match self.find_master(name)? {
            Some(state) => Ok(Store::new(Frontend::Clone, state)),
            None => Err(Error::Store(ErrorCode::NoSuchMaster)),
        }
    }

    fn find_master(&self, name: &str) -> Result<Option<Arc<MasterState>>> {
        let timeout = self.config().store_timeout;
        self.core.ensure_open()?;
        if let Some(state) = lookup_master(&self.core.tx, name, timeout) {
            return Ok(Some(state));
        }
        let cores = self.core.request(|reply| HubCmd::PeerCores { reply })?;
        Ok(cores
            .iter()
            .find_map(|core| lookup_master(core, name, timeout)))
    }

    // --- lifecycle ---

    /// Stop the core thread and release all resources.
    ///
    /// Idempotent. Blocked receives on this endpoint's subscribers return
    /// [`Error::Closed`]; peers see `PeerLost`.
    pub fn shutdown(&self) {
        let Some(handle) = self.thread.lock().take() else {
            return;
        };
        let _ = self.core.tx.send(HubCmd::Shutdown);
        if handle.thread().id() == thread::current().id() {
            // called from a callback; the core exits after this command
            return;
        }
        if handle.join().is_err() {
            error!(endpoint = %self.id(), "[ENDPOINT] Core thread panicked");
        }
        debug!(endpoint = %self.id(), "[ENDPOINT] Shut down");
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn status_filter(receive_statuses: bool) -> Vec<Topic> {
    let mut filter = vec![Topic::from(topics::ERRORS)];
    if receive_statuses {
        filter.push(Topic::from(topics::STATUSES));
    }
    filter
}

fn lookup_master(core: &Sender<HubCmd>, name: &str, timeout: Duration) -> Option<Arc<MasterState>> {
    let (tx, rx) = flume::bounded(1);
    core.send(HubCmd::LookupMaster {
        name: name.to_owned(),
        reply: tx,
    })
    .ok()?;
    rx.recv_timeout(timeout)
        .ok()
        .flatten()
        .filter(|state| !state.is_closed())
}
