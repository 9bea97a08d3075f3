//! Endpoint hub
//!
//! Responsibilities:
//! - Own all routing state of one endpoint: local sinks, peer links and
//!   their subscription filters.
//! - Run the peering handshake and its retry timers.
//! - Fan out publications to peers whose filter matches (one hop).
//! - Deliver received messages and status notifications to local sinks.
//!
//! Concurrency model:
//! - One dedicated thread per endpoint.
//! - A FIFO `flume` command channel feeds the thread; every other handle
//!   (endpoint, subscribers, publishers, remote cores) only sends commands.
//! - Cores talk to each other with the same commands and never wait for a
//!   reply, so two cores peering with each other cannot deadlock.

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::registry::{normalize_host, Registry};
use crate::store::MasterState;

use bytes::Bytes;
use flume::{Receiver, RecvTimeoutError, Sender};
use hashbrown::HashMap;
use parking_lot::Mutex;
use skein_core::convert::IntoData;
use skein_core::mailbox::{DeliveryError, MailboxSender};
use skein_core::message::Message;
use skein_core::pubsub::index::{SinkKey, SubscriptionIndex};
use skein_core::status::{
    Code, EndpointId, EndpointInfo, ErrorCode, NetworkInfo, Status, StatusCode,
};
use skein_core::topic::{topics, Topic};
use smallvec::SmallVec;
use std::fmt;
use std::ops::ControlFlow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

const UNREACHABLE: &str = "unable to connect to remote peer";
const SHUTTING_DOWN: &str = "remote endpoint is shutting down";

/// Callback invoked on the core thread for every matching message.
pub(crate) type Callback = Arc<dyn Fn(Message) + Send + Sync>;

/// Where a subscription delivers its messages.
#[derive(Clone)]
pub(crate) enum Sink {
    /// Queue into a mailbox read by a blocking or async subscriber.
    Mailbox(MailboxSender<Message>),
    /// Run a callback on the core thread.
    Callback(Callback),
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mailbox(_) => f.write_str("Sink::Mailbox"),
            Self::Callback(_) => f.write_str("Sink::Callback"),
        }
    }
}

impl Sink {
    /// Returns `false` once the sink can never accept messages again.
    fn deliver(&self, owner: EndpointId, key: SinkKey, msg: Message) -> bool {
        match self {
            Self::Mailbox(tx) => match tx.deliver(msg) {
                Ok(()) => true,
                Err(DeliveryError::Full) => {
                    warn!(endpoint = %owner, sink = key, "[HUB] Mailbox full, dropping message");
                    true
                }
                Err(DeliveryError::Closed) => false,
            },
            Self::Callback(cb) => {
                if catch_unwind(AssertUnwindSafe(|| cb(msg))).is_err() {
                    error!(endpoint = %owner, sink = key, "[HUB] Subscriber callback panicked");
                }
                true
            }
        }
    }
}

/// Lifecycle stage of a peering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerStatus {
    /// First attempt in flight.
    Connecting,
    /// Handshake completed.
    Peered,
    /// Earlier attempts failed; waiting for the next one.
    Reconnecting,
}

/// A peer as seen by the local endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Remote identity, [`EndpointId::UNKNOWN`] until peered.
    pub node: EndpointId,
    pub network: Option<NetworkInfo>,
    pub status: PeerStatus,
}

/// State shared between an endpoint's handles and its core.
pub(crate) struct Shared {
    pub id: EndpointId,
    pub config: EndpointConfig,
    pub registry: Arc<Registry>,
    /// Also held by this endpoint's registry entries.
    pub closed: Arc<AtomicBool>,
    pub listeners: AtomicUsize,
    pub peers: AtomicUsize,
    next_key: AtomicU64,
    /// Callback subscriptions by topic, for `unsubscribe`.
    pub callbacks: Mutex<HashMap<Topic, Vec<SinkKey>>>,
}

impl Shared {
    pub fn new(id: EndpointId, config: EndpointConfig, registry: Arc<Registry>) -> Self {
        Self {
            id,
            config,
            registry,
            closed: Arc::new(AtomicBool::new(false)),
            listeners: AtomicUsize::new(0),
            peers: AtomicUsize::new(0),
            next_key: AtomicU64::new(1),
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    pub fn next_key(&self) -> SinkKey {
        self.next_key.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Sending side of a core, shared by every handle of one endpoint.
#[derive(Clone)]
pub(crate) struct HubHandle {
    pub tx: Sender<HubCmd>,
    pub shared: Arc<Shared>,
}

impl HubHandle {
    pub fn ensure_open(&self) -> Result<()> {
        if self.shared.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    pub fn send(&self, cmd: HubCmd) -> Result<()> {
        self.ensure_open()?;
        self.tx.send(cmd).map_err(|_| Error::Closed)
    }

    /// Send a command carrying a reply channel and wait for the answer.
    pub fn request<R>(&self, make: impl FnOnce(Sender<R>) -> HubCmd) -> Result<R> {
        let (tx, rx) = flume::bounded(1);
        self.send(make(tx))?;
        rx.recv().map_err(|_| Error::Closed)
    }
}

/// Commands understood by a core.
///
/// The first group comes from local handles, the second from remote cores.
#[derive(Debug)]
pub(crate) enum HubCmd {
    Publish {
        topic: Topic,
        payload: Bytes,
    },
    PublishBatch(Vec<(Topic, Bytes)>),
    Subscribe {
        key: SinkKey,
        filter: Vec<Topic>,
        sink: Sink,
    },
    AddTopic {
        key: SinkKey,
        topic: Topic,
    },
    RemoveTopic {
        key: SinkKey,
        topic: Topic,
    },
    RemoveSink {
        key: SinkKey,
    },
    Listening {
        port: u16,
    },
    Peer {
        network: NetworkInfo,
        deadline: Option<Instant>,
        reply: Option<Sender<bool>>,
    },
    Unpeer {
        address: String,
        port: u16,
    },
    Peers {
        reply: Sender<Vec<PeerInfo>>,
    },
    PeerSubscriptions {
        reply: Sender<Vec<Topic>>,
    },
    PeerCores {
        reply: Sender<Vec<Sender<HubCmd>>>,
    },
    AttachMaster {
        state: Arc<MasterState>,
        reply: Sender<bool>,
    },
    LookupMaster {
        name: String,
        reply: Sender<Option<Arc<MasterState>>>,
    },
    Shutdown,

    // --- from remote cores ---
    PeerOpen {
        node: EndpointId,
        core: Sender<HubCmd>,
        filter: Vec<Topic>,
        network: NetworkInfo,
        attempt: u64,
    },
    PeerAccepted {
        node: EndpointId,
        core: Sender<HubCmd>,
        filter: Vec<Topic>,
        attempt: u64,
    },
    PeerRejected {
        attempt: u64,
    },
    PeerFilter {
        node: EndpointId,
        filter: Vec<Topic>,
    },
    PeerClosed {
        node: EndpointId,
        removed: bool,
    },
    Forward {
        topic: Topic,
        payload: Bytes,
    },
}

struct PeerLink {
    node: EndpointId,
    core: Sender<HubCmd>,
    network: Option<NetworkInfo>,
}

struct PendingPeer {
    network: NetworkInfo,
    /// Blocking callers give up at this point.
    deadline: Option<Instant>,
    next_attempt: Instant,
    /// Set while a handshake is in flight.
    awaiting: Option<Instant>,
    failures: u32,
    reply: Option<Sender<bool>>,
}

impl PendingPeer {
    fn resolve(self, peered: bool) {
        if let Some(reply) = self.reply {
            let _ = reply.send(peered);
        }
    }
}

pub(crate) struct Hub {
    shared: Arc<Shared>,
    me: Sender<HubCmd>,
    rx: Receiver<HubCmd>,

    /// Local subscription index (topic -> sinks)
    local: SubscriptionIndex,
    sinks: HashMap<SinkKey, Sink>,

    /// Remote subscription index (topic -> peers)
    remote: SubscriptionIndex,
    peers: HashMap<SinkKey, PeerLink>,
    by_node: HashMap<EndpointId, SinkKey>,
    next_peer: SinkKey,

    pending: HashMap<u64, PendingPeer>,
    next_attempt: u64,

    /// Filter last sent to peers
    advertised: Vec<Topic>,
    listen_port: Option<u16>,
    masters: HashMap<String, Arc<MasterState>>,
}

impl Hub {
    pub fn new(shared: Arc<Shared>, me: Sender<HubCmd>, rx: Receiver<HubCmd>) -> Self {
        Self {
            shared,
            me,
            rx,
            local: SubscriptionIndex::new(),
            sinks: HashMap::new(),
            remote: SubscriptionIndex::new(),
            peers: HashMap::new(),
            by_node: HashMap::new(),
            next_peer: 1,
            pending: HashMap::new(),
            next_attempt: 1,
            advertised: Vec::new(),
            listen_port: None,
            masters: HashMap::new(),
        }
    }

    fn id(&self) -> EndpointId {
        self.shared.id
    }

    fn config(&self) -> &EndpointConfig {
        &self.shared.config
    }

    /// Main event loop.
    pub fn run(mut self) {
        debug!(endpoint = %self.id(), "[HUB] Started");
        loop {
            let received = match self.next_timer() {
                Some(at) => match self.rx.recv_deadline(at) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match self.rx.recv() {
                    Ok(cmd) => Some(cmd),
                    Err(_) => break,
                },
            };
            if let Some(cmd) = received {
                if self.handle(cmd).is_break() {
                    break;
                }
            }
            self.on_timer();
        }
        debug!(endpoint = %self.id(), "[HUB] Stopped");
    }

    fn handle(&mut self, cmd: HubCmd) -> ControlFlow<()> {
        match cmd {
            HubCmd::Publish { topic, payload } => self.publish(topic, payload),
            HubCmd::PublishBatch(items) => {
                for (topic, payload) in items {
                    self.publish(topic, payload);
                }
            }
            HubCmd::Subscribe { key, filter, sink } => {
                self.sinks.insert(key, sink);
                for topic in filter {
                    self.local.subscribe(key, topic);
                }
                self.refresh_filter();
            }
            HubCmd::AddTopic { key, topic } => {
                if self.sinks.contains_key(&key) {
                    self.local.subscribe(key, topic);
                    self.refresh_filter();
                }
            }
            HubCmd::RemoveTopic { key, topic } => {
                self.local.unsubscribe(key, topic.as_str());
                self.refresh_filter();
            }
            HubCmd::RemoveSink { key } => self.drop_sink(key),
            HubCmd::Listening { port } => {
                self.listen_port.get_or_insert(port);
            }
            HubCmd::Peer {
                network,
                deadline,
                reply,
            } => self.start_peering(network, deadline, reply),
            HubCmd::Unpeer { address, port } => self.unpeer(&address, port),
            HubCmd::Peers { reply } => {
                let _ = reply.send(self.peer_infos());
            }
            HubCmd::PeerSubscriptions { reply } => {
                let _ = reply.send(self.remote.prefixes().cloned().collect());
            }
            HubCmd::PeerCores { reply } => {
                let _ = reply.send(self.peers.values().map(|l| l.core.clone()).collect());
            }
            HubCmd::AttachMaster { state, reply } => {
                let name = state.name().to_owned();
                let fresh = !self.masters.contains_key(&name);
                if fresh {
                    debug!(endpoint = %self.id(), store = %name, "[HUB] Attached master");
                    self.masters.insert(name, state);
                }
                let _ = reply.send(fresh);
            }
            HubCmd::LookupMaster { name, reply } => {
                let _ = reply.send(self.masters.get(&name).cloned());
            }
            HubCmd::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
            HubCmd::PeerOpen {
                node,
                core,
                filter,
                network,
                attempt,
            } => self.accept_peer(node, core, filter, network, attempt),
            HubCmd::PeerAccepted {
                node,
                core,
                filter,
                attempt,
            } => self.peer_accepted(node, core, filter, attempt),
            HubCmd::PeerRejected { attempt } => {
                // already failed locally when the listener was seen closing
                let in_flight = self
                    .pending
                    .get(&attempt)
                    .is_some_and(|p| p.awaiting.is_some());
                if in_flight {
                    self.attempt_failed(attempt, ErrorCode::PeerUnavailable, SHUTTING_DOWN);
                }
            }
            HubCmd::PeerFilter { node, filter } => {
                if let Some(&key) = self.by_node.get(&node) {
                    trace!(endpoint = %self.id(), peer = %node, "[HUB] Peer filter: {:?}", filter);
                    self.remote.replace_key(key, filter);
                }
            }
            HubCmd::PeerClosed { node, removed } => {
                if let Some(&key) = self.by_node.get(&node) {
                    let text = if removed {
                        "remote peer removed the connection"
                    } else {
                        "lost connection to remote peer"
                    };
                    self.drop_link(key, StatusCode::PeerLost, text);
                }
            }
            HubCmd::Forward { topic, payload } => {
                let msg = Message::from_wire(topic, payload)
                    .with_max_depth(self.config().max_nesting_depth);
                self.deliver_local(msg);
            }
        }
        ControlFlow::Continue(())
    }

    // --- routing ---

    fn publish(&mut self, topic: Topic, payload: Bytes) {
        if topic.is_reserved() {
            warn!(endpoint = %self.id(), topic = %topic, "[HUB] Refusing reserved topic");
            return;
        }
        let keys = self.remote.match_topic(topic.as_str());
        trace!(endpoint = %self.id(), topic = %topic, "[HUB] Publishing to {} peers", keys.len());
        let mut dead: SmallVec<[SinkKey; 4]> = SmallVec::new();
        for key in keys {
            if let Some(link) = self.peers.get(&key) {
                let fwd = HubCmd::Forward {
                    topic: topic.clone(),
                    payload: payload.clone(),
                };
                if link.core.send(fwd).is_err() {
                    dead.push(key);
                }
            }
        }
        for key in dead {
            self.drop_link(key, StatusCode::PeerLost, "lost connection to remote peer");
        }
    }

    fn deliver_local(&mut self, msg: Message) {
        let keys = self.local.match_topic(msg.topic());
        let mut dead: SmallVec<[SinkKey; 4]> = SmallVec::new();
        for key in keys {
            if let Some(sink) = self.sinks.get(&key) {
                if !sink.deliver(self.shared.id, key, msg.clone()) {
                    dead.push(key);
                }
            }
        }
        for key in dead {
            self.drop_sink(key);
        }
    }

    fn drop_sink(&mut self, key: SinkKey) {
        if self.sinks.remove(&key).is_some() {
            self.local.remove_key_everywhere(key);
            self.refresh_filter();
        }
    }

    /// The subscriptions peers should route to us.
    fn local_filter(&self) -> Vec<Topic> {
        self.local
            .prefixes()
            .filter(|t| !t.is_reserved())
            .cloned()
            .collect()
    }

    fn refresh_filter(&mut self) {
        let filter = self.local_filter();
        if filter == self.advertised {
            return;
        }
        for link in self.peers.values() {
            let _ = link.core.send(HubCmd::PeerFilter {
                node: self.shared.id,
                filter: filter.clone(),
            });
        }
        self.advertised = filter;
    }

    // --- statuses ---

    fn emit(&mut self, code: impl Into<Code>, context: Option<EndpointInfo>, text: &str) {
        let status = Status::new(code, context, text);
        if status.is_error() {
            info!(endpoint = %self.id(), "[HUB] {}", status);
        } else {
            debug!(endpoint = %self.id(), "[HUB] {}", status);
        }
        if self.config().disable_notifications {
            return;
        }
        let topic = if status.is_error() {
            topics::ERRORS
        } else {
            topics::STATUSES
        };
        match (&status).into_data() {
            Ok(data) => self.deliver_local(Message::new(topic, data)),
            Err(e) => warn!(endpoint = %self.id(), "[HUB] Cannot encode status: {}", e),
        }
    }

    // --- peering ---

    fn start_peering(
        &mut self,
        network: NetworkInfo,
        deadline: Option<Instant>,
        reply: Option<Sender<bool>>,
    ) {
        let attempt = self.next_attempt;
        self.next_attempt += 1;
        debug!(endpoint = %self.id(), "[HUB] Peering with {}", network);
        self.pending.insert(
            attempt,
            PendingPeer {
                network,
                deadline,
                next_attempt: Instant::now(),
                awaiting: None,
                failures: 0,
                reply,
            },
        );
        self.try_connect(attempt);
    }

    fn try_connect(&mut self, attempt: u64) {
        let Some(p) = self.pending.get(&attempt) else {
            return;
        };
        let network = p.network.clone();
        let Some(listener) = self.shared.registry.lookup(&network.address, network.port) else {
            self.attempt_failed(attempt, ErrorCode::PeerUnavailable, UNREACHABLE);
            return;
        };

        if listener.node == self.id() {
            let ctx = EndpointInfo {
                node: listener.node,
                network: Some(network),
            };
            self.emit(ErrorCode::PeerInvalid, Some(ctx), "cannot peer with itself");
            if let Some(p) = self.pending.remove(&attempt) {
                p.resolve(false);
            }
            return;
        }

        if self.by_node.contains_key(&listener.node) {
            trace!(endpoint = %self.id(), peer = %listener.node, "[HUB] Already peered");
            if let Some(p) = self.pending.remove(&attempt) {
                p.resolve(true);
            }
            return;
        }

        let open = HubCmd::PeerOpen {
            node: self.id(),
            core: self.me.clone(),
            filter: self.local_filter(),
            network: NetworkInfo::new(
                network.address.clone(),
                self.listen_port.unwrap_or(0),
                network.retry,
            ),
            attempt,
        };
        if listener.core.send(open).is_err() {
            self.attempt_failed(attempt, ErrorCode::PeerUnavailable, UNREACHABLE);
            return;
        }
        // a closing core may have drained its queue before our handshake landed
        if listener.closed.load(Ordering::SeqCst) {
            self.attempt_failed(attempt, ErrorCode::PeerUnavailable, SHUTTING_DOWN);
            return;
        }
        let expiry = Instant::now() + self.config().handshake_timeout;
        if let Some(p) = self.pending.get_mut(&attempt) {
            p.awaiting = Some(expiry);
        }
    }

    fn attempt_failed(&mut self, attempt: u64, code: ErrorCode, text: &str) {
        let Some(p) = self.pending.get_mut(&attempt) else {
            return;
        };
        p.awaiting = None;
        p.failures += 1;
        let ctx = EndpointInfo {
            node: EndpointId::UNKNOWN,
            network: Some(p.network.clone()),
        };

        let now = Instant::now();
        let give_up = match p.deadline {
            Some(deadline) => now + self.shared.config.retry_interval > deadline,
            None => p.network.retry.is_zero(),
        };
        let interval = if p.deadline.is_some() {
            self.shared.config.retry_interval
        } else {
            p.network.retry
        };
        p.next_attempt = now + interval;

        self.emit(code, Some(ctx), text);

        if give_up {
            if let Some(p) = self.pending.remove(&attempt) {
                debug!(endpoint = %self.id(), "[HUB] Giving up on {}", p.network);
                p.resolve(false);
            }
        }
    }

    fn accept_peer(
        &mut self,
        node: EndpointId,
        core: Sender<HubCmd>,
        filter: Vec<Topic>,
        network: NetworkInfo,
        attempt: u64,
    ) {
        let accepted = HubCmd::PeerAccepted {
            node: self.id(),
            core: self.me.clone(),
            filter: self.local_filter(),
            attempt,
        };
        if core.send(accepted).is_err() {
            return;
        }
        match self.by_node.get(&node) {
            Some(&key) => self.remote.replace_key(key, filter),
            None => self.add_link(node, core, Some(network), filter),
        }
    }

    fn peer_accepted(
        &mut self,
        node: EndpointId,
        core: Sender<HubCmd>,
        filter: Vec<Topic>,
        attempt: u64,
    ) {
        let Some(p) = self.pending.remove(&attempt) else {
            // cancelled while in flight
            if !self.by_node.contains_key(&node) {
                let _ = core.send(HubCmd::PeerClosed {
                    node: self.id(),
                    removed: true,
                });
            }
            return;
        };
        match self.by_node.get(&node) {
            Some(&key) => self.remote.replace_key(key, filter),
            None => self.add_link(node, core, Some(p.network.clone()), filter),
        }
        p.resolve(true);
    }

    fn add_link(
        &mut self,
        node: EndpointId,
        core: Sender<HubCmd>,
        network: Option<NetworkInfo>,
        filter: Vec<Topic>,
    ) {
        let key = self.next_peer;
        self.next_peer += 1;
        self.remote.replace_key(key, filter);
        self.by_node.insert(node, key);
        let link = PeerLink {
            node,
            core,
            network,
        };
        let ctx = link.info();
        self.peers.insert(key, link);
        self.shared.peers.fetch_add(1, Ordering::AcqRel);
        info!(endpoint = %self.id(), peer = %node, "[HUB] Peering established");
        self.emit(StatusCode::PeerAdded, Some(ctx.clone()), "handshake successful");
        self.emit(
            StatusCode::EndpointDiscovered,
            Some(ctx),
            "found a new peer in the network",
        );
    }

    fn remove_link(&mut self, key: SinkKey) -> Option<PeerLink> {
        let link = self.peers.remove(&key)?;
        self.by_node.remove(&link.node);
        self.remote.remove_key_everywhere(key);
        self.shared.peers.fetch_sub(1, Ordering::AcqRel);
        debug!(endpoint = %self.id(), peer = %link.node, "[HUB] Peering removed");
        Some(link)
    }

    /// Remove a link and report it. A node has a single link, so losing it
    /// also makes the node unreachable.
    fn drop_link(&mut self, key: SinkKey, code: StatusCode, text: &str) -> Option<PeerLink> {
        let link = self.remove_link(key)?;
        let ctx = link.info();
        self.emit(code, Some(ctx.clone()), text);
        self.emit(StatusCode::EndpointUnreachable, Some(ctx), "lost the last path");
        Some(link)
    }

    fn unpeer(&mut self, address: &str, port: u16) {
        let host = normalize_host(address).unwrap_or_else(|_| address.to_owned());
        let matches = |n: &NetworkInfo| {
            n.port == port
                && normalize_host(&n.address).unwrap_or_else(|_| n.address.clone()) == host
        };

        let cancelled: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, p)| matches(&p.network))
            .map(|(&id, _)| id)
            .collect();
        for id in &cancelled {
            if let Some(p) = self.pending.remove(id) {
                debug!(endpoint = %self.id(), "[HUB] Cancelled peering with {}", p.network);
                p.resolve(false);
            }
        }

        let found = self
            .peers
            .iter()
            .find(|(_, l)| l.network.as_ref().is_some_and(|n| matches(n)))
            .map(|(&key, _)| key);

        let removed = found.and_then(|key| {
            self.drop_link(key, StatusCode::PeerRemoved, "removed connection to remote peer")
        });
        match removed {
            Some(link) => {
                let _ = link.core.send(HubCmd::PeerClosed {
                    node: self.id(),
                    removed: true,
                });
            }
            None if cancelled.is_empty() => {
                let ctx = EndpointInfo {
                    node: EndpointId::UNKNOWN,
                    network: Some(NetworkInfo::new(address, port, Duration::ZERO)),
                };
                self.emit(ErrorCode::PeerInvalid, Some(ctx), "cannot unpeer from unknown peer");
            }
            None => {}
        }
    }

    fn peer_infos(&self) -> Vec<PeerInfo> {
        let linked = self.peers.values().map(|l| PeerInfo {
            node: l.node,
            network: l.network.clone(),
            status: PeerStatus::Peered,
        });
        let pending = self.pending.values().map(|p| PeerInfo {
            node: EndpointId::UNKNOWN,
            network: Some(p.network.clone()),
            status: if p.failures == 0 {
                PeerStatus::Connecting
            } else {
                PeerStatus::Reconnecting
            },
        });
        linked.chain(pending).collect()
    }

    // --- timers ---

    fn next_timer(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|p| p.awaiting.unwrap_or(p.next_attempt))
            .min()
    }

    fn on_timer(&mut self) {
        let now = Instant::now();
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, p)| p.awaiting.is_some_and(|at| at <= now))
            .map(|(&id, _)| id)
            .collect();
        for id in expired {
            self.attempt_failed(id, ErrorCode::PeerTimeout, "peering handshake timed out");
        }

        let due: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, p)| p.awaiting.is_none() && p.next_attempt <= now)
            .map(|(&id, _)| id)
            .collect();
        for id in due {
            self.try_connect(id);
        }
    }

    // --- teardown ---

    fn shutdown(&mut self) {
        info!(endpoint = %self.id(), "[HUB] Shutting down");
        self.shared.closed.store(true, Ordering::SeqCst);

        for (_, link) in self.peers.drain() {
            let _ = link.core.send(HubCmd::PeerClosed {
                node: self.shared.id,
                removed: false,
            });
        }
        self.by_node.clear();
        self.shared.peers.store(0, Ordering::Release);

        let unbound = self.shared.registry.unbind_all(self.shared.id);
        self.shared.listeners.store(0, Ordering::Release);
        trace!(endpoint = %self.id(), "[HUB] Released {} listeners", unbound);

        for (_, master) in self.masters.drain() {
            master.close();
        }
        for (_, p) in self.pending.drain() {
            p.resolve(false);
        }

        // dropping the senders wakes every blocked subscriber
        self.sinks.clear();
        self.shared.callbacks.lock().clear();

        for cmd in self.rx.try_iter() {
            if let HubCmd::PeerOpen { core, attempt, .. } = cmd {
                let _ = core.send(HubCmd::PeerRejected { attempt });
            }
        }
    }
}

impl PeerLink {
    fn info(&self) -> EndpointInfo {
        EndpointInfo {
            node: self.node,
            network: self.network.clone(),
        }
    }
}
