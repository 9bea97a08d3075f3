//! Blocking-mode subscription handles.
//!
//! A [`Subscriber`] is a single-consumer view over a mailbox the endpoint
//! core fills. Receiving blocks only the caller; shutting the endpoint down
//! wakes every blocked receive with [`Error::Closed`].

use crate::hub::{HubCmd, HubHandle};
use crate::error::{Error, Result};

use futures::stream::{self, Stream};
use skein_core::mailbox::Mailbox;
use skein_core::message::Message;
use skein_core::pubsub::index::SinkKey;
use skein_core::status::Status;
use skein_core::topic::Topic;
use std::fmt;
use std::time::Duration;
use tracing::warn;

#[cfg(unix)]
use std::os::unix::io::RawFd;

/// Receives messages whose topic matches one of its prefixes.
pub struct Subscriber {
    key: SinkKey,
    mailbox: Mailbox<Message>,
    core: HubHandle,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("endpoint", &self.core.shared.id)
            .field("key", &self.key)
            .field("queued", &self.mailbox.len())
            .finish()
    }
}

impl Subscriber {
    pub(crate) fn new(key: SinkKey, mailbox: Mailbox<Message>, core: HubHandle) -> Self {
        Self { key, mailbox, core }
    }

    /// Block until the next message arrives.
    ///
    /// Messages queued before shutdown are still returned; after that the
    /// call fails with [`Error::Closed`].
    pub fn get(&self) -> Result<Message> {
        Ok(self.mailbox.recv()?)
    }

    /// Block until `n` messages arrived.
    ///
    /// If the endpoint shuts down midway, the messages taken so far are
    /// returned and the batch is shorter than `n`. [`Error::Closed`] is only
    /// returned when nothing could be taken.
    pub fn get_n(&self, n: usize) -> Result<Vec<Message>> {
        let mut batch = Vec::with_capacity(n);
        while batch.len() < n {
            match self.get() {
                Ok(msg) => batch.push(msg),
                Err(Error::Closed) if !batch.is_empty() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(batch)
    }

    /// Wait at most `timeout`; `Ok(None)` when nothing arrived.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        Ok(self.mailbox.recv_timeout(timeout)?)
    }

    /// Take everything queued without blocking.
    #[must_use]
    pub fn poll(&self) -> Vec<Message> {
        self.mailbox.drain()
    }

    /// At least one message can be taken without blocking.
    #[must_use]
    pub fn available(&self) -> bool {
        !self.mailbox.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mailbox.len()
    }

    /// Same as [`len`](Self::len).
    #[must_use]
    pub fn count(&self) -> usize {
        self.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mailbox.is_empty()
    }

    /// Descriptor that polls readable while messages are queued.
    ///
    /// `None` when the endpoint was configured without flares.
    #[cfg(unix)]
    #[must_use]
    pub fn descriptor(&self) -> Option<RawFd> {
        self.mailbox.descriptor()
    }

    /// Start receiving messages under `topic` as well.
    pub fn add_topic(&self, topic: impl Into<Topic>) -> Result<()> {
        self.core.send(HubCmd::AddTopic {
            key: self.key,
            topic: topic.into(),
        })
    }

    pub fn remove_topic(&self, topic: impl Into<Topic>) -> Result<()> {
        self.core.send(HubCmd::RemoveTopic {
            key: self.key,
            topic: topic.into(),
        })
    }

    /// Wait for the next message from async code.
    pub async fn recv_async(&self) -> Result<Message> {
        Ok(self.mailbox.recv_async().await?)
    }

    /// Messages as an async stream; ends when the endpoint shuts down.
    pub fn stream(&self) -> impl Stream<Item = Message> + '_ {
        stream::unfold(&self.mailbox, |mailbox| async move {
            mailbox.recv_async().await.ok().map(|msg| (msg, mailbox))
        })
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let _ = self.core.tx.send(HubCmd::RemoveSink { key: self.key });
    }
}

/// Receives [`Status`] notifications of its endpoint.
///
/// Only conditions that occur after creation are reported.
#[derive(Debug)]
pub struct StatusSubscriber {
    inner: Subscriber,
}

fn to_status(msg: &Message) -> Result<Status> {
    msg.get::<Status>().map_err(Error::from)
}

impl StatusSubscriber {
    pub(crate) fn new(inner: Subscriber) -> Self {
        Self { inner }
    }

    /// Block until the next status arrives.
    pub fn get(&self) -> Result<Status> {
        to_status(&self.inner.get()?)
    }

    /// Like [`Subscriber::get_n`], decoding each message.
    pub fn get_n(&self, n: usize) -> Result<Vec<Status>> {
        self.inner.get_n(n)?.iter().map(to_status).collect()
    }

    pub fn get_timeout(&self, timeout: Duration) -> Result<Option<Status>> {
        self.inner
            .get_timeout(timeout)?
            .map(|msg| to_status(&msg))
            .transpose()
    }

    /// Take everything queued without blocking.
    #[must_use]
    pub fn poll(&self) -> Vec<Status> {
        self.inner
            .poll()
            .iter()
            .filter_map(|msg| match to_status(msg) {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!("[STATUS] Dropping undecodable status: {}", e);
                    None
                }
            })
            .collect()
    }

    #[must_use]
    pub fn available(&self) -> bool {
        self.inner.available()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[cfg(unix)]
    #[must_use]
    pub fn descriptor(&self) -> Option<RawFd> {
        self.inner.descriptor()
    }

    pub async fn recv_async(&self) -> Result<Status> {
        to_status(&self.inner.recv_async().await?)
    }

    /// Statuses as an async stream; undecodable entries are skipped.
    pub fn stream(&self) -> impl Stream<Item = Status> + '_ {
        use futures::StreamExt;
        self.inner
            .stream()
            .filter_map(|msg| futures::future::ready(to_status(&msg).ok()))
    }
}
