//! Single-consumer delivery queues.
//!
//! A mailbox is the receive side of a `flume` channel, optionally paired with
//! a [`Flare`](crate::flare::Flare) so the queue can be watched with
//! `select`/`poll`. The flare is lit while the queue is non-empty.
//!
//! The sender half never blocks: bounded mailboxes that are full refuse new
//! items and the caller decides what to do with them.

use crate::error::Closed;

#[cfg(unix)]
use crate::flare::Flare;
#[cfg(unix)]
use std::os::unix::io::RawFd;
#[cfg(unix)]
use std::sync::Arc;

use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::time::Duration;
use thiserror::Error;

/// Why an item could not be queued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("mailbox full")]
    Full,
    #[error("mailbox closed")]
    Closed,
}

/// Create a connected sender/mailbox pair.
///
/// `capacity` of `None` means unbounded. With `flare` set (unix only) the
/// mailbox exposes a pollable descriptor.
pub fn channel<T>(
    capacity: Option<usize>,
    flare: bool,
) -> std::io::Result<(MailboxSender<T>, Mailbox<T>)> {
    let (tx, rx) = match capacity {
        Some(n) => flume::bounded(n),
        None => flume::unbounded(),
    };

    #[cfg(unix)]
    let flare = if flare {
        Some(Arc::new(Flare::new()?))
    } else {
        None
    };
    #[cfg(not(unix))]
    let _ = flare;

    Ok((
        MailboxSender {
            tx,
            #[cfg(unix)]
            flare: flare.clone(),
        },
        Mailbox {
            rx,
            #[cfg(unix)]
            flare,
        },
    ))
}

/// Producer half, owned by the delivering side.
#[derive(Debug)]
pub struct MailboxSender<T> {
    tx: Sender<T>,
    #[cfg(unix)]
    flare: Option<Arc<Flare>>,
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            #[cfg(unix)]
            flare: self.flare.clone(),
        }
    }
}

impl<T> MailboxSender<T> {
    /// Queue an item without blocking.
    pub fn deliver(&self, item: T) -> Result<(), DeliveryError> {
        match self.tx.try_send(item) {
            Ok(()) => {
                #[cfg(unix)]
                if let Some(flare) = &self.flare {
                    flare.fire();
                }
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(DeliveryError::Full),
            Err(TrySendError::Disconnected(_)) => Err(DeliveryError::Closed),
        }
    }

    /// The consumer has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_disconnected()
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct Mailbox<T> {
    rx: Receiver<T>,
    #[cfg(unix)]
    flare: Option<Arc<Flare>>,
}

impl<T> Mailbox<T> {
    /// Block until an item arrives.
    pub fn recv(&self) -> Result<T, Closed> {
        let item = self.rx.recv().map_err(|_| Closed)?;
        self.settle();
        Ok(item)
    }

    /// Block for at most `timeout`; `Ok(None)` when nothing arrived.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>, Closed> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => {
                self.settle();
                Ok(Some(item))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Closed),
        }
    }

    /// Take one item if available.
    pub fn try_recv(&self) -> Result<Option<T>, Closed> {
        match self.rx.try_recv() {
            Ok(item) => {
                self.settle();
                Ok(Some(item))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Closed),
        }
    }

    /// Wait for an item from async code.
    pub async fn recv_async(&self) -> Result<T, Closed> {
        let item = self.rx.recv_async().await.map_err(|_| Closed)?;
        self.settle();
        Ok(item)
    }

    /// Take everything currently queued.
    pub fn drain(&self) -> Vec<T> {
        let items: Vec<T> = self.rx.drain().collect();
        self.settle();
        items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Every sender is gone. Queued items can still be taken.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.rx.is_disconnected()
    }

    /// Descriptor that polls readable while items are queued.
    #[cfg(unix)]
    #[must_use]
    pub fn descriptor(&self) -> Option<RawFd> {
        self.flare.as_ref().map(|f| f.fd())
    }

    #[cfg(unix)]
    fn settle(&self) {
        if let Some(flare) = &self.flare {
            if self.rx.is_empty() {
                flare.extinguish();
                // a producer may have raced the extinguish
                if !self.rx.is_empty() {
                    flare.fire();
                }
            }
        }
    }

    #[cfg(not(unix))]
    fn settle(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo_and_drain() {
        let (tx, rx) = channel::<u32>(None, false).unwrap();
        for i in 0..5 {
            tx.deliver(i).unwrap();
        }
        assert_eq!(rx.len(), 5);
        assert_eq!(rx.recv().unwrap(), 0);
        assert_eq!(rx.drain(), vec![1, 2, 3, 4]);
        assert!(rx.is_empty());
    }

    #[test]
    fn bounded_refuses_when_full() {
        let (tx, rx) = channel::<u32>(Some(1), false).unwrap();
        tx.deliver(1).unwrap();
        assert_eq!(tx.deliver(2), Err(DeliveryError::Full));
        assert_eq!(rx.try_recv().unwrap(), Some(1));
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn closed_after_sender_dropped() {
        let (tx, rx) = channel::<u32>(None, false).unwrap();
        tx.deliver(7).unwrap();
        drop(tx);
        assert_eq!(rx.recv().unwrap(), 7);
        assert_eq!(rx.recv(), Err(Closed));
        assert!(rx.is_closed());
    }

    #[test]
    fn blocked_receiver_wakes_on_close() {
        let (tx, rx) = channel::<u32>(None, false).unwrap();
        let h = thread::spawn(move || rx.recv());
        thread::sleep(Duration::from_millis(20));
        drop(tx);
        assert_eq!(h.join().unwrap(), Err(Closed));
    }

    #[test]
    fn timeout_returns_none() {
        let (_tx, rx) = channel::<u32>(None, false).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_millis(10)).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn flare_tracks_queue_state() {
        let (tx, rx) = channel::<u32>(None, true).unwrap();
        assert!(rx.descriptor().is_some());
        let flare = rx.flare.clone().unwrap();
        assert!(!flare.is_lit());
        tx.deliver(1).unwrap();
        tx.deliver(2).unwrap();
        assert!(flare.is_lit());
        rx.recv().unwrap();
        assert!(flare.is_lit());
        rx.recv().unwrap();
        assert!(!flare.is_lit());
    }

    #[cfg(unix)]
    #[test]
    fn flare_survives_concurrent_producer() {
        let (tx, rx) = channel::<u32>(None, true).unwrap();
        let flare = rx.flare.clone().unwrap();
        let producer = thread::spawn(move || {
            for i in 0..5_000 {
                tx.deliver(i).unwrap();
            }
            tx
        });

        let mut taken = 0;
        while taken < 2_500 {
            if rx.try_recv().unwrap().is_some() {
                taken += 1;
            }
        }
        let _tx = producer.join().unwrap();

        // everything the producer queued is still signalled
        assert_eq!(rx.len(), 2_500);
        assert!(flare.is_lit());
        rx.drain();
        assert!(!flare.is_lit());
    }
}
