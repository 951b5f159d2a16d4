//! Per-session, multi-channel event fan-out.
//!
//! Every channel kind keeps its own subscriber list behind its own lock, so
//! publishing on one kind never contends with subscribing on another. A
//! [`Subscription`] owns its queue and removes itself from the list when
//! dropped, whichever way the stream that holds it ends.

use crate::emulator::events::{DomainEvent, EventKind};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

type SubscriberId = u64;

struct SubscriberList {
    senders: BTreeMap<SubscriberId, mpsc::UnboundedSender<DomainEvent>>,
    closed: bool,
}

struct HubInner {
    channels: [Mutex<SubscriberList>; 6],
    next_id: AtomicU64,
}

impl HubInner {
    fn channel(&self, kind: EventKind) -> MutexGuard<'_, SubscriberList> {
        self.channels[kind.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cheaply cloneable handle to a session's event channels.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: std::array::from_fn(|_| {
                    Mutex::new(SubscriberList {
                        senders: BTreeMap::new(),
                        closed: false,
                    })
                }),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a private queue on the `kind` channel. On a closed hub the
    /// queue is never registered and its stream has already ended.
    pub fn subscribe(&self, kind: EventKind) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut channel = self.inner.channel(kind);
        if !channel.closed {
            channel.senders.insert(id, tx);
        }
        drop(channel);
        Subscription {
            hub: self.inner.clone(),
            kind,
            id,
            rx,
        }
    }

    /// Pushes `event` onto the queue of every current subscriber of its
    /// kind. Returns how many queues received it.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let mut channel = self.inner.channel(event.kind());
        channel
            .senders
            .retain(|_, sender| sender.send(event.clone()).is_ok());
        channel.senders.len()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner.channel(kind).senders.len()
    }

    /// Drops every subscriber queue and refuses later ones. Pending
    /// receivers drain what they already hold and then see the end of their
    /// stream.
    pub fn close(&self) {
        for kind in EventKind::ALL {
            let mut channel = self.inner.channel(kind);
            channel.closed = true;
            channel.senders.clear();
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered subscriber queue. Dropping it unsubscribes.
pub struct Subscription {
    hub: Arc<HubInner>,
    kind: EventKind,
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<DomainEvent>,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Waits for the next event. Cancel-safe.
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<DomainEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.channel(self.kind).senders.remove(&self.id);
    }
}

#[cfg(test)]
#[path = "tests/hub_tests.rs"]
mod tests;
