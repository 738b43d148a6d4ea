//! Broadcast hub for live subscribers
//!
//! In-process fan-out router: every enriched record is delivered at most
//! once to each currently registered subscriber, best effort. Durable
//! history never depends on the hub; records are persisted before they
//! are broadcast.
//!
//! Backpressure policy: **drop-new**. Every subscriber channel is bounded
//! and `broadcast` never waits on it; when a subscriber's buffer is full,
//! that subscriber misses the notification. A slow viewer can therefore
//! never stall ingest.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use trackhub_common::LocationRecord;
use uuid::Uuid;

/// Notifications a subscriber may fall behind by before it starts
/// missing records.
const SUBSCRIBER_BUFFER: usize = 16;

type Registry = HashMap<Uuid, mpsc::Sender<LocationRecord>>;

/// Fan-out hub. Cheap to clone; clones share one registry.
///
/// Registration changes take the write lock; broadcasts take the read
/// lock, so concurrent broadcasts are allowed but serialize against
/// subscribe/unsubscribe. Entries are keyed by a stable handle, so one
/// subscriber unsubscribing mid-broadcast cannot disturb another's slot.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    registry: Arc<RwLock<Registry>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live subscriber.
    ///
    /// The returned [`Subscription`] owns the receive end; dropping it
    /// (or calling [`Subscription::unsubscribe`]) removes the
    /// registration and closes the channel, so cleanup happens on every
    /// exit path of the owning connection task.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = Uuid::new_v4();
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        debug!(subscriber = %id, "live subscriber registered");
        Subscription {
            id,
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Deliver a record to every currently registered subscriber.
    ///
    /// Returns the number of subscribers the record was enqueued for.
    pub fn broadcast(&self, record: &LocationRecord) -> usize {
        let registry = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        for (id, tx) in registry.iter() {
            match tx.try_send(record.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = %id, "subscriber buffer full, dropping notification");
                }
                // Subscriber is mid-unsubscribe; its entry goes away with it
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A live subscriber's registration and receive end.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<LocationRecord>,
    registry: Arc<RwLock<Registry>>,
}

impl Subscription {
    /// Next broadcast record; `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<LocationRecord> {
        self.rx.recv().await
    }

    /// Remove this subscriber from the registry and close its channel.
    ///
    /// Already-enqueued records remain readable; after the drain,
    /// [`recv`](Self::recv) yields `None`.
    pub fn unsubscribe(&mut self) {
        let removed = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id)
            .is_some();
        if removed {
            debug!(subscriber = %self.id, "live subscriber unregistered");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
