//! Waiters for correlated replies.
//!
//! One single-slot rendezvous per in-flight request, keyed by correlation id.
//! Whoever observes completion first removes the entry: the router when it
//! delivers, the caller when it gives up. Removal is idempotent, so the race
//! between the two is harmless.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tdlink_types::{CorrelationId, Envelope};
use tokio::sync::oneshot;

use crate::error::ClientError;

type Slots = HashMap<CorrelationId, oneshot::Sender<Envelope>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    /// The waiter is gone (timed out, canceled, or never existed).
    Orphaned,
}

#[derive(Default)]
pub(crate) struct PendingReplies {
    slots: Mutex<Slots>,
}

impl PendingReplies {
    fn slots(&self) -> MutexGuard<'_, Slots> {
        // Every critical section is a single map operation; a poisoned map is still consistent.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter. The returned guard unregisters it when dropped.
    ///
    /// An id that is still pending stays with its first waiter; the new
    /// registration fails.
    pub fn register(self: &Arc<Self>, id: CorrelationId) -> Result<Waiter, ClientError> {
        let (tx, rx) = oneshot::channel();
        match self.slots().entry(id.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(correlation_id = %id, "correlation id reused while still pending");
                return Err(ClientError::DuplicateCorrelationId { id });
            }
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }
        Ok(Waiter {
            rx,
            guard: WaiterGuard {
                pending: Arc::clone(self),
                id,
            },
        })
    }

    pub fn deliver(&self, id: &CorrelationId, envelope: Envelope) -> Delivery {
        let Some(tx) = self.slots().remove(id) else {
            return Delivery::Orphaned;
        };
        // The receiver can only be gone if its guard is mid-drop.
        match tx.send(envelope) {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::Orphaned,
        }
    }

    pub fn remove(&self, id: &CorrelationId) {
        self.slots().remove(id);
    }

    /// Drop every waiter; their callers observe a closed channel.
    pub fn clear(&self) {
        let drained: Vec<_> = self.slots().drain().collect();
        drop(drained);
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }
}

pub(crate) struct Waiter {
    pub rx: oneshot::Receiver<Envelope>,
    pub guard: WaiterGuard,
}

pub(crate) struct WaiterGuard {
    pending: Arc<PendingReplies>,
    id: CorrelationId,
}

impl WaiterGuard {
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(id: &str) -> Envelope {
        Envelope::parse(format!(r#"{{"@type":"ok","@extra":"{id}"}}"#)).unwrap()
    }

    #[tokio::test]
    async fn delivery_fulfils_and_unregisters() {
        let pending = Arc::new(PendingReplies::default());
        let waiter = pending.register(CorrelationId::new("a")).unwrap();
        assert_eq!(pending.len(), 1);

        let outcome = pending.deliver(&CorrelationId::new("a"), reply("a"));
        assert_eq!(outcome, Delivery::Delivered);
        assert_eq!(pending.len(), 0);

        let envelope = waiter.rx.await.unwrap();
        assert_eq!(envelope.correlation_id().unwrap().as_str(), "a");
        drop(waiter.guard);
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn dropped_guard_unregisters_and_late_reply_is_orphaned() {
        let pending = Arc::new(PendingReplies::default());
        let waiter = pending.register(CorrelationId::new("late")).unwrap();
        drop(waiter);
        assert_eq!(pending.len(), 0);
        assert_eq!(
            pending.deliver(&CorrelationId::new("late"), reply("late")),
            Delivery::Orphaned
        );
    }

    #[test]
    fn double_removal_is_a_no_op() {
        let pending = Arc::new(PendingReplies::default());
        let _waiter = pending.register(CorrelationId::new("x")).unwrap();
        pending.remove(&CorrelationId::new("x"));
        pending.remove(&CorrelationId::new("x"));
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn reused_id_keeps_the_first_waiter() {
        let pending = Arc::new(PendingReplies::default());
        let first = pending.register(CorrelationId::new("dup")).unwrap();

        let err = pending.register(CorrelationId::new("dup")).err().unwrap();
        assert!(matches!(
            err,
            ClientError::DuplicateCorrelationId { ref id } if id.as_str() == "dup"
        ));
        assert_eq!(pending.len(), 1);

        assert_eq!(
            pending.deliver(&CorrelationId::new("dup"), reply("dup")),
            Delivery::Delivered
        );
        let envelope = first.rx.await.unwrap();
        assert_eq!(envelope.correlation_id().unwrap().as_str(), "dup");
    }

    #[tokio::test]
    async fn clear_closes_every_waiter() {
        let pending = Arc::new(PendingReplies::default());
        let first = pending.register(CorrelationId::new("1")).unwrap();
        let second = pending.register(CorrelationId::new("2")).unwrap();
        pending.clear();
        assert!(first.rx.await.is_err());
        assert!(second.rx.await.is_err());
    }
}
