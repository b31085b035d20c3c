//! Event fan-out to any number of independent subscribers.
//!
//! Every listener gets its own bounded queue. The router never blocks on a
//! queue: when one is full the event is dropped for that listener only and
//! counted. Closing a listener just flips its `active` flag; the registry
//! notices on its next fan-out pass and compacts itself then, so teardown
//! never contends for the registry lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::Stream;
use futures_util::stream;
use tdlink_types::Event;
use tokio::sync::{Notify, mpsc};

struct ListenerState {
    active: AtomicBool,
    dropped: AtomicU64,
    closed: Notify,
}

impl ListenerState {
    fn deactivate(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            // Stores a permit if the owner is not waiting yet.
            self.closed.notify_one();
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[derive(Clone)]
struct Slot {
    state: Arc<ListenerState>,
    tx: mpsc::Sender<Arc<Event>>,
}

#[derive(Default)]
struct Slots {
    slots: Vec<Slot>,
    /// Set once the connection is gone; later subscribers get an ended listener.
    finished: bool,
}

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
}

pub(crate) struct ListenerRegistry {
    inner: Mutex<Slots>,
    capacity: usize,
}

impl ListenerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Slots::default()),
            capacity: capacity.max(1),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Listener {
        let (tx, rx) = mpsc::channel(self.capacity);
        let state = Arc::new(ListenerState {
            active: AtomicBool::new(true),
            dropped: AtomicU64::new(0),
            closed: Notify::new(),
        });
        let mut inner = self.inner();
        if !inner.finished {
            inner.slots.push(Slot {
                state: Arc::clone(&state),
                tx,
            });
        }
        Listener { rx, state }
    }

    /// Push `event` to every active listener without blocking.
    pub fn fan_out(&self, event: &Arc<Event>) -> FanOut {
        let snapshot: Vec<Slot> = self.inner().slots.clone();
        let mut outcome = FanOut::default();
        let mut saw_inactive = false;

        for slot in &snapshot {
            if !slot.state.is_active() {
                saw_inactive = true;
                continue;
            }
            match slot.tx.try_send(Arc::clone(event)) {
                Ok(()) => outcome.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let total = slot.state.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    outcome.dropped += 1;
                    if total.is_power_of_two() {
                        tracing::warn!(dropped = total, "listener queue full; dropping events");
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    slot.state.deactivate();
                    saw_inactive = true;
                }
            }
        }
        drop(snapshot);

        if saw_inactive {
            self.compact();
        }
        outcome
    }

    fn compact(&self) {
        let mut inner = self.inner();
        let before = inner.slots.len();
        inner.slots.retain(|slot| slot.state.is_active());
        tracing::trace!(removed = before - inner.slots.len(), "compacted listener registry");
    }

    /// Stop accepting events. Listeners drain what is already queued, then end.
    pub fn finish(&self) {
        let mut inner = self.inner();
        inner.finished = true;
        inner.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.inner().slots.len()
    }
}

/// A live subscription to the event stream of one connection.
///
/// Sees every event fanned out after it was created, in router order.
pub struct Listener {
    rx: mpsc::Receiver<Arc<Event>>,
    state: Arc<ListenerState>,
}

impl Listener {
    /// Next event, or `None` once the listener is closed or the connection is gone.
    pub async fn next(&mut self) -> Option<Arc<Event>> {
        let state = &self.state;
        if !state.is_active() {
            return None;
        }
        tokio::select! {
            biased;
            () = state.closed.notified() => None,
            item = self.rx.recv() => item.filter(|_| state.is_active()),
        }
    }

    /// Stop delivery and release anything still queued. Idempotent.
    pub fn close(&mut self) {
        self.state.deactivate();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Events this listener missed because its queue was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }

    /// Closes this listener from another task.
    #[must_use]
    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle {
            state: Arc::clone(&self.state),
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Arc<Event>> + Send {
        stream::unfold(self, |mut listener| async move {
            let event = listener.next().await?;
            Some((event, listener))
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.state.deactivate();
    }
}

#[derive(Clone)]
pub struct ListenerHandle {
    state: Arc<ListenerState>,
}

impl ListenerHandle {
    /// Deactivate the listener. A pending `next()` returns `None`.
    pub fn close(&self) {
        self.state.deactivate();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}
