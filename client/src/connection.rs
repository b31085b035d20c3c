//! Per-connection dispatch context.
//!
//! Everything the router needs to hand one envelope to the right consumer:
//! the pending-reply table for correlated replies and the listener registry
//! for events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tdlink_types::{ConnectionId, Envelope, Event};

use crate::listener::{Listener, ListenerRegistry};
use crate::pending::{Delivery, PendingReplies};

/// Sees every envelope routed to a connection, replies and events alike.
pub type ResultObserver = Arc<dyn Fn(ConnectionId, &Envelope) + Send + Sync>;

/// What the router did with one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchOutcome {
    /// Handed to its waiting caller.
    Delivered,
    /// A reply whose caller already gave up.
    Orphaned,
    /// An event, pushed to `delivered` listeners; `dropped` had full queues.
    Broadcast { delivered: usize, dropped: usize },
    /// Valid framing but a payload that does not decode.
    Undecodable,
    /// Not an envelope at all.
    Malformed,
    /// Addressed to a connection this router does not know.
    UnknownConnection,
}

pub(crate) struct Connection {
    id: ConnectionId,
    pending: Arc<PendingReplies>,
    listeners: ListenerRegistry,
    observer: Option<ResultObserver>,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(id: ConnectionId, listener_capacity: usize, observer: Option<ResultObserver>) -> Self {
        Self {
            id,
            pending: Arc::new(PendingReplies::default()),
            listeners: ListenerRegistry::new(listener_capacity),
            observer,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn pending(&self) -> &Arc<PendingReplies> {
        &self.pending
    }

    pub fn subscribe(&self) -> Listener {
        self.listeners.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn dispatch(&self, envelope: Envelope) -> DispatchOutcome {
        if let Some(observer) = &self.observer {
            observer(self.id, &envelope);
        }

        if let Some(id) = envelope.correlation_id().cloned() {
            let failed = envelope.is_error();
            let kind = envelope.kind().to_string();
            return match self.pending.deliver(&id, envelope) {
                Delivery::Delivered => DispatchOutcome::Delivered,
                Delivery::Orphaned if failed => {
                    tracing::warn!(
                        connection = %self.id,
                        correlation_id = %id,
                        kind = %kind,
                        "engine rejected a request nobody waits on"
                    );
                    DispatchOutcome::Orphaned
                }
                Delivery::Orphaned => {
                    tracing::debug!(
                        connection = %self.id,
                        correlation_id = %id,
                        "dropping reply with no waiter"
                    );
                    DispatchOutcome::Orphaned
                }
            };
        }

        let event = match Event::decode(&envelope) {
            Ok(event) => Arc::new(event),
            Err(err) => {
                tracing::warn!(
                    connection = %self.id,
                    kind = envelope.kind(),
                    error = %err,
                    "skipping undecodable event"
                );
                return DispatchOutcome::Undecodable;
            }
        };

        let fan_out = self.listeners.fan_out(&event);
        if event.is_connection_closed() {
            self.shut_down();
        }
        DispatchOutcome::Broadcast {
            delivered: fan_out.delivered,
            dropped: fan_out.dropped,
        }
    }

    /// Fail every waiter and end every listener. Idempotent.
    pub fn shut_down(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pending.clear();
        self.listeners.finish();
        tracing::debug!(connection = %self.id, "connection shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tdlink_types::{AuthorizationState, CorrelationId};

    fn envelope(value: &serde_json::Value) -> Envelope {
        Envelope::parse(value.to_string()).unwrap()
    }

    fn closed_event() -> Envelope {
        envelope(&serde_json::json!({
            "@type": "updateAuthorizationState",
            "authorization_state": {"@type": "authorizationStateClosed"}
        }))
    }

    #[tokio::test]
    async fn replies_go_to_waiters_not_listeners() {
        let connection = Connection::new(ConnectionId::new(1), 8, None);
        let mut listener = connection.subscribe();
        let waiter = connection.pending().register(CorrelationId::new("r1")).unwrap();

        let outcome = connection.dispatch(envelope(&serde_json::json!({"@type": "ok", "@extra": "r1"})));
        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(waiter.rx.await.unwrap().kind(), "ok");

        listener.handle().close();
        assert!(listener.next().await.is_none());
    }

    #[test]
    fn orphaned_reply_is_dropped() {
        let connection = Connection::new(ConnectionId::new(1), 8, None);
        let outcome = connection.dispatch(envelope(&serde_json::json!({"@type": "ok", "@extra": "gone"})));
        assert_eq!(outcome, DispatchOutcome::Orphaned);
        assert_eq!(connection.pending().len(), 0);
    }

    #[test]
    fn undecodable_event_is_skipped() {
        let connection = Connection::new(ConnectionId::new(1), 8, None);
        let outcome = connection.dispatch(envelope(&serde_json::json!({
            "@type": "updateAuthorizationState",
            "authorization_state": 5
        })));
        assert_eq!(outcome, DispatchOutcome::Undecodable);
        assert!(!connection.is_closed());
    }

    #[test]
    fn observer_sees_everything() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: ResultObserver = Arc::new(move |id, env: &Envelope| {
            sink.lock().unwrap().push((id, env.kind().to_string()));
        });
        let connection = Connection::new(ConnectionId::new(4), 8, Some(observer));
        connection.dispatch(envelope(&serde_json::json!({"@type": "ok", "@extra": "x"})));
        connection.dispatch(envelope(&serde_json::json!({"@type": "updateOption", "name": "a"})));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (ConnectionId::new(4), "ok".to_string()),
                (ConnectionId::new(4), "updateOption".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn closed_state_is_delivered_then_everything_ends() {
        let connection = Connection::new(ConnectionId::new(1), 8, None);
        let mut listener = connection.subscribe();
        let waiter = connection.pending().register(CorrelationId::new("inflight")).unwrap();

        let outcome = connection.dispatch(closed_event());
        assert_eq!(
            outcome,
            DispatchOutcome::Broadcast {
                delivered: 1,
                dropped: 0
            }
        );
        assert!(connection.is_closed());

        let event = listener.next().await.unwrap();
        assert_eq!(
            event.authorization_state(),
            Some(&AuthorizationState::Closed)
        );
        assert!(listener.next().await.is_none());
        assert!(waiter.rx.await.is_err());
        assert_eq!(connection.listener_count(), 0);
    }
}
