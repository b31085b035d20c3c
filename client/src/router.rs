//! The single reader of an engine's output.
//!
//! A native engine exposes one poll point shared by every logical connection,
//! so exactly one loop may call [`Engine::poll`]. The router owns that loop on
//! a dedicated thread and demultiplexes each envelope to the connection named
//! by its `@client_id`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use tdlink_types::functions::SetLogVerbosityLevel;
use tdlink_types::{ConnectionId, Envelope};

use crate::client::{Client, ClientOptions, execute};
use crate::connection::{Connection, DispatchOutcome};
use crate::engine::Engine;
use crate::error::ClientError;

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(2);

const ROUTER_THREAD_NAME: &str = "tdlink-router";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// How long one `poll` may block. Bounds how quickly shutdown is noticed.
    pub poll_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl RouterConfig {
    #[must_use]
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

/// Connection identity to dispatch context. One per router, never global.
#[derive(Default)]
pub(crate) struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConnectionId, Arc<Connection>>> {
        self.connections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnectionId, Arc<Connection>>> {
        self.connections.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, connection: Arc<Connection>) {
        self.write().insert(connection.id(), connection);
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.write().remove(&id)
    }

    /// Find the owner of an envelope. Without `@client_id` a sole connection owns it.
    pub fn lookup(&self, id: Option<ConnectionId>) -> Option<Arc<Connection>> {
        let connections = self.read();
        match id {
            Some(id) => connections.get(&id).cloned(),
            None if connections.len() == 1 => connections.values().next().cloned(),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn drain(&self) -> Vec<Arc<Connection>> {
        self.write().drain().map(|(_, connection)| connection).collect()
    }
}

pub(crate) struct RouterShared {
    engine: Arc<dyn Engine>,
    registry: ConnectionRegistry,
    stop: AtomicBool,
    config: RouterConfig,
}

impl RouterShared {
    fn new(engine: Arc<dyn Engine>, config: RouterConfig) -> Self {
        Self {
            engine,
            registry: ConnectionRegistry::default(),
            stop: AtomicBool::new(false),
            config,
        }
    }

    fn run(&self) {
        tracing::info!(poll_timeout = ?self.config.poll_timeout, "router started");
        while !self.stop.load(Ordering::Acquire) {
            if let Some(raw) = self.engine.poll(self.config.poll_timeout) {
                self.dispatch(raw);
            }
        }
        for connection in self.registry.drain() {
            connection.shut_down();
        }
        tracing::info!("router stopped");
    }

    pub(crate) fn dispatch(&self, raw: String) -> DispatchOutcome {
        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed envelope");
                return DispatchOutcome::Malformed;
            }
        };

        let Some(connection) = self.registry.lookup(envelope.connection_id()) else {
            tracing::warn!(
                connection = ?envelope.connection_id(),
                kind = envelope.kind(),
                "no connection for envelope"
            );
            return DispatchOutcome::UnknownConnection;
        };

        let outcome = connection.dispatch(envelope);
        if connection.is_closed() {
            self.registry.remove(connection.id());
            tracing::info!(connection = %connection.id(), "connection closed; deregistered");
        }
        outcome
    }
}

/// Owns the poll loop for one engine and the connections opened on it.
///
/// Dropping the router stops the loop within one poll timeout; use
/// [`Router::shutdown`] to also wait for it.
pub struct Router {
    shared: Arc<RouterShared>,
    thread: Option<JoinHandle<()>>,
}

impl Router {
    pub fn start(engine: Arc<dyn Engine>, config: RouterConfig) -> Result<Self, ClientError> {
        let shared = Arc::new(RouterShared::new(engine, config));
        let loop_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name(ROUTER_THREAD_NAME.to_string())
            .spawn(move || loop_shared.run())
            .map_err(ClientError::Spawn)?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Open a new logical connection and return its client.
    ///
    /// Log verbosity is applied before the connection exists. A configured
    /// proxy is the connection's first request; its reply is not awaited.
    pub fn open(&self, options: ClientOptions) -> Result<Client, ClientError> {
        let engine = Arc::clone(&self.shared.engine);
        if let Some(level) = options.log_verbosity() {
            execute(
                engine.as_ref(),
                &SetLogVerbosityLevel {
                    new_verbosity_level: level,
                },
            )?;
        }
        let id = engine.create_connection();
        let connection = Arc::new(Connection::new(
            id,
            options.listener_capacity(),
            options.result_observer(),
        ));
        self.shared.registry.insert(Arc::clone(&connection));
        tracing::debug!(connection = %id, "connection opened");

        let client = Client::new(connection, engine, &options);
        if let Some(proxy) = options.proxy()
            && let Err(err) = client.submit_detached(proxy)
        {
            self.shared.registry.remove(id);
            return Err(err);
        }
        Ok(client)
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.shared.engine
    }

    /// Connections that have not reached the closed state yet.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Stop the loop and wait for it. Remaining connections are shut down.
    pub fn shutdown(mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!("router thread panicked");
        }
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;
    use tdlink_types::CorrelationId;

    fn shared_with(connections: &[i32]) -> RouterShared {
        let shared = RouterShared::new(Arc::new(ScriptedEngine::new()), RouterConfig::default());
        for &id in connections {
            shared
                .registry
                .insert(Arc::new(Connection::new(ConnectionId::new(id), 8, None)));
        }
        shared
    }

    #[test]
    fn malformed_envelopes_are_skipped() {
        let shared = shared_with(&[1]);
        assert_eq!(shared.dispatch("{not json".into()), DispatchOutcome::Malformed);
        assert_eq!(
            shared.dispatch(r#"{"@extra":"x"}"#.into()),
            DispatchOutcome::Malformed
        );
    }

    #[test]
    fn unknown_connection_is_skipped() {
        let shared = shared_with(&[1]);
        let outcome = shared.dispatch(r#"{"@type":"updateOption","@client_id":9}"#.into());
        assert_eq!(outcome, DispatchOutcome::UnknownConnection);
    }

    #[test]
    fn missing_client_id_needs_a_sole_connection() {
        let sole = shared_with(&[1]);
        assert!(matches!(
            sole.dispatch(r#"{"@type":"updateOption"}"#.into()),
            DispatchOutcome::Broadcast { .. }
        ));

        let several = shared_with(&[1, 2]);
        assert_eq!(
            several.dispatch(r#"{"@type":"updateOption"}"#.into()),
            DispatchOutcome::UnknownConnection
        );
    }

    #[tokio::test]
    async fn routes_by_client_id() {
        let shared = shared_with(&[1, 2]);
        let second = shared.registry.lookup(Some(ConnectionId::new(2))).unwrap();
        let waiter = second.pending().register(CorrelationId::new("a")).unwrap();

        let outcome = shared.dispatch(r#"{"@type":"ok","@extra":"a","@client_id":2}"#.into());
        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert!(waiter.rx.await.is_ok());
    }

    #[test]
    fn closed_connection_is_deregistered() {
        let shared = shared_with(&[1, 2]);
        shared.dispatch(
            r#"{"@type":"updateAuthorizationState","@client_id":1,"authorization_state":{"@type":"authorizationStateClosed"}}"#
                .into(),
        );
        assert_eq!(shared.registry.len(), 1);
        assert!(shared.registry.lookup(Some(ConnectionId::new(1))).is_none());
        assert!(shared.registry.lookup(Some(ConnectionId::new(2))).is_some());
    }

    #[test]
    fn config_builder_sets_poll_timeout() {
        let config = RouterConfig::default().poll_timeout(Duration::from_millis(50));
        assert_eq!(config.poll_timeout, Duration::from_millis(50));
        assert_eq!(RouterConfig::default().poll_timeout, DEFAULT_POLL_TIMEOUT);
    }
}
