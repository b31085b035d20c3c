//! The per-connection facade: correlated requests, subscriptions, and the
//! synchronous execute path.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tdlink_types::functions::{
    AddProxy, Close, Destroy, GetAuthorizationState, GetMe, GetMessage, GetOption, LogOut,
};
use tdlink_types::{
    Ack, AuthorizationState, ConnectionId, CorrelationId, EngineError, Envelope, EnvelopeError,
    Function, Message, OptionValue, User, encode_request, tag_json,
};

use crate::connection::{Connection, ResultObserver};
use crate::engine::Engine;
use crate::error::ClientError;
use crate::ids::{IdGenerator, UuidV4Ids};
use crate::listener::Listener;
use crate::pending::Waiter;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_LISTENER_CAPACITY: usize = 1000;

/// Settings for one connection opened through [`Router::open`](crate::Router::open).
#[derive(Clone)]
pub struct ClientOptions {
    request_timeout: Duration,
    ids: Arc<dyn IdGenerator>,
    listener_capacity: usize,
    result_observer: Option<ResultObserver>,
    log_verbosity: Option<i32>,
    proxy: Option<AddProxy>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ids: Arc::new(UuidV4Ids),
            listener_capacity: DEFAULT_LISTENER_CAPACITY,
            result_observer: None,
            log_verbosity: None,
            proxy: None,
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("request_timeout", &self.request_timeout)
            .field("listener_capacity", &self.listener_capacity)
            .field("result_observer", &self.result_observer.is_some())
            .field("log_verbosity", &self.log_verbosity)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

impl ClientOptions {
    /// Default deadline for [`Client::send`].
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Bound of every listener's queue. Clamped to at least one.
    #[must_use]
    pub fn with_listener_capacity(mut self, capacity: usize) -> Self {
        self.listener_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_result_observer(
        mut self,
        observer: impl Fn(ConnectionId, &Envelope) + Send + Sync + 'static,
    ) -> Self {
        self.result_observer = Some(Arc::new(observer));
        self
    }

    /// Engine log verbosity, applied synchronously when the connection opens.
    #[must_use]
    pub fn with_log_verbosity(mut self, level: i32) -> Self {
        self.log_verbosity = Some(level);
        self
    }

    /// Proxy registered on the connection as its first request.
    #[must_use]
    pub fn with_proxy(mut self, proxy: AddProxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn listener_capacity(&self) -> usize {
        self.listener_capacity
    }

    #[must_use]
    pub fn log_verbosity(&self) -> Option<i32> {
        self.log_verbosity
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&AddProxy> {
        self.proxy.as_ref()
    }

    pub(crate) fn result_observer(&self) -> Option<ResultObserver> {
        self.result_observer.clone()
    }
}

struct ClientInner {
    connection: Arc<Connection>,
    engine: Arc<dyn Engine>,
    ids: Arc<dyn IdGenerator>,
    request_timeout: Duration,
}

/// One logical connection. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("connection", &self.inner.connection.id())
            .field("request_timeout", &self.inner.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub(crate) fn new(
        connection: Arc<Connection>,
        engine: Arc<dyn Engine>,
        options: &ClientOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                connection,
                engine,
                ids: Arc::clone(&options.ids),
                request_timeout: options.request_timeout,
            }),
        }
    }

    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.inner.connection.id()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }

    /// Whether the engine has reported this connection closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.connection.is_closed()
    }

    /// Requests currently waiting for a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.connection.pending().len()
    }

    /// Registered listeners; closed ones count until the next fan-out compacts them.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.connection.listener_count()
    }

    /// A new listener that sees every event from now on.
    #[must_use]
    pub fn subscribe(&self) -> Listener {
        self.inner.connection.subscribe()
    }

    pub async fn send<F: Function>(&self, request: &F) -> Result<F::Response, ClientError> {
        self.send_with_timeout(request, self.inner.request_timeout)
            .await
    }

    pub async fn send_with_timeout<F: Function>(
        &self,
        request: &F,
        timeout: Duration,
    ) -> Result<F::Response, ClientError> {
        self.send_until(request, timeout, std::future::pending())
            .await
    }

    /// Like [`send_with_timeout`](Self::send_with_timeout), but also gives up
    /// with [`ClientError::Canceled`] as soon as `cancel` completes.
    pub async fn send_until<F, C>(
        &self,
        request: &F,
        timeout: Duration,
        cancel: C,
    ) -> Result<F::Response, ClientError>
    where
        F: Function,
        C: Future<Output = ()>,
    {
        let id = self.inner.ids.next_id();
        let raw = encode_request(request, Some(&id))?;
        let envelope = self.round_trip(id, F::TYPE, raw, timeout, cancel).await?;
        decode_reply(&envelope)
    }

    /// Send a request built elsewhere. It must carry its own `@type`.
    ///
    /// Returns the raw reply envelope; an error-shaped reply is still an error.
    pub async fn send_json(&self, request: serde_json::Value) -> Result<Envelope, ClientError> {
        let kind = request
            .get("@type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = self.inner.ids.next_id();
        let raw = tag_json(request, &id)?;
        let envelope = self
            .round_trip(
                id,
                &kind,
                raw,
                self.inner.request_timeout,
                std::future::pending(),
            )
            .await?;
        match envelope.engine_error() {
            Some(error) => Err(engine_failure(&envelope, error)),
            None => Ok(envelope),
        }
    }

    /// Submit without waiting. The reply reaches only the result observer;
    /// an error-shaped one is logged.
    pub(crate) fn submit_detached<F: Function>(&self, request: &F) -> Result<(), ClientError> {
        let id = self.inner.ids.next_id();
        let raw = encode_request(request, Some(&id))?;
        self.inner.engine.submit(self.connection_id(), &raw);
        tracing::debug!(
            connection = %self.connection_id(),
            correlation_id = %id,
            request = F::TYPE,
            "request submitted without waiter"
        );
        Ok(())
    }

    async fn round_trip<C>(
        &self,
        id: CorrelationId,
        kind: &str,
        raw: String,
        timeout: Duration,
        cancel: C,
    ) -> Result<Envelope, ClientError>
    where
        C: Future<Output = ()>,
    {
        let connection = &self.inner.connection;
        // Registered before submitting so a fast reply cannot slip past.
        let Waiter { rx, guard } = connection.pending().register(id)?;
        if connection.is_closed() {
            return Err(ClientError::Closed);
        }
        self.inner.engine.submit(connection.id(), &raw);
        tracing::trace!(
            connection = %connection.id(),
            correlation_id = %guard.id(),
            request = kind,
            "request submitted"
        );

        let waited = tokio::time::timeout(timeout, async {
            tokio::select! {
                reply = rx => reply.map_err(|_| ClientError::Closed),
                () = cancel => Err(ClientError::Canceled { request: kind.to_string() }),
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(
                    connection = %connection.id(),
                    correlation_id = %guard.id(),
                    request = kind,
                    ?timeout,
                    "request timed out"
                );
                Err(ClientError::Timeout {
                    request: kind.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Run a request on the engine's synchronous path, bypassing the router.
    pub fn execute<F: Function>(&self, request: &F) -> Result<F::Response, ClientError> {
        execute(self.inner.engine.as_ref(), request)
    }

    /// Synchronous path for a request built elsewhere.
    pub fn execute_json(&self, request: &serde_json::Value) -> Result<serde_json::Value, ClientError> {
        let kind = request
            .get("@type")
            .and_then(serde_json::Value::as_str)
            .filter(|kind| !kind.is_empty())
            .ok_or(ClientError::Encode(EnvelopeError::MissingType))?;
        let reply = self
            .inner
            .engine
            .execute_sync(&request.to_string())
            .ok_or_else(|| ClientError::ExecuteRejected {
                request: kind.to_string(),
            })?;
        let envelope = Envelope::parse(reply).map_err(ClientError::MalformedReply)?;
        decode_reply(&envelope)
    }

    pub async fn get_authorization_state(&self) -> Result<AuthorizationState, ClientError> {
        self.send(&GetAuthorizationState {}).await
    }

    /// Ask the engine to close the connection. It still walks through the
    /// closing states before the connection is torn down.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.send(&Close {}).await.map(|Ack {}| ())
    }

    pub async fn log_out(&self) -> Result<(), ClientError> {
        self.send(&LogOut {}).await.map(|Ack {}| ())
    }

    pub async fn destroy(&self) -> Result<(), ClientError> {
        self.send(&Destroy {}).await.map(|Ack {}| ())
    }

    pub async fn get_me(&self) -> Result<User, ClientError> {
        self.send(&GetMe {}).await
    }

    pub async fn get_message(&self, chat_id: i64, message_id: i64) -> Result<Message, ClientError> {
        self.send(&GetMessage {
            chat_id,
            message_id,
        })
        .await
    }

    pub async fn get_option(&self, name: impl Into<String>) -> Result<OptionValue, ClientError> {
        self.send(&GetOption { name: name.into() }).await
    }
}

/// Run `request` through `engine`'s synchronous path.
pub fn execute<F: Function>(engine: &dyn Engine, request: &F) -> Result<F::Response, ClientError> {
    let raw = encode_request(request, None)?;
    let reply = engine
        .execute_sync(&raw)
        .ok_or_else(|| ClientError::ExecuteRejected {
            request: F::TYPE.to_string(),
        })?;
    let envelope = Envelope::parse(reply).map_err(ClientError::MalformedReply)?;
    decode_reply(&envelope)
}

fn decode_reply<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, ClientError> {
    if let Some(error) = envelope.engine_error() {
        return Err(engine_failure(envelope, error));
    }
    envelope.decode().map_err(|source| ClientError::Decode {
        kind: envelope.kind().to_string(),
        source,
    })
}

fn engine_failure(envelope: &Envelope, error: Result<EngineError, serde_json::Error>) -> ClientError {
    match error {
        Ok(error) => ClientError::Engine(error),
        Err(source) => ClientError::Decode {
            kind: envelope.kind().to_string(),
            source,
        },
    }
}
