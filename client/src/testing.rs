//! An in-memory engine for tests.
//!
//! Requests are recorded and answered by a responder closure; anything the
//! responder returns is queued for the router, stamped with the requesting
//! connection's `@client_id`. Tests can also push unsolicited events.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;
use tdlink_types::ConnectionId;

use crate::engine::{Engine, LogCallback};

type Responder = Box<dyn FnMut(ConnectionId, &Value) -> Vec<Value> + Send>;
type SyncResponder = Box<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// One request as the engine received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    pub connection: ConnectionId,
    pub request: Value,
}

impl Submitted {
    #[must_use]
    pub fn kind(&self) -> &str {
        self.request
            .get("@type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct EngineState {
    outbox: VecDeque<String>,
    submitted: Vec<Submitted>,
}

pub struct ScriptedEngine {
    state: Mutex<EngineState>,
    ready: Condvar,
    next_connection: AtomicI32,
    responder: Mutex<Option<Responder>>,
    sync_responder: Option<SyncResponder>,
    log_callback: Mutex<Option<(i32, LogCallback)>>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    /// An engine that records requests and never answers them.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            ready: Condvar::new(),
            next_connection: AtomicI32::new(1),
            responder: Mutex::new(None),
            sync_responder: None,
            log_callback: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_responder(
        self,
        responder: impl FnMut(ConnectionId, &Value) -> Vec<Value> + Send + 'static,
    ) -> Self {
        self.set_responder(responder);
        self
    }

    #[must_use]
    pub fn with_sync_responder(
        mut self,
        responder: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.sync_responder = Some(Box::new(responder));
        self
    }

    pub fn set_responder(
        &self,
        responder: impl FnMut(ConnectionId, &Value) -> Vec<Value> + Send + 'static,
    ) {
        *self
            .responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(responder));
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a message for `connection` as if the engine emitted it.
    pub fn push(&self, connection: ConnectionId, mut message: Value) {
        if let Some(map) = message.as_object_mut() {
            map.insert("@client_id".into(), connection.value().into());
        }
        self.push_raw(message.to_string());
    }

    /// Queue raw text verbatim, malformed or not.
    pub fn push_raw(&self, raw: impl Into<String>) {
        self.state().outbox.push_back(raw.into());
        self.ready.notify_one();
    }

    #[must_use]
    pub fn submitted(&self) -> Vec<Submitted> {
        self.state().submitted.clone()
    }

    #[must_use]
    pub fn submitted_types(&self) -> Vec<String> {
        self.state()
            .submitted
            .iter()
            .map(|s| s.kind().to_string())
            .collect()
    }

    /// Wait until at least `count` requests have been submitted.
    pub async fn wait_for_submissions(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state().submitted.len() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Emit one line through the installed log callback, if any.
    pub fn log(&self, verbosity: i32, message: &str) {
        let installed = self
            .log_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some((max, callback)) = installed
            && verbosity <= max
        {
            callback(verbosity, message);
        }
    }
}

impl Engine for ScriptedEngine {
    fn create_connection(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }

    fn submit(&self, connection: ConnectionId, request: &str) {
        let Ok(request) = serde_json::from_str::<Value>(request) else {
            tracing::warn!("scripted engine got a non-JSON request");
            return;
        };
        self.state().submitted.push(Submitted {
            connection,
            request: request.clone(),
        });

        // Outside the state lock: the responder may push.
        let replies = {
            let mut responder = self.responder.lock().unwrap_or_else(PoisonError::into_inner);
            match responder.as_mut() {
                Some(respond) => respond(connection, &request),
                None => Vec::new(),
            }
        };
        for reply in replies {
            self.push(connection, reply);
        }
    }

    fn poll(&self, timeout: Duration) -> Option<String> {
        let mut state = self.state();
        if state.outbox.is_empty() {
            state = self
                .ready
                .wait_timeout_while(state, timeout, |s| s.outbox.is_empty())
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        state.outbox.pop_front()
    }

    fn execute_sync(&self, request: &str) -> Option<String> {
        let request: Value = serde_json::from_str(request).ok()?;
        let respond = self.sync_responder.as_ref()?;
        respond(&request).map(|reply| reply.to_string())
    }

    fn set_log_message_callback(&self, max_verbosity: i32, callback: Option<LogCallback>) {
        *self
            .log_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = callback.map(|cb| (max_verbosity, cb));
    }
}

/// A reply to `request` with the given body; `@extra` is echoed.
#[must_use]
pub fn reply_to(request: &Value, body: &Value) -> Value {
    let mut reply = body.clone();
    if let (Some(map), Some(extra)) = (reply.as_object_mut(), request.get("@extra")) {
        map.insert("@extra".into(), extra.clone());
    }
    reply
}

#[must_use]
pub fn ok_reply(request: &Value) -> Value {
    reply_to(request, &serde_json::json!({"@type": "ok"}))
}

#[must_use]
pub fn error_reply(request: &Value, code: i32, message: &str) -> Value {
    reply_to(
        request,
        &serde_json::json!({"@type": "error", "code": code, "message": message}),
    )
}

/// An `updateAuthorizationState` event for the given state object.
#[must_use]
pub fn authorization_update(state: &str) -> Value {
    serde_json::json!({
        "@type": "updateAuthorizationState",
        "authorization_state": {"@type": state}
    })
}
