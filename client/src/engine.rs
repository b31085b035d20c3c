//! The boundary with the native engine.
//!
//! The engine is a fixed collaborator with a blocking, FFI-shaped surface. It
//! is shared by every logical connection, and `poll` must only ever be called
//! by one reader at a time; the [`Router`](crate::Router) owns that role.

use std::sync::Arc;
use std::time::Duration;

use tdlink_types::ConnectionId;

/// Receives one line of the engine's internal log with its verbosity level.
pub type LogCallback = Arc<dyn Fn(i32, &str) + Send + Sync>;

pub trait Engine: Send + Sync + 'static {
    /// Allocate identity for a new logical connection.
    fn create_connection(&self) -> ConnectionId;

    /// Fire-and-forget submission. Callable from any thread.
    fn submit(&self, connection: ConnectionId, request: &str);

    /// Next outgoing message, or `None` when `timeout` elapses with no traffic.
    fn poll(&self, timeout: Duration) -> Option<String>;

    /// Run one request synchronously. Only a narrow subset of requests is
    /// accepted; `None` means the engine refused to parse or run it.
    fn execute_sync(&self, request: &str) -> Option<String>;

    /// Install (or with `None`, remove) a sink for the engine's own log.
    fn set_log_message_callback(&self, _max_verbosity: i32, _callback: Option<LogCallback>) {}
}

/// Route the engine's internal log into `tracing`.
pub fn forward_engine_logs(engine: &dyn Engine, max_verbosity: i32) {
    engine.set_log_message_callback(max_verbosity, Some(Arc::new(log_engine_line)));
}

fn log_engine_line(verbosity: i32, message: &str) {
    let message = message.trim_end();
    match verbosity {
        i32::MIN..=0 => tracing::error!(target: "tdlink::engine", "{message}"),
        1 => tracing::warn!(target: "tdlink::engine", "{message}"),
        2 => tracing::info!(target: "tdlink::engine", "{message}"),
        3 => tracing::debug!(target: "tdlink::engine", "{message}"),
        _ => tracing::trace!(target: "tdlink::engine", "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEngine {
        installed: Mutex<Option<(i32, bool)>>,
    }

    impl Engine for RecordingEngine {
        fn create_connection(&self) -> ConnectionId {
            ConnectionId::new(1)
        }
        fn submit(&self, _connection: ConnectionId, _request: &str) {}
        fn poll(&self, _timeout: Duration) -> Option<String> {
            None
        }
        fn execute_sync(&self, _request: &str) -> Option<String> {
            None
        }
        fn set_log_message_callback(&self, max_verbosity: i32, callback: Option<LogCallback>) {
            *self.installed.lock().unwrap() = Some((max_verbosity, callback.is_some()));
        }
    }

    #[test]
    fn forwarding_installs_a_callback() {
        let engine = RecordingEngine::default();
        forward_engine_logs(&engine, 3);
        assert_eq!(*engine.installed.lock().unwrap(), Some((3, true)));
    }

    #[test]
    fn log_line_accepts_every_level() {
        for level in [-1, 0, 1, 2, 3, 4, 1024] {
            log_engine_line(level, "[ 1][t 0][1700000000.0][Td.cpp:1]\tline\n");
        }
    }
}
