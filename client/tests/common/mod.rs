#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tdlink_client::testing::ScriptedEngine;
use tdlink_client::{Client, ClientOptions, Router, RouterConfig, SequentialIds};

pub const POLL: Duration = Duration::from_millis(10);
pub const WAIT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub engine: Arc<ScriptedEngine>,
    pub router: Router,
    pub client: Client,
}

impl Harness {
    pub fn new(engine: ScriptedEngine) -> Self {
        Self::with_options(engine, ClientOptions::default())
    }

    pub fn with_options(engine: ScriptedEngine, options: ClientOptions) -> Self {
        let engine = Arc::new(engine);
        let router = Router::start(engine.clone(), RouterConfig::default().poll_timeout(POLL))
            .expect("router starts");
        let client = router
            .open(options.with_id_generator(Arc::new(SequentialIds::new("req-"))))
            .expect("connection opens");
        Self {
            engine,
            router,
            client,
        }
    }

    pub fn push(&self, message: Value) {
        self.engine.push(self.client.connection_id(), message);
    }

    pub async fn wait_for_listeners(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while self.client.listener_count() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "listeners never subscribed"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

pub fn text_message(id: i64, sender: i64, text: &str) -> Value {
    json!({
        "@type": "message",
        "id": id,
        "chat_id": 77,
        "sender_id": {"@type": "messageSenderUser", "user_id": sender},
        "is_outgoing": false,
        "content": {
            "@type": "messageText",
            "text": {"@type": "formattedText", "text": text}
        }
    })
}

pub fn new_message(message: Value) -> Value {
    json!({"@type": "updateNewMessage", "message": message})
}
