//! Request/response correlation through a running router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Harness, WAIT};
use serde_json::json;
use tdlink_client::testing::{ScriptedEngine, error_reply, ok_reply, reply_to};
use tdlink_client::{ClientError, ClientOptions, IdGenerator, Router, RouterConfig};
use tdlink_types::{CorrelationId, OptionValue};
use tdlink_types::functions::{GetOption, SetAuthenticationPhoneNumber};

const NAMES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for (i, &first) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            out.push(tail);
        }
    }
    out
}

#[tokio::test]
async fn every_caller_gets_its_own_reply_in_any_order() {
    let orders = permutations(&[0, 1, 2, 3]);
    assert_eq!(orders.len(), 24);

    for order in orders {
        let harness = Harness::new(ScriptedEngine::new());

        let mut tasks = Vec::new();
        for name in NAMES {
            let client = harness.client.clone();
            tasks.push(tokio::spawn(async move {
                client.get_option(name).await
            }));
        }
        assert!(harness.engine.wait_for_submissions(4, WAIT).await);

        let submitted = harness.engine.submitted();
        for &index in &order {
            let request = &submitted[index].request;
            let name = request["name"].as_str().unwrap();
            harness.push(reply_to(
                request,
                &json!({"@type": "optionValueString", "value": name}),
            ));
        }

        for (task, name) in tasks.into_iter().zip(NAMES) {
            let value = task.await.unwrap().unwrap();
            assert_eq!(
                value,
                OptionValue::String {
                    value: name.to_string()
                },
                "order {order:?}"
            );
        }
        assert_eq!(harness.client.pending_count(), 0);
        harness.router.shutdown();
    }
}

#[tokio::test]
async fn timeout_leaves_no_waiter_behind() {
    let harness = Harness::new(ScriptedEngine::new());

    let err = harness
        .client
        .send_with_timeout(
            &GetOption {
                name: "version".into(),
            },
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "{err}");
    assert_eq!(harness.client.pending_count(), 0);
}

#[tokio::test]
async fn late_reply_is_dropped_without_disturbing_others() {
    let harness = Harness::new(ScriptedEngine::new());
    let mut listener = harness.client.subscribe();

    let err = harness
        .client
        .send_with_timeout(
            &GetOption {
                name: "late".into(),
            },
            Duration::from_millis(30),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    let late_request = harness.engine.submitted()[0].request.clone();

    let client = harness.client.clone();
    let inflight = tokio::spawn(async move { client.get_option("current").await });
    assert!(harness.engine.wait_for_submissions(2, WAIT).await);
    let current_request = harness.engine.submitted()[1].request.clone();

    harness.push(reply_to(
        &late_request,
        &json!({"@type": "optionValueString", "value": "late"}),
    ));
    harness.push(reply_to(
        &current_request,
        &json!({"@type": "optionValueString", "value": "current"}),
    ));

    let value = inflight.await.unwrap().unwrap();
    assert_eq!(
        value,
        OptionValue::String {
            value: "current".into()
        }
    );
    assert_eq!(harness.client.pending_count(), 0);

    // Replies never reach listeners, orphaned or not.
    harness.push(json!({"@type": "updateOption", "name": "marker"}));
    let event = tokio::time::timeout(WAIT, listener.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(&*event, tdlink_types::Event::Other { kind, .. } if kind == "updateOption"));
}

#[tokio::test]
async fn engine_error_reply_becomes_a_domain_error() {
    let engine = ScriptedEngine::new().with_responder(|_, request| {
        if request["@type"] == "setAuthenticationPhoneNumber" {
            vec![error_reply(request, 400, "PHONE_NUMBER_INVALID")]
        } else {
            vec![ok_reply(request)]
        }
    });
    let harness = Harness::new(engine);
    let request = SetAuthenticationPhoneNumber {
        phone_number: "+0".into(),
        settings: Default::default(),
    };

    for _ in 0..3 {
        let err = harness.client.send(&request).await.unwrap_err();
        let ClientError::Engine(engine_error) = err else {
            panic!("expected an engine error, got {err:?}");
        };
        assert_eq!(engine_error.code, 400);
        assert_eq!(engine_error.message, "PHONE_NUMBER_INVALID");
    }

    harness.client.close().await.unwrap();
}

#[tokio::test]
async fn send_json_round_trips_raw_envelopes() {
    let engine = ScriptedEngine::new().with_responder(|_, request| {
        vec![reply_to(
            request,
            &json!({"@type": "user", "id": 99, "first_name": "Ada"}),
        )]
    });
    let harness = Harness::new(engine);

    let envelope = harness
        .client
        .send_json(json!({"@type": "getUser", "user_id": 99}))
        .await
        .unwrap();
    assert_eq!(envelope.kind(), "user");
    let user: tdlink_types::User = envelope.decode().unwrap();
    assert_eq!(user.first_name, "Ada");

    let submitted = harness.engine.submitted();
    assert_eq!(submitted[0].request["@extra"], "req-1");
    assert_eq!(submitted[0].connection, harness.client.connection_id());
}

#[tokio::test]
async fn closed_state_fails_pending_requests_and_ends_listeners() {
    let harness = Harness::new(ScriptedEngine::new());
    let mut listener = harness.client.subscribe();

    let client = harness.client.clone();
    let pending = tokio::spawn(async move { client.get_me().await });
    assert!(harness.engine.wait_for_submissions(1, WAIT).await);

    harness.push(tdlink_client::testing::authorization_update(
        "authorizationStateClosed",
    ));

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, ClientError::Closed), "{err}");

    let event = tokio::time::timeout(WAIT, listener.next())
        .await
        .unwrap()
        .unwrap();
    assert!(event.is_connection_closed());
    assert!(listener.next().await.is_none());

    assert!(harness.client.is_closed());
    assert_eq!(harness.router.connection_count(), 0);
    assert!(matches!(
        harness.client.get_me().await,
        Err(ClientError::Closed)
    ));
}

#[tokio::test]
async fn log_verbosity_is_applied_on_open() {
    let engine = ScriptedEngine::new().with_sync_responder(|request| {
        (request["@type"] == "setLogVerbosityLevel" && request["new_verbosity_level"] == 1)
            .then(|| json!({"@type": "ok"}))
    });
    let harness = Harness::with_options(engine, ClientOptions::default().with_log_verbosity(1));
    assert!(!harness.client.is_closed());

    let rejecting = ScriptedEngine::new();
    let router = tdlink_client::Router::start(
        std::sync::Arc::new(rejecting),
        tdlink_client::RouterConfig::default(),
    )
    .unwrap();
    let err = router
        .open(ClientOptions::default().with_log_verbosity(1))
        .unwrap_err();
    assert!(matches!(err, ClientError::ExecuteRejected { .. }));
}

struct FixedId;

impl IdGenerator for FixedId {
    fn next_id(&self) -> CorrelationId {
        CorrelationId::new("same")
    }
}

#[tokio::test]
async fn reused_correlation_id_fails_the_newcomer_only() {
    let engine = Arc::new(ScriptedEngine::new());
    let router = Router::start(
        engine.clone(),
        RouterConfig::default().poll_timeout(common::POLL),
    )
    .unwrap();
    let client = router
        .open(ClientOptions::default().with_id_generator(Arc::new(FixedId)))
        .unwrap();

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.get_option("version").await }
    });
    assert!(engine.wait_for_submissions(1, WAIT).await);

    let err = client.get_option("version").await.unwrap_err();
    assert!(
        matches!(err, ClientError::DuplicateCorrelationId { ref id } if id.as_str() == "same"),
        "{err}"
    );
    assert_eq!(engine.submitted().len(), 1);

    let request = engine.submitted()[0].request.clone();
    engine.push(
        client.connection_id(),
        reply_to(&request, &json!({"@type": "optionValueString", "value": "1.8"})),
    );
    let value = first.await.unwrap().unwrap();
    assert_eq!(
        value,
        OptionValue::String {
            value: "1.8".into()
        }
    );
    assert_eq!(client.pending_count(), 0);
}
