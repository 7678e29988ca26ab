//! End-to-end tests against a real broker.
//!
//! All tests are ignored by default: they need a RabbitMQ reachable with the
//! stock guest credentials on localhost:5672. Run them with
//!     cargo test --test two_party -- --ignored

use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use hutch::{BrokerConfig, Delivery, MessageKind, MessageOptions, Messenger};

const RECV_DEADLINE: Duration = Duration::from_secs(5);

fn fresh_service() -> String {
    format!("svc-{}", Uuid::new_v4().simple())
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Delivery {
    timeout(RECV_DEADLINE, rx.recv())
        .await
        .expect("timed out waiting for a delivery")
        .expect("delivery channel closed")
}

#[tokio::test]
#[ignore = "requires a RabbitMQ broker on localhost:5672"]
async fn publish_reaches_listener_with_key_args_origin() {
    let service = fresh_service();
    let sender = Messenger::new(BrokerConfig::default(), &service);
    let listener = Messenger::new(BrokerConfig::default(), &service);

    let (tx, mut rx) = mpsc::unbounded_channel();
    listener
        .listen(move |delivery| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(delivery);
                Ok(Value::Null)
            }
        })
        .await
        .expect("listen");

    sender
        .publish(&format!("{service}.created"), &json!({"id": 7}), None)
        .await
        .expect("publish");

    let delivery = recv(&mut rx).await;
    assert_eq!(delivery.key, "created");
    assert_eq!(delivery.args, json!({"id": 7}));
    assert_eq!(delivery.origin, service);
    assert_eq!(delivery.kind, MessageKind::Notify);

    sender.close().await;
    listener.close().await;
}

#[tokio::test]
#[ignore = "requires a RabbitMQ broker on localhost:5672"]
async fn invoke_resolves_with_handler_result() {
    let service = fresh_service();
    let caller = Messenger::new(BrokerConfig::default(), &service);
    let responder = Messenger::new(BrokerConfig::default(), &service);

    responder
        .listen(|delivery| async move { Ok(json!({"echo": delivery.args})) })
        .await
        .expect("listen");

    let reply = caller
        .invoke(&format!("{service}.ping"), &json!({"n": 1}), None)
        .await
        .expect("invoke");
    assert_eq!(reply, json!({"echo": {"n": 1}}));

    caller.close().await;
    responder.close().await;
}

#[tokio::test]
#[ignore = "requires a RabbitMQ broker on localhost:5672"]
async fn invoke_rejects_with_handler_error() {
    let service = fresh_service();
    let caller = Messenger::new(BrokerConfig::default(), &service);
    let responder = Messenger::new(BrokerConfig::default(), &service);

    responder
        .listen(|_| async move { Err(json!("refused")) })
        .await
        .expect("listen");

    let result = caller
        .invoke(&format!("{service}.ping"), &json!({}), None)
        .await;
    match result {
        Err(hutch::Error::Rejected { error, .. }) => assert_eq!(error, json!("refused")),
        other => panic!("expected a rejection, got {other:?}"),
    }

    caller.close().await;
    responder.close().await;
}

#[tokio::test]
#[ignore = "requires a RabbitMQ broker on localhost:5672"]
async fn invoke_times_out_without_responder() {
    let service = fresh_service();
    let caller = Messenger::new(BrokerConfig::default(), &service);

    let options = MessageOptions {
        timeout: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let result = caller
        .invoke(&format!("{service}.ping"), &json!({}), Some(options))
        .await;
    assert!(matches!(result, Err(hutch::Error::InvokeTimeout { .. })));

    caller.close().await;
}

#[tokio::test]
#[ignore = "requires a RabbitMQ broker on localhost:5672"]
async fn broadcast_reaches_every_live_listener() {
    let service = fresh_service();
    let sender = Messenger::new(BrokerConfig::default(), &service);
    let first = Messenger::new(BrokerConfig::default(), &service);
    let second = Messenger::new(BrokerConfig::default(), &service);

    let (tx1, mut rx1) = mpsc::unbounded_channel();
    first
        .listen(move |delivery| {
            let tx = tx1.clone();
            async move {
                let _ = tx.send(delivery);
                Ok(Value::Null)
            }
        })
        .await
        .expect("listen first");
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    second
        .listen(move |delivery| {
            let tx = tx2.clone();
            async move {
                let _ = tx.send(delivery);
                Ok(Value::Null)
            }
        })
        .await
        .expect("listen second");

    sender
        .broadcast(&format!("{service}.refresh"), &json!({"why": "cache"}))
        .await
        .expect("broadcast");

    for rx in [&mut rx1, &mut rx2] {
        let delivery = recv(rx).await;
        assert_eq!(delivery.kind, MessageKind::Broadcast);
        assert_eq!(delivery.key, "refresh");
        assert_eq!(delivery.args, json!({"why": "cache"}));
        assert_eq!(delivery.origin, service);
    }

    // a late joiner never sees the broadcast
    let late = Messenger::new(BrokerConfig::default(), &service);
    let (tx3, mut rx3) = mpsc::unbounded_channel();
    late.listen(move |delivery| {
        let tx = tx3.clone();
        async move {
            let _ = tx.send(delivery);
            Ok(Value::Null)
        }
    })
    .await
    .expect("listen late");
    assert!(
        timeout(Duration::from_secs(1), rx3.recv()).await.is_err(),
        "late listener must not receive an earlier broadcast"
    );

    sender.close().await;
    first.close().await;
    second.close().await;
    late.close().await;
}

#[tokio::test]
#[ignore = "requires a RabbitMQ broker on localhost:5672"]
async fn concurrent_invokes_keep_their_own_replies() {
    let service = fresh_service();
    let caller = Messenger::new(BrokerConfig::default(), &service);
    let responder = Messenger::new(BrokerConfig::default(), &service);

    responder
        .listen(|delivery| async move { Ok(json!({"echo": delivery.args})) })
        .await
        .expect("listen");

    let calls = (0..8).map(|n| {
        let caller = &caller;
        let key = format!("{service}.ping");
        async move {
            let reply = caller.invoke(&key, &json!({"n": n}), None).await.expect("invoke");
            (n, reply)
        }
    });
    for (n, reply) in futures_util::future::join_all(calls).await {
        assert_eq!(reply, json!({"echo": {"n": n}}));
    }

    caller.close().await;
    responder.close().await;
}

#[tokio::test]
#[ignore = "requires a RabbitMQ broker on localhost:5672"]
async fn connect_twice_is_idempotent() {
    let service = fresh_service();
    let messenger = Messenger::new(BrokerConfig::default(), &service);
    messenger.connect().await.expect("first connect");
    messenger.connect().await.expect("second connect");
    messenger
        .publish(&format!("{service}.created"), &json!({"id": 1}), None)
        .await
        .expect("publish after double connect");
    messenger.close().await;
}

#[tokio::test]
#[ignore = "requires a RabbitMQ broker on localhost:5672"]
async fn two_party_echo_scenario() {
    let service = fresh_service();
    let a = Messenger::new(BrokerConfig::default(), &service);
    let b = Messenger::new(BrokerConfig::default(), &service);
    a.connect().await.expect("connect a");
    b.connect().await.expect("connect b");

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    b.listen(move |delivery| {
        let seen = seen_tx.clone();
        async move {
            let args = delivery.args.clone();
            let _ = seen.send(delivery);
            Ok(json!({"echo": args}))
        }
    })
    .await
    .expect("listen");

    let reply = a
        .invoke(&format!("{service}.ping"), &json!({"n": 1}), None)
        .await
        .expect("invoke");
    assert_eq!(reply, json!({"echo": {"n": 1}}));

    let request = recv(&mut seen_rx).await;
    assert_eq!(request.key, "ping");
    assert_eq!(request.args, json!({"n": 1}));
    assert_eq!(request.origin, service);
    assert_eq!(request.kind, MessageKind::Request);

    a.close().await;
    b.close().await;
}
