use serde_json::{Value, json};

use super::invoke::reply_outcome;
use super::*;
use crate::envelope::ReplyBody;

#[test]
fn exchange_is_leading_key_segment() {
    assert_eq!(exchange_of("orders.created"), "orders");
    assert_eq!(exchange_of("orders.item.added"), "orders");
    assert_eq!(exchange_of("orders"), "orders");
}

#[test]
fn message_options_default_to_empty() {
    let options = MessageOptions::default();
    assert!(options.headers.is_none());
    assert!(options.timeout.is_none());
}

#[test]
fn reply_outcome_resolves_on_null_error() {
    let reply = ReplyBody {
        error: None,
        data: Some(json!({"echo": 1})),
    };
    assert_eq!(reply_outcome(Ok(reply)), Ok(json!({"echo": 1})));
}

#[test]
fn reply_outcome_resolves_null_when_data_missing() {
    let reply = ReplyBody {
        error: None,
        data: None,
    };
    assert_eq!(reply_outcome(Ok(reply)), Ok(Value::Null));
}

#[test]
fn reply_outcome_rejects_on_error_field() {
    let reply = ReplyBody {
        error: Some(json!("boom")),
        data: Some(json!({"ignored": true})),
    };
    assert_eq!(reply_outcome(Ok(reply)), Err(json!("boom")));
}

#[test]
fn reply_outcome_rejects_on_malformed_body() {
    let malformed = crate::envelope::decode_reply(b"not json");
    let outcome = reply_outcome(malformed);
    assert!(outcome.is_err());
}

#[test]
fn correlation_tokens_are_unique() {
    let a = uuid::Uuid::new_v4().simple().to_string();
    let b = uuid::Uuid::new_v4().simple().to_string();
    assert_ne!(a, b);
    assert_eq!(a.len(), 32);
}

#[tokio::test]
async fn close_rejects_later_operations() {
    let messenger = Messenger::new(BrokerConfig::default(), "orders");
    messenger.close().await;
    let result = messenger.publish("orders.created", &json!({"id": 1}), None).await;
    assert!(matches!(result, Err(crate::Error::Closed)));
    let result = messenger.invoke("orders.ping", &json!({}), None).await;
    assert!(matches!(result, Err(crate::Error::Closed)));
}

#[test]
fn service_name_is_exposed() {
    let messenger = Messenger::new(BrokerConfig::default(), "orders");
    assert_eq!(messenger.service(), "orders");
}
