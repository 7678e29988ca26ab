use lapin::types::{AMQPValue, FieldTable, ShortString};
use serde_json::{Value, json};

use super::*;

#[test]
fn encode_wraps_payload_in_data() {
    let body = encode_payload(&json!({"id": 7})).unwrap();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed, json!({"data": {"id": 7}}));
}

#[test]
fn decode_unwraps_known_producer() {
    let body = encode_payload(&json!({"id": 7})).unwrap();
    let payload = decode_payload(&body, Some(PRODUCER_TAG)).unwrap();
    assert_eq!(payload, json!({"id": 7}));
}

#[test]
fn decode_keeps_unknown_producer_body_verbatim() {
    let body = br#"{"data": {"id": 7}}"#;
    let payload = decode_payload(body, Some("somebody-else")).unwrap();
    assert_eq!(payload, json!({"data": {"id": 7}}));
}

#[test]
fn decode_without_app_id_is_verbatim() {
    let body = br#"{"plain": true}"#;
    let payload = decode_payload(body, None).unwrap();
    assert_eq!(payload, json!({"plain": true}));
}

#[test]
fn decode_known_producer_without_data_field_is_verbatim() {
    let body = br#"{"id": 7}"#;
    let payload = decode_payload(body, Some(PRODUCER_TAG)).unwrap();
    assert_eq!(payload, json!({"id": 7}));
}

#[test]
fn decode_rejects_malformed_body() {
    assert!(decode_payload(b"not json", Some(PRODUCER_TAG)).is_err());
}

#[test]
fn reply_success_carries_null_error() {
    let body = encode_reply(&Ok(json!({"echo": 1}))).unwrap();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed, json!({"data": {"error": null, "data": {"echo": 1}}}));

    let reply = decode_reply(&body).unwrap();
    assert!(reply.error.is_none());
    assert_eq!(reply.data, Some(json!({"echo": 1})));
}

#[test]
fn reply_rejection_omits_data() {
    let body = encode_reply(&Err(json!("boom"))).unwrap();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed, json!({"data": {"error": "boom"}}));

    let reply = decode_reply(&body).unwrap();
    assert_eq!(reply.error, Some(json!("boom")));
    assert!(reply.data.is_none());
}

#[test]
fn origin_defaults_to_unknown() {
    assert_eq!(origin_from_headers(None), "UNKNOWN");
    assert_eq!(origin_from_headers(Some(&FieldTable::default())), "UNKNOWN");
}

#[test]
fn origin_is_read_from_headers() {
    let table = build_headers(None, "orders");
    assert_eq!(origin_from_headers(Some(&table)), "orders");
}

#[test]
fn build_headers_converts_json_values() {
    let extra = json!({"attempt": 3, "urgent": true, "tag": "hot"});
    let table = build_headers(extra.as_object(), "orders");
    let inner = table.inner();

    assert_eq!(
        inner.get(&ShortString::from("attempt")),
        Some(&AMQPValue::LongLongInt(3))
    );
    assert_eq!(
        inner.get(&ShortString::from("urgent")),
        Some(&AMQPValue::Boolean(true))
    );
    assert!(matches!(
        inner.get(&ShortString::from("tag")),
        Some(AMQPValue::LongString(_))
    ));
    assert!(matches!(
        inner.get(&ShortString::from("origin")),
        Some(AMQPValue::LongString(_))
    ));
}

#[test]
fn subkey_strips_service_prefix() {
    assert_eq!(subkey("orders.created", "orders"), "created");
    assert_eq!(subkey("orders.item.added", "orders"), "item.added");
}

#[test]
fn subkey_without_prefix_is_unchanged() {
    assert_eq!(subkey("created", "orders"), "created");
    assert_eq!(subkey("billing.created", "orders"), "billing.created");
}
