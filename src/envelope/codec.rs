use lapin::types::{AMQPValue, FieldTable, ShortString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::utils::error::Error;

/// Producer identity stamped on every outbound message as the AMQP `app_id`.
pub const PRODUCER_TAG: &str = "hutch-messenger";

/// Producers whose bodies follow the `{"data": ...}` wrapping and may be
/// unwrapped one extra level on receipt. Covers this crate and the legacy
/// messenger it interoperates with.
const KNOWN_PRODUCERS: [&str; 2] = [PRODUCER_TAG, "service-messenger"];

#[derive(Serialize)]
struct Outbound<'a> {
    data: &'a Value,
}

/// Reply body carried inside the outer `data` wrapper of an RPC reply.
///
/// A non-null `error` is a rejection; `data` is omitted in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyBody {
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Wraps an application payload for the wire.
pub fn encode_payload(payload: &Value) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(&Outbound { data: payload }).map_err(Error::Encode)
}

/// Serializes a handler outcome as a reply body.
pub fn encode_reply(outcome: &Result<Value, Value>) -> Result<Vec<u8>, Error> {
    let body = match outcome {
        Ok(data) => ReplyBody {
            error: None,
            data: Some(data.clone()),
        },
        Err(error) => ReplyBody {
            error: Some(error.clone()),
            data: None,
        },
    };
    serde_json::to_vec(&json!({ "data": body })).map_err(Error::Encode)
}

/// Parses an inbound body into the application payload.
///
/// Bodies from a recognized producer that carry a nested `data` field are
/// unwrapped one level; anything else is handed over as parsed. Peers outside
/// the allow-list may publish bare payloads onto our exchanges, so their
/// bodies are never unwrapped.
pub fn decode_payload(body: &[u8], app_id: Option<&str>) -> Result<Value, Error> {
    let mut parsed: Value = serde_json::from_slice(body).map_err(Error::Decode)?;
    let known = app_id.is_some_and(|id| KNOWN_PRODUCERS.contains(&id));
    if known {
        if let Some(inner) = parsed.get_mut("data") {
            return Ok(inner.take());
        }
    }
    Ok(parsed)
}

/// Parses an RPC reply body.
pub fn decode_reply(body: &[u8]) -> Result<ReplyBody, Error> {
    let parsed: Value = serde_json::from_slice(body).map_err(Error::Decode)?;
    let inner = parsed.get("data").cloned().unwrap_or(Value::Null);
    serde_json::from_value(inner).map_err(Error::Decode)
}

/// Extracts the sender's service name from the message headers.
pub fn origin_from_headers(headers: Option<&FieldTable>) -> String {
    headers
        .and_then(|table| table.inner().get(&ShortString::from("origin")))
        .and_then(|value| match value {
            AMQPValue::LongString(s) => Some(s.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

/// Strips the leading `service.` segment from a routing key.
///
/// Keys that do not carry the prefix are handed through unchanged.
pub fn subkey<'a>(routing_key: &'a str, service: &str) -> &'a str {
    routing_key
        .strip_prefix(service)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(routing_key)
}

/// Builds the header table for an outbound message: caller-supplied entries
/// first, then the mandatory `origin` header naming this service.
pub fn build_headers(extra: Option<&Map<String, Value>>, origin: &str) -> FieldTable {
    let mut table = FieldTable::default();
    if let Some(extra) = extra {
        for (key, value) in extra {
            table.insert(key.as_str().into(), amqp_value(value));
        }
    }
    table.insert("origin".into(), AMQPValue::LongString(origin.into()));
    table
}

fn amqp_value(value: &Value) -> AMQPValue {
    match value {
        Value::Null => AMQPValue::Void,
        Value::Bool(b) => AMQPValue::Boolean(*b),
        Value::Number(n) if n.is_i64() => AMQPValue::LongLongInt(n.as_i64().unwrap_or_default()),
        Value::Number(n) => AMQPValue::Double(n.as_f64().unwrap_or_default()),
        Value::String(s) => AMQPValue::LongString(s.as_str().into()),
        // arrays and objects travel as their JSON text
        other => AMQPValue::LongString(other.to_string().into()),
    }
}
