//! The `envelope` module defines the wire format shared by every message the
//! messenger sends or receives.
//!
//! A message body is UTF-8 JSON wrapping the application payload as
//! `{"data": <payload>}`; RPC replies nest a second level,
//! `{"data": {"error": <err-or-null>, "data": <payload>}}`. Protocol metadata
//! (producer tag, correlation token, reply queue, `origin` header) rides in
//! AMQP properties rather than in the body.

pub mod codec;

pub use codec::{
    PRODUCER_TAG, ReplyBody, build_headers, decode_payload, decode_reply, encode_payload,
    encode_reply, origin_from_headers, subkey,
};

#[cfg(test)]
mod tests;
