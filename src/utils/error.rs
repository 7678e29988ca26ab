//! The `error` module defines the error type shared by every messenger
//! operation.
//!
//! There is no internal retry or backoff anywhere in the crate: connection
//! and invocation failures surface here and the caller owns recovery.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The broker refused or dropped an AMQP operation.
    #[error("broker operation failed: {0}")]
    Amqp(#[from] lapin::Error),

    /// The messenger was closed; no further operations are accepted.
    #[error("messenger is closed")]
    Closed,

    /// The outbound payload could not be serialized.
    #[error("failed to encode outbound payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// An inbound body could not be parsed.
    #[error("failed to decode inbound body: {0}")]
    Decode(#[source] serde_json::Error),

    /// No reply arrived before the invocation deadline.
    #[error("no reply to `{key}` within {after:?}")]
    InvokeTimeout { key: String, after: Duration },

    /// The remote handler answered with a non-null error field.
    #[error("handler for `{key}` rejected the request: {error}")]
    Rejected {
        key: String,
        error: serde_json::Value,
    },

    /// The reply path was torn down before a reply arrived.
    #[error("reply channel closed before a reply arrived")]
    ReplyDropped,
}
