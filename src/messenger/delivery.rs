use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

/// How a message reached this instance, and what the listener owes in
/// return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Fanout copy from the broadcast inbox. Fire-and-forget.
    Broadcast,
    /// Topic message without a correlation token. Fire-and-forget.
    Notify,
    /// Topic message carrying a correlation token; the handler outcome is
    /// sent back to the caller's reply queue.
    Request,
}

/// A decoded inbound message handed to the listener callback.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Routing key with the leading `service.` segment stripped.
    pub key: String,
    /// Application payload.
    pub args: Value,
    /// Sender's service name, `"UNKNOWN"` when absent.
    pub origin: String,
    pub kind: MessageKind,
}

/// Handler outcome: `Ok` resolves an RPC caller, `Err` rejects it. Both
/// sides are arbitrary JSON; fire-and-forget paths ignore the value.
pub type HandlerResult = Result<Value, Value>;

pub(crate) type Callback = Arc<dyn Fn(Delivery) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
