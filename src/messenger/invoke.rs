//! RPC client side: a fresh exclusive reply queue and a UUID correlation
//! token per call, resolved through a map of pending invocations.

use futures_util::StreamExt;
use lapin::Channel;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, QueueDeclareOptions, QueueDeleteOptions,
};
use lapin::types::FieldTable;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::envelope::{self, ReplyBody};
use crate::messenger::{Messenger, MessageOptions, PendingInvocations, ReplyMeta, ReplyOutcome};
use crate::utils::error::Error;

impl Messenger {
    /// Sends a request on `key` and waits for the single correlated reply.
    ///
    /// Resolves with the responder's payload, or fails with
    /// [`Error::Rejected`] when the responder's handler errored, or with
    /// [`Error::InvokeTimeout`] when no reply arrives before the deadline
    /// (the default from settings, or `options.timeout`). On expiry the
    /// ephemeral reply queue is deleted and a late reply is discarded.
    pub async fn invoke(
        &self,
        key: &str,
        payload: &Value,
        options: Option<MessageOptions>,
    ) -> Result<Value, Error> {
        let options = options.unwrap_or_default();
        let deadline = options.timeout.unwrap_or(self.invoke_timeout);
        let (channel, _) = self.transport.ensure().await?;

        let token = Uuid::new_v4().simple().to_string();
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().unwrap().insert(token.clone(), sender);

        let reply_queue = match self.open_reply_path(&channel, key, payload, options, &token).await
        {
            Ok(queue) => queue,
            Err(err) => {
                self.pending.lock().unwrap().remove(&token);
                return Err(err);
            }
        };

        match tokio::time::timeout(deadline, receiver).await {
            Err(_) => {
                self.pending.lock().unwrap().remove(&token);
                let _ = channel
                    .queue_delete(&reply_queue, QueueDeleteOptions::default())
                    .await;
                Err(Error::InvokeTimeout {
                    key: key.to_string(),
                    after: deadline,
                })
            }
            Ok(Err(_)) => Err(Error::ReplyDropped),
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(error))) => Err(Error::Rejected {
                key: key.to_string(),
                error,
            }),
        }
    }

    /// Declares the ephemeral reply queue, installs its consumer, and sends
    /// the request. The consumer must be live before the request goes out,
    /// or a fast responder could reply into an unwatched queue.
    async fn open_reply_path(
        &self,
        channel: &Channel,
        key: &str,
        payload: &Value,
        options: MessageOptions,
        token: &str,
    ) -> Result<String, Error> {
        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    durable: false,
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        let reply_queue = queue.name().as_str().to_string();

        consume_reply(channel.clone(), reply_queue.clone(), self.pending.clone()).await?;
        self.send(
            channel,
            key,
            payload,
            options,
            Some(ReplyMeta {
                token: token.to_string(),
                queue: reply_queue.clone(),
            }),
        )
        .await?;
        Ok(reply_queue)
    }
}

/// Consumes the single reply off an ephemeral queue: ack, delete the queue,
/// resolve the matching pending invocation. A reply whose token matches no
/// pending entry is discarded; with an exclusive queue per call that only
/// happens after a timeout already gave up on it.
async fn consume_reply(
    channel: Channel,
    queue: String,
    pending: PendingInvocations,
) -> Result<(), Error> {
    let mut consumer = channel
        .basic_consume(
            &queue,
            "",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    tokio::spawn(async move {
        let Some(delivery) = consumer.next().await else {
            return;
        };
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(err) => {
                warn!(%err, "reply consumer failed");
                return;
            }
        };
        if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
            warn!(%err, "reply ack failed");
        }
        let _ = channel
            .queue_delete(&queue, QueueDeleteOptions::default())
            .await;

        let Some(token) = delivery
            .properties
            .correlation_id()
            .as_ref()
            .map(|token| token.as_str().to_string())
        else {
            warn!("reply without a correlation token discarded");
            return;
        };
        let Some(sender) = pending.lock().unwrap().remove(&token) else {
            debug!(%token, "reply for unknown correlation token discarded");
            return;
        };
        let _ = sender.send(reply_outcome(envelope::decode_reply(&delivery.data)));
    });
    Ok(())
}

/// Maps a decoded reply onto the caller-facing outcome. A non-null `error`
/// field rejects; a body that fails to parse rejects with the parse error's
/// text.
pub(crate) fn reply_outcome(reply: Result<ReplyBody, Error>) -> ReplyOutcome {
    match reply {
        Ok(ReplyBody {
            error: Some(error), ..
        }) => Err(error),
        Ok(ReplyBody { data, .. }) => Ok(data.unwrap_or(Value::Null)),
        Err(err) => Err(Value::String(err.to_string())),
    }
}
