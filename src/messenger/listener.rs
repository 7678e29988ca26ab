//! Consumer side: one callback serves the broadcast inbox and the primary
//! topic queue. Deliveries are acknowledged on receipt, before the callback
//! runs, so a failing handler never causes broker-level redelivery.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicPublishOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel};
use tracing::{debug, error, warn};

use crate::envelope;
use crate::messenger::Messenger;
use crate::messenger::delivery::{Callback, Delivery, MessageKind};
use crate::utils::error::Error;

impl Messenger {
    /// Registers `callback` for all inbound traffic on this service: fanout
    /// copies from the broadcast inbox, passive notifications and RPC
    /// requests from the primary queue. Returns once the consumers are
    /// installed; they run until the messenger is closed or the connection
    /// drops.
    pub async fn listen<F, Fut>(&self, callback: F) -> Result<(), Error>
    where
        F: Fn(Delivery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = super::HandlerResult> + Send + 'static,
    {
        let (channel, broadcast_queue) = self.transport.ensure().await?;
        let callback: Callback = Arc::new(move |delivery| Box::pin(callback(delivery)));

        consume_broadcast(
            channel.clone(),
            broadcast_queue,
            self.service.clone(),
            callback.clone(),
        )
        .await?;
        consume_primary(channel, self.service.clone(), callback).await?;
        Ok(())
    }
}

/// Drains the exclusive broadcast inbox. Everything here is
/// fire-and-forget.
async fn consume_broadcast(
    channel: Channel,
    queue: String,
    service: String,
    callback: Callback,
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
        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(err) => {
                    warn!(%err, "broadcast consumer failed");
                    break;
                }
            };
            if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
                warn!(%err, "broadcast ack failed");
                break;
            }
            let Some(decoded) = decode(&delivery, &service, MessageKind::Broadcast) else {
                continue;
            };
            dispatch_fire_and_forget(decoded, &callback).await;
        }
        debug!(%service, "broadcast consumer stopped");
    });
    Ok(())
}

/// Drains the durable primary queue: notifications without a correlation
/// token, RPC requests with one.
async fn consume_primary(channel: Channel, service: String, callback: Callback) -> Result<(), Error> {
    let mut consumer = channel
        .basic_consume(
            &service,
            "",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    tokio::spawn(async move {
        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(err) => {
                    warn!(%err, "primary consumer failed");
                    break;
                }
            };
            if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
                warn!(%err, "primary ack failed");
                break;
            }
            let correlation = delivery
                .properties
                .correlation_id()
                .as_ref()
                .map(|token| token.as_str().to_string());
            match correlation {
                None => {
                    let Some(decoded) = decode(&delivery, &service, MessageKind::Notify) else {
                        continue;
                    };
                    dispatch_fire_and_forget(decoded, &callback).await;
                }
                Some(token) => {
                    let reply_to = delivery
                        .properties
                        .reply_to()
                        .as_ref()
                        .map(|queue| queue.as_str().to_string());
                    let Some(decoded) = decode(&delivery, &service, MessageKind::Request) else {
                        continue;
                    };
                    dispatch_request(&channel, &service, decoded, token, reply_to, &callback)
                        .await;
                }
            }
        }
        debug!(%service, "primary consumer stopped");
    });
    Ok(())
}

/// Decodes a raw delivery, or logs and drops it when the body is not JSON.
/// The delivery was already acknowledged, so dropping is final.
fn decode(
    delivery: &lapin::message::Delivery,
    service: &str,
    kind: MessageKind,
) -> Option<Delivery> {
    let app_id = delivery
        .properties
        .app_id()
        .as_ref()
        .map(|tag| tag.as_str());
    let args = match envelope::decode_payload(&delivery.data, app_id) {
        Ok(args) => args,
        Err(err) => {
            error!(%err, routing_key = %delivery.routing_key, "discarding malformed body");
            return None;
        }
    };
    let origin = envelope::origin_from_headers(delivery.properties.headers().as_ref());
    let key = envelope::subkey(delivery.routing_key.as_str(), service).to_string();
    Some(Delivery {
        key,
        args,
        origin,
        kind,
    })
}

/// Broadcast and Notify path: the callback's outcome is ignored, failures
/// are logged and go no further.
async fn dispatch_fire_and_forget(delivery: Delivery, callback: &Callback) {
    let key = delivery.key.clone();
    if let Err(err) = callback(delivery).await {
        error!(%key, error = %err, "listener callback failed");
    }
}

/// Request path: the callback's outcome travels back to the caller's reply
/// queue under the request's correlation token.
async fn dispatch_request(
    channel: &Channel,
    service: &str,
    delivery: Delivery,
    token: String,
    reply_to: Option<String>,
    callback: &Callback,
) {
    let key = delivery.key.clone();
    let outcome = callback(delivery).await;
    let Some(reply_to) = reply_to else {
        warn!(%key, "request without a reply queue, outcome dropped");
        return;
    };
    let body = match envelope::encode_reply(&outcome) {
        Ok(body) => body,
        Err(err) => {
            error!(%key, %err, "failed to encode reply");
            return;
        }
    };
    let properties = BasicProperties::default()
        .with_app_id(envelope::PRODUCER_TAG.into())
        .with_correlation_id(token.as_str().into())
        .with_headers(envelope::build_headers(None, service))
        .with_timestamp(Utc::now().timestamp() as u64);
    // replies go through the default exchange straight to the caller's queue
    if let Err(err) = channel
        .basic_publish(
            "",
            &reply_to,
            BasicPublishOptions::default(),
            &body,
            properties,
        )
        .await
    {
        warn!(%key, %err, "failed to send reply");
    }
}
