//! The `messenger` module is the public face of the crate: one [`Messenger`]
//! per service instance, offering four communication patterns over the
//! broker. `publish` is fire-and-forget, `broadcast` reaches every live
//! instance, `listen` serves passive and RPC traffic, `invoke` makes an RPC
//! call.

pub mod delivery;
mod invoke;
mod listener;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use lapin::{BasicProperties, Channel, options::BasicPublishOptions};
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::config::{BrokerConfig, ClientSettings, Settings};
use crate::envelope;
use crate::transport::{Transport, topology};
use crate::utils::error::Error;

pub use delivery::{Delivery, HandlerResult, MessageKind};

/// Per-message options for `publish` and `invoke`.
#[derive(Debug, Clone, Default)]
pub struct MessageOptions {
    /// Extra headers merged into the outbound header table.
    pub headers: Option<Map<String, Value>>,
    /// Per-call override of the invocation deadline. Ignored by `publish`.
    pub timeout: Option<Duration>,
}

pub(crate) type ReplyOutcome = Result<Value, Value>;
pub(crate) type PendingInvocations =
    Arc<StdMutex<HashMap<String, oneshot::Sender<ReplyOutcome>>>>;

struct ReplyMeta {
    token: String,
    queue: String,
}

/// A messaging client bound to one logical service name.
///
/// The connection is established lazily by whichever operation runs first;
/// `connect` merely forces it early. All methods take `&self` and the
/// instance is cheap to share behind an `Arc`.
pub struct Messenger {
    transport: Arc<Transport>,
    service: String,
    invoke_timeout: Duration,
    pending: PendingInvocations,
}

impl Messenger {
    pub fn new(config: BrokerConfig, service: impl Into<String>) -> Self {
        Self::with_client_settings(config, service, &ClientSettings::default())
    }

    /// Builds a messenger from loaded [`Settings`].
    pub fn from_settings(settings: &Settings, service: impl Into<String>) -> Self {
        Self::with_client_settings(
            BrokerConfig::from(&settings.broker),
            service,
            &settings.client,
        )
    }

    fn with_client_settings(
        config: BrokerConfig,
        service: impl Into<String>,
        client: &ClientSettings,
    ) -> Self {
        let service = service.into();
        Self {
            transport: Arc::new(Transport::new(config, service.clone(), client.prefetch)),
            service,
            invoke_timeout: Duration::from_secs(client.invoke_timeout_secs),
            pending: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// The logical service name this instance speaks for.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Establishes the connection, channel and topology now instead of on
    /// first use. Idempotent: calling it again on a live instance is a
    /// no-op.
    pub async fn connect(&self) -> Result<(), Error> {
        self.transport.ensure().await.map(|_| ())
    }

    /// Publishes `payload` on `key` and forgets it. The exchange is derived
    /// from the key's leading segment and asserted before sending.
    pub async fn publish(
        &self,
        key: &str,
        payload: &Value,
        options: Option<MessageOptions>,
    ) -> Result<(), Error> {
        let (channel, _) = self.transport.ensure().await?;
        self.send(&channel, key, payload, options.unwrap_or_default(), None)
            .await
    }

    /// Sends `payload` to every instance currently listening on the key's
    /// service. Instances that connect later never see it.
    pub async fn broadcast(&self, key: &str, payload: &Value) -> Result<(), Error> {
        let (channel, _) = self.transport.ensure().await?;
        let exchange = topology::assert_broadcast_exchange(&channel, exchange_of(key)).await?;
        let body = envelope::encode_payload(payload)?;
        channel
            .basic_publish(
                &exchange,
                key,
                BasicPublishOptions::default(),
                &body,
                self.base_properties(None),
            )
            .await?;
        Ok(())
    }

    /// Tears the connection down, best-effort, and rejects everything
    /// afterwards. Outstanding invocations fail with
    /// [`Error::ReplyDropped`].
    pub async fn close(&self) {
        self.transport.close().await;
        self.pending.lock().unwrap().clear();
    }

    async fn send(
        &self,
        channel: &Channel,
        key: &str,
        payload: &Value,
        options: MessageOptions,
        reply: Option<ReplyMeta>,
    ) -> Result<(), Error> {
        let exchange = exchange_of(key);
        topology::assert_exchange(channel, exchange, self.transport.exchange_kind()).await?;
        let body = envelope::encode_payload(payload)?;
        let mut properties = self.base_properties(options.headers.as_ref());
        if let Some(reply) = &reply {
            properties = properties
                .with_correlation_id(reply.token.as_str().into())
                .with_reply_to(reply.queue.as_str().into());
        }
        channel
            .basic_publish(exchange, key, BasicPublishOptions::default(), &body, properties)
            .await?;
        Ok(())
    }

    fn base_properties(&self, headers: Option<&Map<String, Value>>) -> BasicProperties {
        BasicProperties::default()
            .with_app_id(envelope::PRODUCER_TAG.into())
            .with_headers(envelope::build_headers(headers, &self.service))
            .with_timestamp(Utc::now().timestamp() as u64)
    }
}

/// Leading segment of a routing key: the service whose topology the message
/// travels through.
fn exchange_of(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}

#[cfg(test)]
mod tests;
