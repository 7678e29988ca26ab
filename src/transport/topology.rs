//! Idempotent exchange/queue declarations. Every assertion here may run
//! repeatedly and concurrently; the broker treats re-declaration with equal
//! parameters as a no-op.

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};

use crate::utils::error::Error;

/// Maps the configured exchange-type override onto an AMQP exchange kind.
///
/// Topic is the default: the `name.*` binding below needs topic matching.
pub fn exchange_kind(name: Option<&str>) -> ExchangeKind {
    match name {
        None | Some("topic") => ExchangeKind::Topic,
        Some("direct") => ExchangeKind::Direct,
        Some("fanout") => ExchangeKind::Fanout,
        Some("headers") => ExchangeKind::Headers,
        Some(other) => ExchangeKind::Custom(other.to_string()),
    }
}

/// Declares the primary topology for a service: a durable exchange, a
/// durable queue of the same name, and a `name.*` binding between them.
pub async fn assert_exchange(
    channel: &Channel,
    name: &str,
    kind: ExchangeKind,
) -> Result<(), Error> {
    channel
        .exchange_declare(
            name,
            kind,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_declare(
            name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            name,
            name,
            &format!("{name}.*"),
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

/// Declares the durable fanout exchange `name-broadcast`.
pub async fn assert_broadcast_exchange(channel: &Channel, name: &str) -> Result<String, Error> {
    let exchange = format!("{name}-broadcast");
    channel
        .exchange_declare(
            &exchange,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(exchange)
}

/// Declares the broadcast side for this instance: the fanout exchange plus
/// an exclusive, non-durable, server-named inbox bound with a catch-all
/// pattern. The inbox dies with the connection, so broadcasts sent while
/// this instance is away are lost.
pub async fn assert_broadcast(channel: &Channel, name: &str) -> Result<String, Error> {
    let exchange = assert_broadcast_exchange(channel, name).await?;
    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                durable: false,
                exclusive: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            queue.name().as_str(),
            &exchange,
            "#",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    Ok(queue.name().as_str().to_string())
}
