use std::sync::Mutex as StdMutex;

use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::BrokerConfig;
use crate::transport::topology;
use crate::utils::error::Error;

/// Connection lifecycle. Once `Closing` is entered the transport never
/// reopens; operations fail with [`Error::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    Closing,
    Closed,
}

/// A live connection: the command channel plus this instance's private
/// broadcast inbox.
struct Link {
    connection: Connection,
    channel: Channel,
    broadcast_queue: String,
}

/// Owns the single connection/channel pair for one messenger instance.
pub struct Transport {
    config: BrokerConfig,
    service: String,
    prefetch: u16,
    state: Mutex<Option<Link>>,
    lifecycle: StdMutex<Lifecycle>,
}

impl Transport {
    pub fn new(config: BrokerConfig, service: impl Into<String>, prefetch: u16) -> Self {
        Self {
            config,
            service: service.into(),
            prefetch,
            state: Mutex::new(None),
            lifecycle: StdMutex::new(Lifecycle::Open),
        }
    }

    /// Fails with [`Error::Closed`] once teardown has begun.
    pub fn ensure_open(&self) -> Result<(), Error> {
        match *self.lifecycle.lock().unwrap() {
            Lifecycle::Open => Ok(()),
            Lifecycle::Closing | Lifecycle::Closed => Err(Error::Closed),
        }
    }

    /// The exchange kind used for primary exchanges, honouring the
    /// configured override.
    pub fn exchange_kind(&self) -> ExchangeKind {
        topology::exchange_kind(self.config.exchange_type())
    }

    /// Returns a channel to the broker plus the broadcast inbox name,
    /// connecting first if needed.
    ///
    /// The state mutex makes the lazy connect single-flight: a second caller
    /// arriving mid-connect awaits the same attempt rather than opening a
    /// competing connection. A connection the broker has since dropped is
    /// replaced on the next call.
    pub async fn ensure(&self) -> Result<(Channel, String), Error> {
        self.ensure_open()?;
        let mut state = self.state.lock().await;
        // a close() may have slipped in while we waited for the lock
        self.ensure_open()?;
        if let Some(link) = state.as_ref() {
            if link.connection.status().connected() {
                return Ok((link.channel.clone(), link.broadcast_queue.clone()));
            }
            debug!(service = %self.service, "broker connection lost, redialing");
            *state = None;
        }
        let link = self.open_link().await?;
        let handle = (link.channel.clone(), link.broadcast_queue.clone());
        *state = Some(link);
        Ok(handle)
    }

    async fn open_link(&self) -> Result<Link, Error> {
        let options = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);
        let connection = Connection::connect(&self.config.address(), options).await?;
        let channel = connection.create_channel().await?;
        channel
            .basic_qos(self.prefetch, lapin::options::BasicQosOptions::default())
            .await?;
        topology::assert_exchange(&channel, &self.service, self.exchange_kind()).await?;
        let broadcast_queue = topology::assert_broadcast(&channel, &self.service).await?;
        info!(service = %self.service, %broadcast_queue, "connected to broker");
        Ok(Link {
            connection,
            channel,
            broadcast_queue,
        })
    }

    /// Best-effort teardown: channel first, then connection, errors
    /// discarded. Safe to call without a prior connect and safe to call
    /// twice.
    pub async fn close(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap();
            if *lifecycle != Lifecycle::Open {
                return;
            }
            *lifecycle = Lifecycle::Closing;
        }
        if let Some(link) = self.state.lock().await.take() {
            if let Err(err) = link.channel.close(200, "closing").await {
                debug!(%err, "channel teardown");
            }
            if let Err(err) = link.connection.close(200, "closing").await {
                debug!(%err, "connection teardown");
            }
        }
        *self.lifecycle.lock().unwrap() = Lifecycle::Closed;
    }
}
