//! # Hutch
//!
//! `hutch` is a service messenger for RabbitMQ. It layers four communication
//! patterns over a topic-routed broker: fire-and-forget publish, broadcast to
//! every live instance, passive listening, and synchronous-style remote
//! invocation built from asynchronous primitives via correlation matching.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `config`: Handles loading and managing broker and client configuration.
//! - `envelope`: Encodes and decodes the JSON wire format and its metadata.
//! - `transport`: Owns the broker connection, channel and topology assertions.
//! - `messenger`: The public client: publish, broadcast, listen and invoke.
//! - `utils`: Contains shared utilities, such as error handling and logging setup.

pub mod config;
pub mod envelope;
pub mod messenger;
pub mod transport;
pub mod utils;

pub use config::{BrokerConfig, ConnectionParams, Settings, load_config};
pub use messenger::{Delivery, HandlerResult, MessageKind, MessageOptions, Messenger};
pub use utils::error::Error;
