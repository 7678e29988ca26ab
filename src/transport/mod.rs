//! The `transport` module owns the single broker connection and the
//! exchange/queue topology built on top of it.
//!
//! The connection is lazy: the first operation that needs a channel dials the
//! broker, installs the prefetch limit, and asserts topology. Concurrent
//! first users await one guarded connect attempt instead of racing. Teardown
//! is best-effort and terminal.

pub mod connection;
pub mod topology;

pub use connection::{Lifecycle, Transport};
