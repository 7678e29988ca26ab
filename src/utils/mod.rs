//! The `utils` module provides shared definitions used across the `hutch`
//! crate: the error type and the tracing setup helper.

pub mod error;
pub mod logging;
