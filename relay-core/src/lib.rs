//! Relay Core Library
//!
//! This crate provides the provider-agnostic core of the relay: canonical
//! request types, per-provider schema mapping, model resolution, the provider
//! registry, retrying forwarder, balancing dispatcher and configuration.

pub mod config;
pub mod http;
pub mod protocol;
pub mod providers;

pub use providers::error::{RelayError, RelayResult};

/// Returns the version of the Relay Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
