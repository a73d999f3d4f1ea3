//! Provider abstraction, routing and resilience
//!
//! This module holds the per-provider schema mappers and the machinery that
//! decides where a request goes: direct forwarding with bounded retries,
//! smart balancing across the registry, and the inbound rate limit.

pub mod adapter;
pub mod call;
pub mod error;
pub mod forward;
pub mod gemini;
pub mod models;
pub mod openai;
pub mod qwen;
pub mod rate_limit;
pub mod registry;
pub mod retry;
pub mod routing;

pub use adapter::{ProviderKind, SchemaMapper, Translation};
pub use call::{ProviderCall, ProviderReply};
pub use error::{RelayError, RelayResult};
pub use forward::{ForwardOutcome, ForwardTarget, Forwarder};
pub use rate_limit::RequestRateLimiter;
pub use registry::{CostTier, HealthPolicy, HealthState, ProviderDescriptor, ProviderRegistry};
pub use retry::{RetryExecutor, RetryPolicy, RetryResult, RetryState};
pub use routing::{DispatchResult, Dispatcher, Preference};
