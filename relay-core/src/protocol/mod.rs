//! Canonical wire types
//!
//! Every inbound request is parsed into these structures and every mapped
//! provider response is converted back into them.

pub mod types;

pub use types::{
    CanonicalRequest, CanonicalResponse, ContentBlock, Message, MessageContent, MessageRole,
    ResponseType, StopReason, Usage,
};
