//! Inbound message processing pipeline — the glue between a gateway adapter
//! and the search engines.
//!
//! Flow: inbound message → rate-limit automated senders → channel policy →
//! command dispatch → token extraction → per-token search → deliver replies.

pub mod aggregate;
pub mod error;
pub mod extract;
pub mod policy;
pub mod process;
pub mod ratelimit;

pub use {
    aggregate::{SearchAggregator, SearchOutcome},
    error::{Error, Result},
    extract::TokenExtractor,
    process::{MessagePipeline, PipelineConfig},
    ratelimit::{BotRateLimiter, RateLimitConfig, WindowLimit},
};
