//! Logging infrastructure for Showroom
//!
//! Structured usage events for analytics, written as JSONL.

pub mod usage;

pub use usage::{EventType, UsageEvent, UsageLogger};
