//! Core types for the healthcare gateway.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Anonymous session identifiers for usage metering
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Storage, TTL, HTTP, upstream and observability settings

mod config;
mod errors;
mod ids;

pub use config::{
    CacheConfig, Config, HttpConfig, ObservabilityConfig, SourcesConfig, StorageConfig,
};
pub use errors::{Error, Result};
pub use ids::SessionId;
