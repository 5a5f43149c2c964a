//! # Healthcare Gateway - cached, metered access to public health APIs
//!
//! Exposes a fixed set of lookup tools over openFDA, PubMed, ClinicalTrials.gov,
//! MyHealthfinder and the ICD-10-CM tables. Every tool call:
//! - is answered from a durable TTL cache when a fresh success is stored
//! - otherwise makes one logical upstream fetch and caches only successes
//! - returns a flat `ResultEnvelope` instead of raising on domain failures
//! - is appended to an anonymous per-session usage log
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────────────────────┐
//!   invoke(tool) ───► │            ToolRegistry              │
//!                     │  catalog ─► SourceAdapter (x5)       │
//!                     │              │ cached_fetch          │
//!                     │   ┌──────────┴──────┐   ┌──────────┐ │
//!                     │   │ PersistentCache │   │UsageMeter│ │
//!                     │   │  (SQLite, TTL)  │   │ (SQLite) │ │
//!                     │   └─────────────────┘   └──────────┘ │
//!                     └──────────────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod cache;
pub mod envelope;
pub mod stdio;
pub mod tools;
pub mod types;
pub mod usage;
pub mod validation;

// Internal utilities
pub mod observability;

pub use cache::{derive_key, CacheKey, DataDomain, KeyArg, PersistentCache};
pub use envelope::ResultEnvelope;
pub use tools::ToolRegistry;
pub use types::{Config, Error, Result, SessionId};
pub use usage::{MonthlyUsage, OverallUsage, UsageMeter};
