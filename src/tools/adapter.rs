//! The adapter contract and the one cached-fetch routine every adapter runs
//! through.
//!
//! Per invocation:
//!
//! ```text
//! Validating ─┬─► CacheHit ──────────────────────────────► Returning
//!             └─► CacheMiss ─► Fetching ─┬─► FetchFailed ─► Returning
//!                                        └─► Normalizing ─► Storing ─► Returning
//! ```
//!
//! There is no retry loop. Only a fully normalized success is written to the
//! cache, so a dropped (cancelled) future or an upstream failure leaves the
//! cache untouched. Concurrent misses on one key may both fetch; the upsert
//! makes the last writer win.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{derive_key, DataDomain, KeyArg, PersistentCache};
use crate::envelope::ResultEnvelope;
use crate::tools::catalog::ToolEntry;
use crate::tools::http::HttpClient;
use crate::types::{CacheConfig, Result};

/// Shared services an adapter runs against.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub cache: Arc<PersistentCache>,
    pub http: HttpClient,
    pub ttls: CacheConfig,
}

impl AdapterContext {
    pub fn new(cache: Arc<PersistentCache>, http: HttpClient, ttls: CacheConfig) -> Self {
        Self { cache, http, ttls }
    }

    pub fn ttl_for(&self, domain: DataDomain) -> Duration {
        self.ttls.ttl_for(domain)
    }
}

/// One upstream healthcare API.
///
/// Implementations hold only immutable configuration (base URL, API key).
/// `fetch` may issue at most two sequential requests for one logical query.
#[async_trait]
pub trait SourceAdapter: Send + Sync + Debug {
    /// Normalized, validated arguments.
    type Query: Send + Sync;

    /// Metadata, including the public tool name.
    fn entry(&self) -> ToolEntry;

    /// Cache-key namespace; distinct per adapter.
    fn namespace(&self) -> &'static str;

    fn domain(&self) -> DataDomain;

    /// Prefix for upstream failure messages.
    fn failure_context(&self) -> &'static str;

    /// Check required fields and coerce the rest to their defaults.
    fn validate(&self, args: &Value) -> Result<Self::Query>;

    /// Ordered arguments that identify a query for caching.
    fn key_args<'q>(&self, query: &'q Self::Query) -> Vec<KeyArg<'q>>;

    async fn fetch(&self, http: &HttpClient, query: &Self::Query) -> Result<Value>;

    /// Map the raw upstream body to domain fields. Missing fields default;
    /// only an unusable body is an error.
    fn normalize(&self, query: &Self::Query, raw: Value) -> Result<Value>;
}

/// Run the validate → cache → fetch → normalize → store sequence.
///
/// Domain failures come back as `Ok(Failure)`. `Err` means the cache itself
/// failed and must not be mistaken for a miss.
pub async fn cached_fetch<A>(
    ctx: &AdapterContext,
    adapter: &A,
    args: &Value,
) -> Result<ResultEnvelope>
where
    A: SourceAdapter + ?Sized,
{
    let context = adapter.failure_context();
    let query = match adapter.validate(args) {
        Ok(query) => query,
        Err(e) => return Ok(ResultEnvelope::from_error(context, &e)),
    };

    let key = derive_key(adapter.namespace(), &adapter.key_args(&query));

    if let Some(stored) = ctx.cache.get(key.as_str())? {
        match ResultEnvelope::from_value(stored) {
            Some(envelope) if envelope.is_success() => {
                tracing::debug!(namespace = adapter.namespace(), key = %key.short(), "cache hit");
                return Ok(envelope);
            }
            _ => {
                tracing::warn!(
                    namespace = adapter.namespace(),
                    key = %key.short(),
                    "ignoring non-success cache entry"
                );
            }
        }
    }
    tracing::debug!(namespace = adapter.namespace(), key = %key.short(), "cache miss");

    let raw = match adapter.fetch(&ctx.http, &query).await {
        Ok(raw) => raw,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!(namespace = adapter.namespace(), "upstream fetch failed: {}", e);
            return Ok(ResultEnvelope::from_error(context, &e));
        }
    };

    let envelope = match adapter.normalize(&query, raw) {
        Ok(fields) => ResultEnvelope::success(fields),
        Err(e) => {
            tracing::warn!(namespace = adapter.namespace(), "unusable upstream response: {}", e);
            return Ok(ResultEnvelope::from_error(context, &e));
        }
    };

    ctx.cache.set(
        key.as_str(),
        &envelope.to_value(),
        Some(ctx.ttl_for(adapter.domain())),
    )?;
    Ok(envelope)
}

/// Object-safe face of an adapter, as held by the registry.
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    fn entry(&self) -> ToolEntry;

    async fn invoke(&self, ctx: &AdapterContext, args: &Value) -> Result<ResultEnvelope>;
}

#[async_trait]
impl<A> Tool for A
where
    A: SourceAdapter,
{
    fn entry(&self) -> ToolEntry {
        SourceAdapter::entry(self)
    }

    async fn invoke(&self, ctx: &AdapterContext, args: &Value) -> Result<ResultEnvelope> {
        cached_fetch(ctx, self, args).await
    }
}
