//! Tool registry: the invocation boundary.
//!
//! Owns the adapters, their catalog, and the injected cache and usage stores.
//! Every invocation of a known tool is metered once, whether it was served
//! from cache, fetched, or failed. Metering runs on the blocking pool after
//! the envelope is ready and never delays or fails the lookup.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::task::TaskTracker;

use crate::cache::PersistentCache;
use crate::envelope::ResultEnvelope;
use crate::tools::adapter::{AdapterContext, Tool};
use crate::tools::catalog::ToolCatalog;
use crate::tools::clinical_trials::ClinicalTrialsSearch;
use crate::tools::fda::FdaDrugLookup;
use crate::tools::health_topics::HealthTopics;
use crate::tools::http::HttpClient;
use crate::tools::icd10::Icd10Lookup;
use crate::tools::pubmed::PubMedSearch;
use crate::types::{Config, Result, SessionId};
use crate::usage::{MonthlyUsage, OverallUsage, UsageMeter};

#[derive(Debug)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    catalog: ToolCatalog,
    ctx: AdapterContext,
    usage: Arc<UsageMeter>,
    metering: TaskTracker,
}

impl ToolRegistry {
    /// Empty registry over the given services.
    pub fn new(ctx: AdapterContext, usage: Arc<UsageMeter>) -> Self {
        Self {
            tools: HashMap::new(),
            catalog: ToolCatalog::new(),
            ctx,
            usage,
            metering: TaskTracker::new(),
        }
    }

    /// Registry with the five healthcare adapters, configured from `config`.
    pub fn with_default_tools(
        config: &Config,
        cache: Arc<PersistentCache>,
        usage: Arc<UsageMeter>,
    ) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        let ctx = AdapterContext::new(cache, http, config.cache.clone());
        let mut registry = Self::new(ctx, usage);

        let sources = &config.sources;
        registry.register(Arc::new(FdaDrugLookup::new(sources)))?;
        registry.register(Arc::new(PubMedSearch::new(sources)))?;
        registry.register(Arc::new(ClinicalTrialsSearch::new(sources)))?;
        registry.register(Arc::new(HealthTopics::new(sources)))?;
        registry.register(Arc::new(Icd10Lookup::new(sources)))?;
        Ok(registry)
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let entry = tool.entry();
        let name = entry.name.clone();
        self.catalog.register(entry)?;
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Invoke `tool_name` for `session`.
    ///
    /// Unknown tools and malformed arguments come back as failure envelopes;
    /// unknown tools are not metered. `Err` is reserved for storage failures.
    pub async fn invoke(
        &self,
        session: &SessionId,
        tool_name: &str,
        args: Value,
    ) -> Result<ResultEnvelope> {
        let Some(tool) = self.tools.get(tool_name) else {
            tracing::info!(tool = tool_name, "unknown tool requested");
            return Ok(ResultEnvelope::failure(format!("Unknown tool: {tool_name}")));
        };

        let started = Instant::now();
        let envelope = match args {
            Value::Null => self.run(tool.as_ref(), tool_name, Value::Object(Map::new())).await?,
            args @ Value::Object(_) => self.run(tool.as_ref(), tool_name, args).await?,
            _ => ResultEnvelope::failure("Arguments must be a JSON object"),
        };

        self.meter(session, tool_name);
        tracing::info!(
            tool = tool_name,
            status = envelope.status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool invoked"
        );
        Ok(envelope)
    }

    async fn run(
        &self,
        tool: &dyn Tool,
        tool_name: &str,
        mut args: Value,
    ) -> Result<ResultEnvelope> {
        self.catalog.fill_defaults(tool_name, &mut args)?;
        tool.invoke(&self.ctx, &args).await.inspect_err(|e| {
            tracing::error!(tool = tool_name, code = e.code(), "storage failure: {}", e);
        })
    }

    /// Record one call without waiting on the usage store.
    fn meter(&self, session: &SessionId, tool_name: &str) {
        let usage = Arc::clone(&self.usage);
        let session = session.as_str().to_string();
        let tool = tool_name.to_string();
        self.metering.spawn_blocking(move || usage.record(&session, &tool, 1));
    }

    /// Wait until every usage record queued so far has been written.
    pub async fn flush_usage(&self) {
        self.metering.close();
        self.metering.wait().await;
        self.metering.reopen();
    }

    /// Usage for one session in a month (defaults to the current UTC month).
    pub fn usage_for(
        &self,
        session: &SessionId,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<MonthlyUsage> {
        self.usage.monthly_usage(session.as_str(), month, year)
    }

    /// Usage across all sessions in a month.
    pub fn usage_overall(&self, month: Option<u32>, year: Option<i32>) -> Result<OverallUsage> {
        self.usage.overall_usage(month, year)
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<PersistentCache> {
        &self.ctx.cache
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.catalog.list_names()
    }
}
