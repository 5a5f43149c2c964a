//! Configuration structures.
//!
//! Configuration is built from defaults, then overridden from environment
//! variables (optionally seeded from a `.env` file).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::errors::{Error, Result};
use crate::cache::DataDomain;

/// Global gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Storage locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cache TTL policy.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Upstream base URLs and credentials.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// On-disk locations of the cache and usage tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file backing the response cache.
    pub cache_path: PathBuf,

    /// SQLite file backing the usage log.
    pub usage_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("healthcare_cache.db"),
            usage_path: PathBuf::from("usage.db"),
        }
    }
}

/// Cache TTL policy, keyed by how volatile each upstream domain is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied when a caller does not name one.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub drug_registry_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub literature_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub clinical_trials_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub health_topics_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub diagnostic_codes_ttl: Duration,

    /// Interval between background expiry sweeps.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// TTL for entries produced by an adapter in `domain`.
    pub fn ttl_for(&self, domain: DataDomain) -> Duration {
        match domain {
            DataDomain::DrugRegistry => self.drug_registry_ttl,
            DataDomain::Literature => self.literature_ttl,
            DataDomain::ClinicalTrials => self.clinical_trials_ttl,
            DataDomain::HealthTopics => self.health_topics_ttl,
            DataDomain::DiagnosticCodes => self.diagnostic_codes_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            drug_registry_ttl: DataDomain::DrugRegistry.default_ttl(),
            literature_ttl: DataDomain::Literature.default_ttl(),
            clinical_trials_ttl: DataDomain::ClinicalTrials.default_ttl(),
            health_topics_ttl: DataDomain::HealthTopics.default_ttl(),
            diagnostic_codes_ttl: DataDomain::DiagnosticCodes.default_ttl(),
            sweep_interval: Duration::from_secs(600),
        }
    }
}

/// Upstream HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout. Expiry surfaces as a failure envelope.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("healthcare-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Base URLs and optional API keys for each upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub fda_base_url: String,
    pub fda_api_key: Option<String>,
    pub pubmed_base_url: String,
    pub pubmed_api_key: Option<String>,
    pub clinical_trials_base_url: String,
    pub health_topics_base_url: String,
    pub icd10_base_url: String,
}

impl SourcesConfig {
    /// Point every adapter at the same base URL (local mocks in tests).
    pub fn all_at(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            fda_base_url: format!("{base}/fda"),
            fda_api_key: None,
            pubmed_base_url: format!("{base}/pubmed"),
            pubmed_api_key: None,
            clinical_trials_base_url: format!("{base}/trials"),
            health_topics_base_url: format!("{base}/healthfinder"),
            icd10_base_url: format!("{base}/icd10"),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            fda_base_url: "https://api.fda.gov/drug".to_string(),
            fda_api_key: None,
            pubmed_base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            pubmed_api_key: None,
            clinical_trials_base_url: "https://clinicaltrials.gov/api/v2/studies".to_string(),
            health_topics_base_url: "https://health.gov/myhealthfinder/api/v3".to_string(),
            icd10_base_url: "https://clinicaltables.nlm.nih.gov/api/icd10cm/v3/search"
                .to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and apply environment overrides to defaults.
    pub fn from_env() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!("ignoring unreadable .env file: {err}");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(path) = get("HEALTHCARE_CACHE_DB") {
            config.storage.cache_path = PathBuf::from(path);
        }
        if let Some(path) = get("HEALTHCARE_USAGE_DB") {
            config.storage.usage_path = PathBuf::from(path);
        }
        if let Some(raw) = get("HEALTHCARE_HTTP_TIMEOUT") {
            config.http.timeout = parse_duration("HEALTHCARE_HTTP_TIMEOUT", &raw)?;
        }
        if let Some(raw) = get("HEALTHCARE_CACHE_TTL") {
            config.cache.default_ttl = parse_duration("HEALTHCARE_CACHE_TTL", &raw)?;
        }
        if let Some(raw) = get("HEALTHCARE_SWEEP_INTERVAL") {
            config.cache.sweep_interval = parse_duration("HEALTHCARE_SWEEP_INTERVAL", &raw)?;
        }

        config.sources.fda_api_key = get("FDA_API_KEY");
        config.sources.pubmed_api_key = get("PUBMED_API_KEY");
        let urls = [
            ("FDA_BASE_URL", &mut config.sources.fda_base_url),
            ("PUBMED_BASE_URL", &mut config.sources.pubmed_base_url),
            (
                "CLINICAL_TRIALS_BASE_URL",
                &mut config.sources.clinical_trials_base_url,
            ),
            (
                "HEALTH_TOPICS_BASE_URL",
                &mut config.sources.health_topics_base_url,
            ),
            ("ICD10_BASE_URL", &mut config.sources.icd10_base_url),
        ];
        for (key, slot) in urls {
            if let Some(url) = get(key) {
                *slot = url;
            }
        }

        if let Some(level) = get("HEALTHCARE_LOG_LEVEL") {
            config.observability.log_level = level;
        }
        if let Some(format) = get("HEALTHCARE_LOG_FORMAT") {
            config.observability.json_logs = format.eq_ignore_ascii_case("json");
        }

        Ok(config)
    }
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(raw.trim())
        .map_err(|e| Error::config(format!("{key}: invalid duration '{raw}': {e}")))
}
