//! Upstream data domains and their cache lifetimes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;

/// Which kind of upstream data an adapter serves.
///
/// TTLs track how often the source data changes, not how often it is asked
/// for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDomain {
    /// Drug registry, label and adverse-event lookups.
    DrugRegistry,
    /// Biomedical literature search.
    Literature,
    /// Clinical trial registry search.
    ClinicalTrials,
    /// Consumer health topics (editorial content).
    HealthTopics,
    /// Diagnostic code sets, revised annually.
    DiagnosticCodes,
}

impl DataDomain {
    pub const ALL: [DataDomain; 5] = [
        DataDomain::DrugRegistry,
        DataDomain::Literature,
        DataDomain::ClinicalTrials,
        DataDomain::HealthTopics,
        DataDomain::DiagnosticCodes,
    ];

    /// Built-in TTL before any configuration override.
    pub fn default_ttl(self) -> Duration {
        let secs = match self {
            DataDomain::DrugRegistry => DAY,
            DataDomain::Literature => 12 * HOUR,
            DataDomain::ClinicalTrials => DAY,
            DataDomain::HealthTopics => 7 * DAY,
            DataDomain::DiagnosticCodes => 30 * DAY,
        };
        Duration::from_secs(secs)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataDomain::DrugRegistry => "drug_registry",
            DataDomain::Literature => "literature",
            DataDomain::ClinicalTrials => "clinical_trials",
            DataDomain::HealthTopics => "health_topics",
            DataDomain::DiagnosticCodes => "diagnostic_codes",
        }
    }
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
