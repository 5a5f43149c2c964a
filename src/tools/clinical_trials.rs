//! ClinicalTrials.gov v2 study search.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::cache::{DataDomain, KeyArg};
use crate::tools::adapter::SourceAdapter;
use crate::tools::catalog::{ParamDef, ParamType, ToolEntry};
use crate::tools::extract;
use crate::tools::http::HttpClient;
use crate::types::{Result, SourcesConfig};
use crate::validation::{clamp_max_results, optional_str, required_str};

pub const TOOL_NAME: &str = "clinical_trials_search";

const DEFAULT_MAX_RESULTS: u32 = 10;
const DEFAULT_STATUS: &str = "recruiting";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialsQuery {
    pub condition: String,
    /// Status as requested, lower-cased.
    pub status: String,
    pub max_results: u32,
}

impl TrialsQuery {
    /// Upstream `overallStatus` filter; `None` for `all`. Unmapped values are
    /// passed through upper-cased.
    pub fn status_filter(&self) -> Option<String> {
        let mapped = match self.status.as_str() {
            "all" => return None,
            "recruiting" | "active" => "RECRUITING",
            "not_recruiting" => "ACTIVE_NOT_RECRUITING",
            "completed" => "COMPLETED",
            other => return Some(other.to_ascii_uppercase()),
        };
        Some(mapped.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ClinicalTrialsSearch {
    base_url: String,
}

impl ClinicalTrialsSearch {
    pub fn new(sources: &SourcesConfig) -> Self {
        Self {
            base_url: sources.clinical_trials_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for ClinicalTrialsSearch {
    type Query = TrialsQuery;

    fn entry(&self) -> ToolEntry {
        ToolEntry {
            name: TOOL_NAME.to_string(),
            description: "Search for clinical trials by condition, status, and other parameters"
                .to_string(),
            parameters: vec![
                ParamDef::required("condition", ParamType::String, "Medical condition or disease"),
                ParamDef::optional(
                    "status",
                    ParamType::one_of(&[
                        "recruiting",
                        "not_recruiting",
                        "completed",
                        "active",
                        "all",
                    ]),
                    "Trial status",
                    json!(DEFAULT_STATUS),
                ),
                ParamDef::optional(
                    "max_results",
                    ParamType::Int,
                    "Maximum number of results to return",
                    json!(DEFAULT_MAX_RESULTS),
                ),
            ],
            domain: DataDomain::ClinicalTrials,
        }
    }

    fn namespace(&self) -> &'static str {
        "clinical_trials"
    }

    fn domain(&self) -> DataDomain {
        DataDomain::ClinicalTrials
    }

    fn failure_context(&self) -> &'static str {
        "Error searching clinical trials"
    }

    fn validate(&self, args: &Value) -> Result<TrialsQuery> {
        let condition = required_str(args, "condition", "Condition is required")?;
        let status = optional_str(args, "status")
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());
        let max_results = clamp_max_results(args.get("max_results"), DEFAULT_MAX_RESULTS);
        Ok(TrialsQuery {
            condition,
            status,
            max_results,
        })
    }

    fn key_args<'q>(&self, query: &'q TrialsQuery) -> Vec<KeyArg<'q>> {
        vec![
            KeyArg::from(&query.condition),
            KeyArg::from(&query.status),
            KeyArg::from(query.max_results),
        ]
    }

    async fn fetch(&self, http: &HttpClient, query: &TrialsQuery) -> Result<Value> {
        let mut params = vec![
            ("query.cond", query.condition.clone()),
            ("pageSize", query.max_results.to_string()),
            ("format", "json".to_string()),
            ("countTotal", "true".to_string()),
        ];
        if let Some(status) = query.status_filter() {
            params.push(("filter.overallStatus", status));
        }
        http.get_json(&self.base_url, &params).await
    }

    fn normalize(&self, query: &TrialsQuery, raw: Value) -> Result<Value> {
        let trials: Vec<Value> = extract::array(&raw, "/studies")
            .iter()
            .map(normalize_study)
            .collect();
        Ok(json!({
            "condition": query.condition,
            "search_status": query.status,
            "total_results": extract::count(&raw, "/totalCount"),
            "trials": trials,
        }))
    }
}

fn normalize_study(study: &Value) -> Value {
    let section = study.get("protocolSection").unwrap_or(&Value::Null);
    let nct_id = extract::text(section, "/identificationModule/nctId");
    let phases = extract::strings(section, "/designModule/phases");
    let phase = if phases.is_empty() {
        "Not Specified".to_string()
    } else {
        phases.join(", ")
    };
    let locations: Vec<Value> = extract::array(section, "/contactsLocationsModule/locations")
        .iter()
        .map(|loc| {
            json!({
                "facility": extract::text(loc, "/facility/name"),
                "city": extract::text(loc, "/city"),
                "state": extract::text(loc, "/state"),
                "country": extract::text(loc, "/country"),
            })
        })
        .collect();

    let mut trial = Map::new();
    trial.insert("nct_id".into(), json!(nct_id));
    trial.insert(
        "title".into(),
        json!(extract::text(section, "/identificationModule/briefTitle")),
    );
    trial.insert(
        "status".into(),
        json!(extract::text(section, "/statusModule/overallStatus")),
    );
    trial.insert("phase".into(), json!(phase));
    trial.insert(
        "study_type".into(),
        json!(extract::text(section, "/designModule/studyType")),
    );
    trial.insert(
        "conditions".into(),
        json!(extract::strings(section, "/conditionsModule/conditions")),
    );
    trial.insert("locations".into(), json!(locations));
    trial.insert(
        "sponsor".into(),
        json!(extract::text(section, "/sponsorCollaboratorsModule/leadSponsor/name")),
    );
    trial.insert(
        "url".into(),
        json!(format!("https://clinicaltrials.gov/study/{nct_id}")),
    );

    if section.pointer("/descriptionModule/briefSummary").is_some() {
        trial.insert(
            "brief_summary".into(),
            json!(extract::text(section, "/descriptionModule/briefSummary")),
        );
    }
    if let Some(eligibility) = section.get("eligibilityModule").filter(|m| !m.is_null()) {
        trial.insert(
            "eligibility".into(),
            json!({
                "gender": extract::text(eligibility, "/sex"),
                "min_age": extract::text(eligibility, "/minimumAge"),
                "max_age": extract::text(eligibility, "/maximumAge"),
                "healthy_volunteers": extract::text(eligibility, "/healthyVolunteers"),
            }),
        );
    }

    Value::Object(trial)
}
