//! openFDA drug lookup.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::cache::{DataDomain, KeyArg};
use crate::tools::adapter::SourceAdapter;
use crate::tools::catalog::{ParamDef, ParamType, ToolEntry};
use crate::tools::extract;
use crate::tools::http::{with_api_key, HttpClient};
use crate::types::{Result, SourcesConfig};
use crate::validation::{one_of, optional_str, required_str};

pub const TOOL_NAME: &str = "fda_drug_lookup";

const SEARCH_TYPES: [&str; 3] = ["general", "label", "adverse_events"];
const RESULT_LIMIT: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugQuery {
    pub drug_name: String,
    pub search_type: &'static str,
}

impl DrugQuery {
    /// Endpoint file and openFDA search expression for this query.
    fn endpoint(&self) -> (&'static str, String) {
        let name = &self.drug_name;
        match self.search_type {
            "label" => (
                "label.json",
                format!("openfda.generic_name:{name} OR openfda.brand_name:{name}"),
            ),
            "adverse_events" => ("event.json", format!("patient.drug.medicinalproduct:{name}")),
            _ => ("ndc.json", format!("generic_name:{name} OR brand_name:{name}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FdaDrugLookup {
    base_url: String,
    api_key: Option<String>,
}

impl FdaDrugLookup {
    pub fn new(sources: &SourcesConfig) -> Self {
        Self {
            base_url: sources.fda_base_url.trim_end_matches('/').to_string(),
            api_key: sources.fda_api_key.clone(),
        }
    }
}

#[async_trait]
impl SourceAdapter for FdaDrugLookup {
    type Query = DrugQuery;

    fn entry(&self) -> ToolEntry {
        ToolEntry {
            name: TOOL_NAME.to_string(),
            description: "Look up drug information from the FDA database".to_string(),
            parameters: vec![
                ParamDef::required(
                    "drug_name",
                    ParamType::String,
                    "Name of the drug to search for",
                ),
                ParamDef::optional(
                    "search_type",
                    ParamType::one_of(&SEARCH_TYPES),
                    "Type of information to retrieve",
                    json!("general"),
                ),
            ],
            domain: DataDomain::DrugRegistry,
        }
    }

    fn namespace(&self) -> &'static str {
        "fda_drug"
    }

    fn domain(&self) -> DataDomain {
        DataDomain::DrugRegistry
    }

    fn failure_context(&self) -> &'static str {
        "Error fetching drug information"
    }

    fn validate(&self, args: &Value) -> Result<DrugQuery> {
        let drug_name = required_str(args, "drug_name", "Drug name is required")?;
        let search_type = one_of(
            optional_str(args, "search_type").as_deref(),
            &SEARCH_TYPES,
            "general",
        );
        Ok(DrugQuery {
            drug_name,
            search_type,
        })
    }

    fn key_args<'q>(&self, query: &'q DrugQuery) -> Vec<KeyArg<'q>> {
        vec![
            KeyArg::from(query.search_type),
            KeyArg::from(&query.drug_name),
        ]
    }

    async fn fetch(&self, http: &HttpClient, query: &DrugQuery) -> Result<Value> {
        let (file, search) = query.endpoint();
        let url = format!("{}/{}", self.base_url, file);
        let params = with_api_key(
            vec![("search", search), ("limit", RESULT_LIMIT.to_string())],
            self.api_key.as_deref(),
        );
        http.get_json(&url, &params).await
    }

    fn normalize(&self, query: &DrugQuery, raw: Value) -> Result<Value> {
        Ok(json!({
            "drug_name": query.drug_name,
            "search_type": query.search_type,
            "results": extract::array(&raw, "/results"),
            "total_results": extract::count(&raw, "/meta/results/total"),
        }))
    }
}
