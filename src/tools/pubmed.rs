//! PubMed literature search over NCBI E-utilities.
//!
//! One logical fetch is two requests: `esearch` for matching ids, then
//! `esummary` for their metadata when any matched.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::{json, Value};

use crate::cache::{DataDomain, KeyArg};
use crate::tools::adapter::SourceAdapter;
use crate::tools::catalog::{ParamDef, ParamType, ToolEntry};
use crate::tools::extract;
use crate::tools::http::{with_api_key, HttpClient};
use crate::types::{Result, SourcesConfig};
use crate::validation::{clamp_max_results, optional_str, required_str};

pub const TOOL_NAME: &str = "pubmed_search";

const DEFAULT_MAX_RESULTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteratureQuery {
    /// Search term sent upstream, including any publication-date filter.
    pub term: String,
    pub max_results: u32,
    pub date_range: Option<String>,
}

/// Append a `[pdat]` filter covering the last `years` years. A range that is
/// not a non-negative integer is ignored.
fn with_date_filter(query: &str, date_range: Option<&str>, current_year: i32) -> String {
    match date_range.and_then(|r| r.parse::<u16>().ok()) {
        Some(years) => {
            let min_year = current_year - i32::from(years);
            format!("{query} AND {min_year}:{current_year}[pdat]")
        }
        None => query.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct PubMedSearch {
    base_url: String,
    api_key: Option<String>,
}

impl PubMedSearch {
    pub fn new(sources: &SourcesConfig) -> Self {
        Self {
            base_url: sources.pubmed_base_url.trim_end_matches('/').to_string(),
            api_key: sources.pubmed_api_key.clone(),
        }
    }
}

#[async_trait]
impl SourceAdapter for PubMedSearch {
    type Query = LiteratureQuery;

    fn entry(&self) -> ToolEntry {
        ToolEntry {
            name: TOOL_NAME.to_string(),
            description: "Search for medical literature in PubMed database".to_string(),
            parameters: vec![
                ParamDef::required(
                    "query",
                    ParamType::String,
                    "Search query for medical literature",
                ),
                ParamDef::optional(
                    "max_results",
                    ParamType::Int,
                    "Maximum number of results to return",
                    json!(DEFAULT_MAX_RESULTS),
                ),
                ParamDef::optional(
                    "date_range",
                    ParamType::String,
                    "Limit to articles published within years (e.g. '5')",
                    json!(""),
                ),
            ],
            domain: DataDomain::Literature,
        }
    }

    fn namespace(&self) -> &'static str {
        "pubmed_search"
    }

    fn domain(&self) -> DataDomain {
        DataDomain::Literature
    }

    fn failure_context(&self) -> &'static str {
        "Error searching PubMed"
    }

    fn validate(&self, args: &Value) -> Result<LiteratureQuery> {
        let query = required_str(args, "query", "Search query is required")?;
        let max_results = clamp_max_results(args.get("max_results"), DEFAULT_MAX_RESULTS);
        let date_range = optional_str(args, "date_range");
        let term = with_date_filter(&query, date_range.as_deref(), Utc::now().year());
        Ok(LiteratureQuery {
            term,
            max_results,
            date_range,
        })
    }

    fn key_args<'q>(&self, query: &'q LiteratureQuery) -> Vec<KeyArg<'q>> {
        vec![
            KeyArg::from(&query.term),
            KeyArg::from(query.max_results),
            KeyArg::from(query.date_range.as_deref()),
        ]
    }

    async fn fetch(&self, http: &HttpClient, query: &LiteratureQuery) -> Result<Value> {
        let search_url = format!("{}/esearch.fcgi", self.base_url);
        let params = with_api_key(
            vec![
                ("db", "pubmed".to_string()),
                ("term", query.term.clone()),
                ("retmax", query.max_results.to_string()),
                ("retmode", "json".to_string()),
            ],
            self.api_key.as_deref(),
        );
        let search = http.get_json(&search_url, &params).await?;

        let ids = extract::strings(&search, "/esearchresult/idlist");
        if ids.is_empty() {
            return Ok(json!({"search": search, "summary": {}}));
        }

        let summary_url = format!("{}/esummary.fcgi", self.base_url);
        let params = with_api_key(
            vec![
                ("db", "pubmed".to_string()),
                ("id", ids.join(",")),
                ("retmode", "json".to_string()),
            ],
            self.api_key.as_deref(),
        );
        let summary = http.get_json(&summary_url, &params).await?;
        Ok(json!({"search": search, "summary": summary}))
    }

    fn normalize(&self, query: &LiteratureQuery, raw: Value) -> Result<Value> {
        let ids = extract::strings(&raw, "/search/esearchresult/idlist");
        let articles: Vec<Value> = ids
            .iter()
            .filter_map(|id| {
                let article = raw.pointer(&format!("/summary/result/{id}"))?;
                let authors: Vec<String> = extract::array(article, "/authors")
                    .iter()
                    .filter_map(|a| a.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                Some(json!({
                    "id": id,
                    "title": extract::text(article, "/title"),
                    "authors": authors,
                    "journal": extract::text(article, "/fulljournalname"),
                    "publication_date": extract::text(article, "/pubdate"),
                    "abstract_url": format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"),
                }))
            })
            .collect();

        Ok(json!({
            "query": query.term,
            "total_results": extract::count(&raw, "/search/esearchresult/count"),
            "articles": articles,
        }))
    }
}
