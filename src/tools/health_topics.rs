//! MyHealthfinder topic search.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::cache::{DataDomain, KeyArg};
use crate::tools::adapter::SourceAdapter;
use crate::tools::catalog::{ParamDef, ParamType, ToolEntry};
use crate::tools::extract;
use crate::tools::http::HttpClient;
use crate::types::{Error, Result, SourcesConfig};
use crate::validation::{one_of, optional_str, required_str};

pub const TOOL_NAME: &str = "health_topics";

const LANGUAGES: [&str; 2] = ["en", "es"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicQuery {
    pub topic: String,
    pub language: &'static str,
}

#[derive(Debug, Clone)]
pub struct HealthTopics {
    base_url: String,
}

impl HealthTopics {
    pub fn new(sources: &SourcesConfig) -> Self {
        Self {
            base_url: sources.health_topics_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for HealthTopics {
    type Query = TopicQuery;

    fn entry(&self) -> ToolEntry {
        ToolEntry {
            name: TOOL_NAME.to_string(),
            description: "Get evidence-based health information on various topics".to_string(),
            parameters: vec![
                ParamDef::required("topic", ParamType::String, "Health topic to search for"),
                ParamDef::optional(
                    "language",
                    ParamType::one_of(&LANGUAGES),
                    "Language for content",
                    json!("en"),
                ),
            ],
            domain: DataDomain::HealthTopics,
        }
    }

    fn namespace(&self) -> &'static str {
        "health_topics"
    }

    fn domain(&self) -> DataDomain {
        DataDomain::HealthTopics
    }

    fn failure_context(&self) -> &'static str {
        "Error fetching health information"
    }

    fn validate(&self, args: &Value) -> Result<TopicQuery> {
        let topic = required_str(args, "topic", "Topic is required")?;
        let language = one_of(optional_str(args, "language").as_deref(), &LANGUAGES, "en");
        Ok(TopicQuery { topic, language })
    }

    fn key_args<'q>(&self, query: &'q TopicQuery) -> Vec<KeyArg<'q>> {
        vec![KeyArg::from(&query.topic), KeyArg::from(query.language)]
    }

    async fn fetch(&self, http: &HttpClient, query: &TopicQuery) -> Result<Value> {
        let url = format!("{}/topicsearch.json", self.base_url);
        let params = [
            ("keyword", query.topic.clone()),
            ("lang", query.language.to_string()),
        ];
        http.get_json(&url, &params).await
    }

    fn normalize(&self, query: &TopicQuery, raw: Value) -> Result<Value> {
        let result = raw
            .get("Result")
            .filter(|r| !r.is_null())
            .ok_or_else(|| Error::malformed("Invalid response from Health.gov API"))?;

        let resources = result.pointer("/Resources/Resource");
        let topics: Vec<Value> = extract::one_or_many(resources)
            .into_iter()
            .filter(|r| r.is_object())
            .map(|resource| {
                let categories = resource.pointer("/Categories/Category");
                let description = extract::one_or_many(categories)
                    .first()
                    .map(|c| extract::text(c, "/Title"))
                    .unwrap_or_default();
                json!({
                    "title": extract::text(resource, "/Title"),
                    "url": extract::text(resource, "/AccessibleVersion"),
                    "last_updated": extract::text(resource, "/LastUpdate"),
                    "section": extract::text(resource, "/Section"),
                    "description": description,
                })
            })
            .collect();

        Ok(json!({
            "search_term": query.topic,
            "language": query.language,
            "total_results": extract::count(result, "/Total"),
            "topics": topics,
        }))
    }
}
