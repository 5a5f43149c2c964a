//! ICD-10-CM lookup via the NLM Clinical Tables service.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::cache::{DataDomain, KeyArg};
use crate::tools::adapter::SourceAdapter;
use crate::tools::catalog::{ParamDef, ParamType, ToolEntry};
use crate::tools::http::HttpClient;
use crate::types::{Error, Result, SourcesConfig};
use crate::validation::{clamp_max_results, optional_str};

pub const TOOL_NAME: &str = "lookup_icd_code";

const DEFAULT_MAX_RESULTS: u32 = 10;

/// An ICD-10-CM chapter: roman numeral and title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chapter {
    pub number: &'static str,
    pub description: &'static str,
}

const fn chapter(number: &'static str, description: &'static str) -> Option<Chapter> {
    Some(Chapter {
        number,
        description,
    })
}

/// Chapter for a three-character category such as `E11` or `H65`.
pub fn chapter_for(category: &str) -> Option<Chapter> {
    let category = category.to_ascii_uppercase();
    let cat = category.as_str();
    match cat.chars().next()? {
        'A' | 'B' => chapter("I", "Certain infectious and parasitic diseases"),
        'C' => chapter("II", "Neoplasms"),
        'D' if cat <= "D48" => chapter("II", "Neoplasms"),
        'D' if cat >= "D50" => chapter(
            "III",
            "Diseases of the blood and blood-forming organs and certain disorders involving the immune mechanism",
        ),
        'E' => chapter("IV", "Endocrine, nutritional and metabolic diseases"),
        'F' => chapter("V", "Mental and behavioral disorders"),
        'G' => chapter("VI", "Diseases of the nervous system"),
        'H' if cat <= "H59" => chapter("VII", "Diseases of the eye and adnexa"),
        'H' if cat >= "H60" => chapter("VIII", "Diseases of the ear and mastoid process"),
        'I' => chapter("IX", "Diseases of the circulatory system"),
        'J' => chapter("X", "Diseases of the respiratory system"),
        'K' => chapter("XI", "Diseases of the digestive system"),
        'L' => chapter("XII", "Diseases of the skin and subcutaneous tissue"),
        'M' => chapter(
            "XIII",
            "Diseases of the musculoskeletal system and connective tissue",
        ),
        'N' => chapter("XIV", "Diseases of the genitourinary system"),
        'O' => chapter("XV", "Pregnancy, childbirth and the puerperium"),
        'P' => chapter("XVI", "Certain conditions originating in the perinatal period"),
        'Q' => chapter(
            "XVII",
            "Congenital malformations, deformations and chromosomal abnormalities",
        ),
        'R' => chapter(
            "XVIII",
            "Symptoms, signs and abnormal clinical and laboratory findings, not elsewhere classified",
        ),
        'S' | 'T' => chapter(
            "XIX",
            "Injury, poisoning and certain other consequences of external causes",
        ),
        'V' | 'W' | 'X' | 'Y' => chapter("XX", "External causes of morbidity and mortality"),
        'Z' => chapter(
            "XXI",
            "Factors influencing health status and contact with health services",
        ),
        _ => None,
    }
}

/// Category part of a code: text before the dot, else the first three
/// characters.
fn category_of(code: &str) -> &str {
    match code.split_once('.') {
        Some((category, _)) => category,
        None => code.char_indices().nth(3).map_or(code, |(i, _)| &code[..i]),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeQuery {
    /// The code when given, else the description.
    pub search_term: String,
    pub max_results: u32,
}

#[derive(Debug, Clone)]
pub struct Icd10Lookup {
    base_url: String,
}

impl Icd10Lookup {
    pub fn new(sources: &SourcesConfig) -> Self {
        Self {
            base_url: sources.icd10_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for Icd10Lookup {
    type Query = CodeQuery;

    fn entry(&self) -> ToolEntry {
        ToolEntry {
            name: TOOL_NAME.to_string(),
            description: "Look up ICD-10 codes by code or description".to_string(),
            parameters: vec![
                ParamDef::optional(
                    "code",
                    ParamType::String,
                    "ICD-10 code to look up",
                    Value::Null,
                ),
                ParamDef::optional(
                    "description",
                    ParamType::String,
                    "Medical condition description to search for",
                    Value::Null,
                ),
                ParamDef::optional(
                    "max_results",
                    ParamType::Int,
                    "Maximum number of results to return",
                    json!(DEFAULT_MAX_RESULTS),
                ),
            ],
            domain: DataDomain::DiagnosticCodes,
        }
    }

    fn namespace(&self) -> &'static str {
        "icd10"
    }

    fn domain(&self) -> DataDomain {
        DataDomain::DiagnosticCodes
    }

    fn failure_context(&self) -> &'static str {
        "Error looking up ICD-10 code"
    }

    fn validate(&self, args: &Value) -> Result<CodeQuery> {
        let search_term = optional_str(args, "code")
            .or_else(|| optional_str(args, "description"))
            .ok_or_else(|| Error::validation("Either code or description must be provided"))?;
        let max_results = clamp_max_results(args.get("max_results"), DEFAULT_MAX_RESULTS);
        Ok(CodeQuery {
            search_term,
            max_results,
        })
    }

    fn key_args<'q>(&self, query: &'q CodeQuery) -> Vec<KeyArg<'q>> {
        vec![
            KeyArg::from(&query.search_term),
            KeyArg::from(query.max_results),
        ]
    }

    async fn fetch(&self, http: &HttpClient, query: &CodeQuery) -> Result<Value> {
        let params = [
            ("terms", query.search_term.clone()),
            ("maxList", query.max_results.to_string()),
            ("df", "code,name".to_string()),
        ];
        http.get_json(&self.base_url, &params).await
    }

    /// The service answers `[total, [codes], extra, [[code, name], ...]]`.
    /// Any other shape is an empty result.
    fn normalize(&self, query: &CodeQuery, raw: Value) -> Result<Value> {
        let codes = raw.get(1).and_then(Value::as_array);
        let names = raw.get(3).and_then(Value::as_array);

        let results: Vec<Value> = match (codes, names) {
            (Some(codes), Some(names)) => codes
                .iter()
                .zip(names)
                .filter_map(|(code, display)| {
                    let code = code.as_str()?;
                    let description = display
                        .get(1)
                        .and_then(Value::as_str)
                        .unwrap_or("No description");
                    Some(code_entry(code, description))
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(json!({
            "search_term": query.search_term,
            "total_results": results.len(),
            "results": results,
        }))
    }
}

fn code_entry(code: &str, description: &str) -> Value {
    let category = category_of(code);
    let mut entry = Map::new();
    entry.insert("code".into(), json!(code));
    entry.insert("description".into(), json!(description));
    entry.insert("category".into(), json!(category));
    if let Some(chapter) = chapter_for(category) {
        entry.insert("chapter".into(), json!(chapter.number));
        entry.insert("chapter_description".into(), json!(chapter.description));
    }
    Value::Object(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> Icd10Lookup {
        Icd10Lookup::new(&SourcesConfig::default())
    }

    #[test]
    fn chapter_boundaries() {
        assert_eq!(chapter_for("A09").unwrap().number, "I");
        assert_eq!(chapter_for("D48").unwrap().number, "II");
        assert_eq!(chapter_for("D49"), None);
        assert_eq!(chapter_for("D50").unwrap().number, "III");
        assert_eq!(chapter_for("h59").unwrap().number, "VII");
        assert_eq!(chapter_for("H60").unwrap().number, "VIII");
        assert_eq!(chapter_for("U07"), None);
        assert_eq!(chapter_for(""), None);
    }

    #[test]
    fn category_extraction() {
        assert_eq!(category_of("E11.9"), "E11");
        assert_eq!(category_of("J45"), "J45");
        assert_eq!(category_of("Z7689"), "Z76");
        assert_eq!(category_of("R0"), "R0");
    }

    #[test]
    fn code_takes_precedence_over_description() {
        let q = adapter()
            .validate(&json!({"code": "E11.9", "description": "diabetes"}))
            .unwrap();
        assert_eq!(q.search_term, "E11.9");
        let q = adapter().validate(&json!({"description": "diabetes"})).unwrap();
        assert_eq!(q.search_term, "diabetes");
    }

    #[test]
    fn neither_code_nor_description_is_rejected() {
        let err = adapter().validate(&json!({"max_results": 3})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: Either code or description must be provided"
        );
    }

    #[test]
    fn normalize_pairs_codes_with_names() {
        let a = adapter();
        let q = a.validate(&json!({"description": "diabetes"})).unwrap();
        let raw = json!([2, ["E11.9", "E10"], null, [["E11.9", "Type 2 diabetes"], ["E10"]]]);
        let out = a.normalize(&q, raw).unwrap();
        assert_eq!(out["total_results"], 2);
        assert_eq!(out["results"][0]["category"], "E11");
        assert_eq!(out["results"][0]["chapter"], "IV");
        assert_eq!(out["results"][1]["description"], "No description");
    }

    #[test]
    fn unexpected_shape_is_empty_success() {
        let a = adapter();
        let q = a.validate(&json!({"code": "X"})).unwrap();
        let out = a.normalize(&q, json!({"error": "?"})).unwrap();
        assert_eq!(out["total_results"], 0);
        assert_eq!(out["results"], json!([]));
    }
}
