//! Shared harness: a local mock of every upstream plus a registry wired to it.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use healthcare_gateway::types::SourcesConfig;
use healthcare_gateway::{Config, PersistentCache, ToolRegistry, UsageMeter};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Params = Query<HashMap<String, String>>;

/// Request log and failure switches shared with the handlers.
#[derive(Debug, Default)]
pub struct Upstream {
    hits: AtomicUsize,
    requests: Mutex<Vec<(String, HashMap<String, String>)>>,
    /// Answer every request with 503 while set.
    pub down: AtomicBool,
}

impl Upstream {
    /// Total requests served, across all routes.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Query parameters of every request to `route`, in arrival order.
    pub fn requests_to(&self, route: &str) -> Vec<HashMap<String, String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == route)
            .map(|(_, q)| q.clone())
            .collect()
    }

    fn log(&self, route: &str, params: &HashMap<String, String>) -> Option<Response> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((route.to_string(), params.clone()));
        if self.down.load(Ordering::SeqCst) {
            return Some((StatusCode::SERVICE_UNAVAILABLE, "down").into_response());
        }
        None
    }
}

async fn fda(route: &'static str, up: Arc<Upstream>, params: HashMap<String, String>) -> Response {
    if let Some(resp) = up.log(route, &params) {
        return resp;
    }
    let search = params.get("search").cloned().unwrap_or_default();
    if search.contains("notadrug") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "NOT_FOUND", "message": "No matches found!"}})),
        )
            .into_response();
    }
    Json(json!({
        "meta": {"results": {"skip": 0, "limit": 3, "total": 2}},
        "results": [
            {"generic_name": "ASPIRIN", "brand_name": "Bayer"},
            {"generic_name": "ASPIRIN", "brand_name": "Ecotrin"}
        ]
    }))
    .into_response()
}

async fn esearch(State(up): State<Arc<Upstream>>, Query(params): Params) -> Response {
    if let Some(resp) = up.log("esearch", &params) {
        return resp;
    }
    let term = params.get("term").cloned().unwrap_or_default();
    if term.contains("nothing") {
        return Json(json!({"esearchresult": {"count": "0", "idlist": []}})).into_response();
    }
    Json(json!({"esearchresult": {"count": "1234", "idlist": ["111", "222"]}})).into_response()
}

async fn esummary(State(up): State<Arc<Upstream>>, Query(params): Params) -> Response {
    if let Some(resp) = up.log("esummary", &params) {
        return resp;
    }
    Json(json!({"result": {
        "uids": ["111", "222"],
        "111": {
            "title": "Inhaled corticosteroids in asthma",
            "authors": [{"name": "Smith J"}, {"name": "Lee K"}],
            "fulljournalname": "The Lancet",
            "pubdate": "2024 Mar"
        },
        "222": {"title": "Asthma in children"}
    }}))
    .into_response()
}

async fn trials(State(up): State<Arc<Upstream>>, Query(params): Params) -> Response {
    if let Some(resp) = up.log("trials", &params) {
        return resp;
    }
    Json(json!({
        "totalCount": 57,
        "studies": [{
            "protocolSection": {
                "identificationModule": {"nctId": "NCT0001", "briefTitle": "Metformin trial"},
                "statusModule": {"overallStatus": "RECRUITING"},
                "designModule": {"phases": ["PHASE3"], "studyType": "INTERVENTIONAL"},
                "conditionsModule": {"conditions": ["Type 2 Diabetes"]},
                "descriptionModule": {"briefSummary": "A study."},
                "sponsorCollaboratorsModule": {"leadSponsor": {"name": "NIDDK"}}
            }
        }]
    }))
    .into_response()
}

async fn topics(State(up): State<Arc<Upstream>>, Query(params): Params) -> Response {
    if let Some(resp) = up.log("topics", &params) {
        return resp;
    }
    let keyword = params.get("keyword").cloned().unwrap_or_default();
    match keyword.as_str() {
        "broken" => Json(json!({"Error": "Something went wrong"})).into_response(),
        "garbage" => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => Json(json!({"Result": {
            "Total": 1,
            "Resources": {"Resource": {
                "Title": "Get Active",
                "AccessibleVersion": "https://health.gov/active",
                "LastUpdate": "1700000000",
                "Section": {"x": 1},
                "Categories": {"Category": [{"Title": "Physical Activity"}]}
            }}
        }}))
        .into_response(),
    }
}

async fn icd10(State(up): State<Arc<Upstream>>, Query(params): Params) -> Response {
    if let Some(resp) = up.log("icd10", &params) {
        return resp;
    }
    Json(json!([
        2,
        ["E11.9", "E11.65"],
        null,
        [
            ["E11.9", "Type 2 diabetes mellitus without complications"],
            ["E11.65", "Type 2 diabetes mellitus with hyperglycemia"]
        ]
    ]))
    .into_response()
}

async fn slow(State(up): State<Arc<Upstream>>, Query(params): Params) -> Response {
    let _ = up.log("slow", &params);
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({})).into_response()
}

/// Serve the mock on an ephemeral loopback port. Returns the base URL.
pub async fn start_upstream() -> (String, Arc<Upstream>) {
    let up = Arc::new(Upstream::default());

    let app = Router::new()
        .route(
            "/fda/ndc.json",
            get(|State(up): State<Arc<Upstream>>, Query(p): Params| fda("ndc", up, p)),
        )
        .route(
            "/fda/label.json",
            get(|State(up): State<Arc<Upstream>>, Query(p): Params| fda("label", up, p)),
        )
        .route(
            "/fda/event.json",
            get(|State(up): State<Arc<Upstream>>, Query(p): Params| fda("event", up, p)),
        )
        .route("/pubmed/esearch.fcgi", get(esearch))
        .route("/pubmed/esummary.fcgi", get(esummary))
        .route("/trials", get(trials))
        .route("/healthfinder/topicsearch.json", get(topics))
        .route("/icd10", get(icd10))
        .route("/slow/topicsearch.json", get(slow))
        .with_state(up.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), up)
}

/// Config pointing every adapter at `base_url`.
pub fn config_for(base_url: &str) -> Config {
    let mut config = Config {
        sources: SourcesConfig::all_at(base_url),
        ..Config::default()
    };
    config.http.timeout = Duration::from_secs(5);
    config
}

/// Registry over in-memory stores.
pub fn registry_with(config: &Config) -> (ToolRegistry, Arc<PersistentCache>, Arc<UsageMeter>) {
    let cache = Arc::new(PersistentCache::open_in_memory(config.cache.default_ttl).unwrap());
    let usage = Arc::new(UsageMeter::open_in_memory().unwrap());
    let registry = ToolRegistry::with_default_tools(config, cache.clone(), usage.clone()).unwrap();
    (registry, cache, usage)
}
