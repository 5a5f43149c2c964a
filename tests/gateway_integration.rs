//! Gateway integration tests: registry → adapter → mock upstream → cache → usage.

mod common;

use common::{config_for, registry_with, start_upstream};
use futures::future::join_all;
use healthcare_gateway::tools::SourceAdapter;
use healthcare_gateway::tools::FdaDrugLookup;
use healthcare_gateway::{derive_key, PersistentCache, SessionId, ToolRegistry, UsageMeter};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_aspirin_cold_then_warm() {
    let (base, up) = start_upstream().await;
    let (registry, _cache, _usage) = registry_with(&config_for(&base));
    let session = SessionId::new();
    let args = json!({"drug_name": "aspirin", "search_type": "general"});

    let cold = registry
        .invoke(&session, "fda_drug_lookup", args.clone())
        .await
        .unwrap();
    assert_eq!(up.hits(), 1);
    assert!(cold.is_success());
    assert_eq!(cold.field("drug_name"), Some(&json!("aspirin")));
    assert_eq!(cold.field("total_results"), Some(&json!(2)));

    let warm = registry
        .invoke(&session, "fda_drug_lookup", args)
        .await
        .unwrap();
    assert_eq!(up.hits(), 1, "warm call must not reach upstream");
    assert_eq!(warm, cold);

    let sent = up.requests_to("ndc");
    assert_eq!(sent[0]["search"], "generic_name:aspirin OR brand_name:aspirin");
    assert_eq!(sent[0]["limit"], "3");
    assert!(!sent[0].contains_key("api_key"));
}

#[tokio::test]
async fn test_defaults_are_filled_before_keying() {
    let (base, up) = start_upstream().await;
    let (registry, _cache, _usage) = registry_with(&config_for(&base));
    let session = SessionId::new();

    registry
        .invoke(&session, "fda_drug_lookup", json!({"drug_name": "aspirin"}))
        .await
        .unwrap();
    registry
        .invoke(
            &session,
            "fda_drug_lookup",
            json!({"drug_name": "aspirin", "search_type": "general"}),
        )
        .await
        .unwrap();
    assert_eq!(up.hits(), 1);
}

#[tokio::test]
async fn test_api_key_is_forwarded() {
    let (base, up) = start_upstream().await;
    let mut config = config_for(&base);
    config.sources.fda_api_key = Some("secret".to_string());
    let (registry, _cache, _usage) = registry_with(&config);

    registry
        .invoke(
            &SessionId::new(),
            "fda_drug_lookup",
            json!({"drug_name": "ibuprofen", "search_type": "label"}),
        )
        .await
        .unwrap();

    let sent = up.requests_to("label");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["api_key"], "secret");
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let (base, up) = start_upstream().await;
    let (registry, cache, _usage) = registry_with(&config_for(&base));
    let session = SessionId::new();
    let args = json!({"drug_name": "aspirin"});

    up.down.store(true, std::sync::atomic::Ordering::SeqCst);
    let failed = registry
        .invoke(&session, "fda_drug_lookup", args.clone())
        .await
        .unwrap();
    assert!(!failed.is_success());
    assert!(failed
        .error_message()
        .unwrap()
        .starts_with("Error fetching drug information: transport error: HTTP 503"));
    assert!(cache.is_empty().unwrap());

    up.down.store(false, std::sync::atomic::Ordering::SeqCst);
    let ok = registry
        .invoke(&session, "fda_drug_lookup", args)
        .await
        .unwrap();
    assert!(ok.is_success());
    assert_eq!(up.hits(), 2);
    assert_eq!(cache.len().unwrap(), 1);
}

#[tokio::test]
async fn test_upstream_404_is_failure() {
    let (base, _up) = start_upstream().await;
    let (registry, cache, _usage) = registry_with(&config_for(&base));

    let env = registry
        .invoke(
            &SessionId::new(),
            "fda_drug_lookup",
            json!({"drug_name": "notadrug"}),
        )
        .await
        .unwrap();
    assert!(env.error_message().unwrap().contains("HTTP 404"));
    assert!(cache.is_empty().unwrap());
}

#[tokio::test]
async fn test_entries_expire() {
    let (base, up) = start_upstream().await;
    let mut config = config_for(&base);
    config.cache.drug_registry_ttl = Duration::from_secs(1);
    let (registry, cache, _usage) = registry_with(&config);
    let session = SessionId::new();
    let args = json!({"drug_name": "aspirin", "search_type": "general"});

    registry
        .invoke(&session, "fda_drug_lookup", args.clone())
        .await
        .unwrap();

    let adapter = FdaDrugLookup::new(&config.sources);
    let query = adapter.validate(&args).unwrap();
    let key = derive_key(adapter.namespace(), &adapter.key_args(&query));
    assert!(cache.get(key.as_str()).unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(cache.contains_row(key.as_str()).unwrap());
    assert!(cache.get(key.as_str()).unwrap().is_none());
    assert!(!cache.contains_row(key.as_str()).unwrap());

    registry
        .invoke(&session, "fda_drug_lookup", args)
        .await
        .unwrap();
    assert_eq!(up.hits(), 2);
}

#[tokio::test]
async fn test_usage_counts_hits_and_misses() {
    let (base, _up) = start_upstream().await;
    let (registry, _cache, _usage) = registry_with(&config_for(&base));
    let session = SessionId::new();
    let other = SessionId::new();

    for _ in 0..3 {
        registry
            .invoke(&session, "lookup_icd_code", json!({"code": "E11.9"}))
            .await
            .unwrap();
    }
    for _ in 0..2 {
        registry
            .invoke(&session, "health_topics", json!({"topic": "exercise"}))
            .await
            .unwrap();
    }
    registry
        .invoke(&other, "health_topics", json!({"topic": "exercise"}))
        .await
        .unwrap();
    registry
        .invoke(&session, "no_such_tool", json!({}))
        .await
        .unwrap();

    registry.flush_usage().await;
    let usage = registry.usage_for(&session, None, None).unwrap();
    assert_eq!(usage.total_calls, 5);
    assert_eq!(usage.per_tool.get("lookup_icd_code"), Some(&3));
    assert_eq!(usage.per_tool.get("health_topics"), Some(&2));
    assert_eq!(usage.per_tool.len(), 2);

    let overall = registry.usage_overall(None, None).unwrap();
    assert_eq!(overall.total_calls, 6);
    assert_eq!(overall.unique_sessions, 2);
}

#[tokio::test]
async fn test_max_results_clamped_upstream() {
    let (base, up) = start_upstream().await;
    let (registry, _cache, _usage) = registry_with(&config_for(&base));
    let session = SessionId::new();

    registry
        .invoke(
            &session,
            "pubmed_search",
            json!({"query": "asthma", "max_results": 500}),
        )
        .await
        .unwrap();
    registry
        .invoke(
            &session,
            "clinical_trials_search",
            json!({"condition": "diabetes", "max_results": -1}),
        )
        .await
        .unwrap();
    registry
        .invoke(
            &session,
            "lookup_icd_code",
            json!({"description": "diabetes", "max_results": "many"}),
        )
        .await
        .unwrap();

    assert_eq!(up.requests_to("esearch")[0]["retmax"], "100");
    assert_eq!(up.requests_to("trials")[0]["pageSize"], "10");
    assert_eq!(up.requests_to("icd10")[0]["maxList"], "10");
}

#[tokio::test]
async fn test_pubmed_search_then_summary() {
    let (base, up) = start_upstream().await;
    let (registry, _cache, _usage) = registry_with(&config_for(&base));

    let env = registry
        .invoke(
            &SessionId::new(),
            "pubmed_search",
            json!({"query": "asthma", "date_range": "5"}),
        )
        .await
        .unwrap();
    assert!(env.is_success());
    assert_eq!(env.field("total_results"), Some(&json!(1234)));
    let articles = env.field("articles").unwrap().as_array().unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0]["journal"], "The Lancet");
    assert_eq!(articles[0]["authors"], json!(["Smith J", "Lee K"]));
    assert_eq!(articles[1]["journal"], "");

    let search = &up.requests_to("esearch")[0];
    assert!(search["term"].starts_with("asthma AND "));
    assert!(search["term"].ends_with("[pdat]"));
    assert_eq!(search["retmax"], "5");
    assert_eq!(up.requests_to("esummary")[0]["id"], "111,222");
}

#[tokio::test]
async fn test_pubmed_no_ids_skips_summary() {
    let (base, up) = start_upstream().await;
    let (registry, _cache, _usage) = registry_with(&config_for(&base));

    let env = registry
        .invoke(&SessionId::new(), "pubmed_search", json!({"query": "nothing"}))
        .await
        .unwrap();
    assert!(env.is_success());
    assert_eq!(env.field("articles"), Some(&json!([])));
    assert_eq!(up.hits(), 1);
    assert!(up.requests_to("esummary").is_empty());
}

#[tokio::test]
async fn test_clinical_trials_status_filter() {
    let (base, up) = start_upstream().await;
    let (registry, _cache, _usage) = registry_with(&config_for(&base));
    let session = SessionId::new();

    let env = registry
        .invoke(
            &session,
            "clinical_trials_search",
            json!({"condition": "diabetes"}),
        )
        .await
        .unwrap();
    assert_eq!(env.field("search_status"), Some(&json!("recruiting")));
    assert_eq!(env.field("total_results"), Some(&json!(57)));
    let trial = &env.field("trials").unwrap()[0];
    assert_eq!(trial["nct_id"], "NCT0001");
    assert_eq!(trial["brief_summary"], "A study.");
    assert_eq!(trial["sponsor"], "NIDDK");

    registry
        .invoke(
            &session,
            "clinical_trials_search",
            json!({"condition": "diabetes", "status": "all"}),
        )
        .await
        .unwrap();

    let sent = up.requests_to("trials");
    assert_eq!(sent[0]["filter.overallStatus"], "RECRUITING");
    assert_eq!(sent[0]["query.cond"], "diabetes");
    assert!(!sent[1].contains_key("filter.overallStatus"));
}

#[tokio::test]
async fn test_health_topics_malformed_bodies() {
    let (base, up) = start_upstream().await;
    let (registry, cache, _usage) = registry_with(&config_for(&base));
    let session = SessionId::new();

    let env = registry
        .invoke(&session, "health_topics", json!({"topic": "broken"}))
        .await
        .unwrap();
    assert_eq!(
        env.error_message(),
        Some("Error fetching health information: malformed response: Invalid response from Health.gov API")
    );

    let env = registry
        .invoke(&session, "health_topics", json!({"topic": "garbage"}))
        .await
        .unwrap();
    assert!(env.error_message().unwrap().contains("malformed response"));
    assert!(cache.is_empty().unwrap());

    let env = registry
        .invoke(
            &session,
            "health_topics",
            json!({"topic": "exercise", "language": "es"}),
        )
        .await
        .unwrap();
    assert_eq!(env.field("language"), Some(&json!("es")));
    let topic = &env.field("topics").unwrap()[0];
    assert_eq!(topic["description"], "Physical Activity");
    assert_eq!(topic["section"], "");
    assert_eq!(up.requests_to("topics")[2]["lang"], "es");
}

#[tokio::test]
async fn test_icd10_chapters() {
    let (base, _up) = start_upstream().await;
    let (registry, _cache, _usage) = registry_with(&config_for(&base));

    let env = registry
        .invoke(
            &SessionId::new(),
            "lookup_icd_code",
            json!({"description": "type 2 diabetes", "max_results": 2}),
        )
        .await
        .unwrap();
    assert_eq!(env.field("total_results"), Some(&json!(2)));
    let first = &env.field("results").unwrap()[0];
    assert_eq!(
        first,
        &json!({
            "code": "E11.9",
            "description": "Type 2 diabetes mellitus without complications",
            "category": "E11",
            "chapter": "IV",
            "chapter_description": "Endocrine, nutritional and metabolic diseases"
        })
    );
}

#[tokio::test]
async fn test_upstream_timeout_is_failure() {
    let (base, _up) = start_upstream().await;
    let mut config = config_for(&base);
    config.http.timeout = Duration::from_millis(300);
    config.sources.health_topics_base_url = format!("{base}/slow");
    let (registry, cache, _usage) = registry_with(&config);

    let env = registry
        .invoke(&SessionId::new(), "health_topics", json!({"topic": "sleep"}))
        .await
        .unwrap();
    assert!(env
        .error_message()
        .unwrap()
        .starts_with("Error fetching health information: timeout"));
    assert!(cache.is_empty().unwrap());
}

#[tokio::test]
async fn test_concurrent_invocations() {
    let (base, up) = start_upstream().await;
    let (registry, cache, _usage) = registry_with(&config_for(&base));
    let registry = Arc::new(registry);

    let calls = (0..8).map(|_| {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .invoke(
                    &SessionId::new(),
                    "lookup_icd_code",
                    json!({"code": "E11.9"}),
                )
                .await
        })
    });
    let results = join_all(calls).await;

    let envelopes: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    assert!(envelopes.iter().all(|e| e == &envelopes[0]));
    assert!(envelopes[0].is_success());
    assert!((1..=8).contains(&up.hits()));
    assert_eq!(cache.len().unwrap(), 1);

    registry.flush_usage().await;
    let overall = registry.usage_overall(None, None).unwrap();
    assert_eq!(overall.total_calls, 8);
    assert_eq!(overall.unique_sessions, 8);
}

#[tokio::test]
async fn test_stores_survive_reopen() {
    let (base, up) = start_upstream().await;
    let dir = tempfile::TempDir::new().unwrap();
    let cache_path = dir.path().join("nested").join("cache.db");
    let usage_path = dir.path().join("usage.db");
    let config = config_for(&base);
    let session = SessionId::from_string("persistent-session".to_string()).unwrap();
    let args = json!({"topic": "nutrition"});

    {
        let registry = ToolRegistry::with_default_tools(
            &config,
            Arc::new(PersistentCache::open(&cache_path, config.cache.default_ttl).unwrap()),
            Arc::new(UsageMeter::open(&usage_path).unwrap()),
        )
        .unwrap();
        let env = registry
            .invoke(&session, "health_topics", args.clone())
            .await
            .unwrap();
        assert!(env.is_success());
        registry.flush_usage().await;
    }

    let registry = ToolRegistry::with_default_tools(
        &config,
        Arc::new(PersistentCache::open(&cache_path, config.cache.default_ttl).unwrap()),
        Arc::new(UsageMeter::open(&usage_path).unwrap()),
    )
    .unwrap();
    let env = registry
        .invoke(&session, "health_topics", args)
        .await
        .unwrap();
    assert!(env.is_success());
    assert_eq!(up.hits(), 1);
    registry.flush_usage().await;
    assert_eq!(
        registry.usage_for(&session, None, None).unwrap().total_calls,
        2
    );
}

#[tokio::test]
async fn test_usage_store_failure_keeps_lookup_working() {
    let (base, up) = start_upstream().await;
    let dir = tempfile::TempDir::new().unwrap();
    let usage_path = dir.path().join("usage.db");
    let config = config_for(&base);
    let registry = ToolRegistry::with_default_tools(
        &config,
        Arc::new(PersistentCache::open_in_memory(config.cache.default_ttl).unwrap()),
        Arc::new(UsageMeter::open(&usage_path).unwrap()),
    )
    .unwrap();

    rusqlite::Connection::open(&usage_path)
        .unwrap()
        .execute_batch("DROP TABLE usage")
        .unwrap();

    let env = registry
        .invoke(&SessionId::new(), "lookup_icd_code", json!({"code": "E11.9"}))
        .await
        .unwrap();
    assert!(env.is_success());
    assert_eq!(up.hits(), 1);

    registry.flush_usage().await;
    assert!(registry.usage_overall(None, None).is_err());
}
