//! Tool infrastructure: catalog, adapter contract, upstream adapters, registry.
//!
//! Each upstream API is a `SourceAdapter`. The registry holds them behind the
//! object-safe `Tool` face and runs every call through one cached-fetch
//! sequence.

pub mod adapter;
pub mod catalog;
pub mod clinical_trials;
pub mod extract;
pub mod fda;
pub mod health_topics;
pub mod http;
pub mod icd10;
pub mod pubmed;
pub mod registry;

pub use adapter::{cached_fetch, AdapterContext, SourceAdapter, Tool};
pub use catalog::{ParamDef, ParamType, ToolCatalog, ToolEntry};
pub use clinical_trials::ClinicalTrialsSearch;
pub use fda::FdaDrugLookup;
pub use health_topics::HealthTopics;
pub use http::HttpClient;
pub use icd10::Icd10Lookup;
pub use pubmed::PubMedSearch;
pub use registry::ToolRegistry;
