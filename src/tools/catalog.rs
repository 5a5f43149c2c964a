//! Tool catalog: typed metadata, default filling, listing.
//!
//! Owns tool *metadata* (not implementations). Each adapter describes its own
//! parameters; the registry collects the entries here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::cache::DataDomain;
use crate::types::{Error, Result};

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Enum(Vec<String>),
}

impl ParamType {
    pub fn one_of(variants: &[&str]) -> Self {
        ParamType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }

    /// Human-readable type name for listings.
    pub fn display_name(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Int => "integer".to_string(),
            ParamType::Enum(variants) => format!("enum({})", variants.join("|")),
        }
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str, default: Value) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: false,
            default: if default.is_null() { None } else { Some(default) },
        }
    }
}

// =============================================================================
// Tool entry
// =============================================================================

/// Complete tool metadata entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamDef>,
    pub domain: DataDomain,
}

impl ToolEntry {
    /// One-line summary.
    ///
    /// Format: `- tool(param1: type, param2?: type): description`
    pub fn to_listing_line(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let optional = if p.required { "" } else { "?" };
                format!("{}{}: {}", p.name, optional, p.param_type.display_name())
            })
            .collect();

        format!("- {}({}): {}", self.name, params.join(", "), self.description)
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// In-memory tool catalog. Owns metadata, not implementations.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    entries: HashMap<String, ToolEntry>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a tool entry. Names are unique.
    pub fn register(&mut self, entry: ToolEntry) -> Result<()> {
        if entry.name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if self.entries.contains_key(&entry.name) {
            return Err(Error::validation(format!(
                "Tool already registered: {}",
                entry.name
            )));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    /// List all tool names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all tool entries, sorted by name.
    pub fn list_entries(&self) -> Vec<&ToolEntry> {
        let mut entries: Vec<&ToolEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Fill in default values for missing optional parameters.
    ///
    /// An explicit JSON `null` counts as missing.
    pub fn fill_defaults(&self, name: &str, args: &mut Value) -> Result<()> {
        let entry = self
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;

        if let Some(map) = args.as_object_mut() {
            for param in &entry.parameters {
                let missing = map.get(&param.name).map_or(true, Value::is_null);
                if missing {
                    if let Some(default) = &param.default {
                        map.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Formatted listing of every tool, or an empty string when none exist.
    pub fn render_listing(&self) -> String {
        let entries = self.list_entries();
        if entries.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(entries.len() + 1);
        lines.push("Available tools:".to_string());
        for entry in entries {
            lines.push(entry.to_listing_line());
        }
        lines.join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
