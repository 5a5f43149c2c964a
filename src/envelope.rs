//! The result envelope every tool invocation returns.
//!
//! Wire shape is a flat JSON object tagged by `status`:
//! `{"status": "success", ...domain fields}` or
//! `{"status": "error", "error_message": "..."}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Error;

/// Success or failure of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultEnvelope {
    Success {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    #[serde(rename = "error")]
    Failure { error_message: String },
}

impl ResultEnvelope {
    /// Success envelope from a JSON object of domain fields.
    ///
    /// A stray `status` key is dropped; a non-object value is carried under
    /// `data`.
    pub fn success(fields: Value) -> Self {
        let mut fields = match fields {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        fields.remove("status");
        ResultEnvelope::Success { fields }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ResultEnvelope::Failure {
            error_message: message.into(),
        }
    }

    /// Failure envelope for a domain error.
    ///
    /// Validation messages are shown as-is; upstream errors are prefixed with
    /// the adapter's context, e.g. `Error searching PubMed: timeout: ...`.
    pub fn from_error(context: &str, err: &Error) -> Self {
        match err {
            Error::Validation(msg) | Error::NotFound(msg) => Self::failure(msg.clone()),
            other => Self::failure(format!("{context}: {other}")),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultEnvelope::Success { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            ResultEnvelope::Success { .. } => "success",
            ResultEnvelope::Failure { .. } => "error",
        }
    }

    /// Domain field lookup; always `None` on a failure.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            ResultEnvelope::Success { fields } => fields.get(name),
            ResultEnvelope::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ResultEnvelope::Success { .. } => None,
            ResultEnvelope::Failure { error_message } => Some(error_message),
        }
    }

    /// Flat JSON form, as stored in the cache and returned to callers.
    pub fn to_value(&self) -> Value {
        let mut map = match self {
            ResultEnvelope::Success { fields } => fields.clone(),
            ResultEnvelope::Failure { error_message } => {
                let mut map = Map::new();
                map.insert(
                    "error_message".to_string(),
                    Value::String(error_message.clone()),
                );
                map
            }
        };
        map.insert("status".to_string(), Value::String(self.status().to_string()));
        Value::Object(map)
    }

    /// Parse a stored value. Anything without a recognised `status` is `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}
