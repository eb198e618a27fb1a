//! Response envelope and the typed views of its items.
//!
//! # Design
//! Every struct here names the fields the service documents and collects
//! everything else in a flattened `extra` map, so fields added by newer
//! servers survive a deserialize/serialize cycle untouched. Envelope items
//! stay raw JSON objects; `ResponseEnvelope::items_as` projects them onto a
//! typed view when the caller wants one.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// How the service reported the outcome of a call through `ok`.
///
/// Only a literal JSON `false` is a failure. A missing flag, `true`, `null`,
/// or a value of any other type all count as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OkFlag {
    Success,
    ExplicitFailure,
}

impl OkFlag {
    pub fn classify(object: &Map<String, Value>) -> Self {
        Self::of(object.get("ok"))
    }

    pub fn of(ok: Option<&Value>) -> Self {
        match ok {
            Some(Value::Bool(false)) => OkFlag::ExplicitFailure,
            _ => OkFlag::Success,
        }
    }
}

/// Which backend produced the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    Core,
    Merged,
    Other(String),
}

impl From<String> for Source {
    fn from(value: String) -> Self {
        match value.as_str() {
            "core" => Source::Core,
            "merged" => Source::Merged,
            _ => Source::Other(value),
        }
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        match source {
            Source::Core => "core".to_string(),
            Source::Merged => "merged".to_string(),
            Source::Other(other) => other,
        }
    }
}

/// Top-level object returned by every endpoint.
///
/// The documented fields are kept as the JSON the server sent, `null`
/// included, so an envelope re-serializes exactly as it arrived. Typed
/// readings go through the accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, deserialize_with = "raw", skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    #[serde(default, deserialize_with = "raw", skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, deserialize_with = "raw", skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
    #[serde(default, deserialize_with = "raw", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, deserialize_with = "raw", skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseEnvelope {
    /// `ok` when the server sent a boolean.
    pub fn ok(&self) -> Option<bool> {
        self.ok.as_ref()?.as_bool()
    }

    pub fn ok_flag(&self) -> OkFlag {
        OkFlag::of(self.ok.as_ref())
    }

    pub fn is_explicit_failure(&self) -> bool {
        self.ok_flag() == OkFlag::ExplicitFailure
    }

    /// `source` when the server sent a string.
    pub fn source(&self) -> Option<Source> {
        self.source.as_ref()?.as_str().map(|s| Source::from(s.to_string()))
    }

    /// Items in server order; empty when `items` is missing or not an array.
    pub fn items(&self) -> &[Value] {
        match &self.items {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    /// Deserialize every item into `T`, keeping server order.
    pub fn items_as<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.items()
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(Error::from))
            .collect()
    }

    /// `id` of the first item, when it is a string.
    pub fn first_id(&self) -> Option<&str> {
        self.items().first()?.get("id")?.as_str()
    }

    /// Typed view of `meta`. A `meta` that does not fit `ApiMeta` is a
    /// serialization error here and nowhere else.
    pub fn meta_as(&self) -> Result<Option<ApiMeta>> {
        match &self.meta {
            None | Some(Value::Null) => Ok(None),
            Some(meta) => serde_json::from_value(meta.clone()).map(Some).map_err(Error::from),
        }
    }

    /// `error` when the server sent a string.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref()?.as_str()
    }
}

/// Envelope metadata. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_estimate: Option<TokenEstimateMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Token accounting attached to retrieval responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenEstimateMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One stored memory record as returned by search, timeline,
/// get-observations, resume-pack and the write endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Item returned by `/v1/sessions/finalize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFinalizeItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Item returned by `/v1/admin/audit-log`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// A present `null` stays `Some(Value::Null)`; only a missing key is `None`.
fn raw<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}
