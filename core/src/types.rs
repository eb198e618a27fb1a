//! Request payload DTOs for the harness-mem API.
//!
//! # Design
//! One struct per write-style endpoint, serialized as the JSON body. Optional
//! fields are left out of the body when unset; list fields that the service
//! expects on every call (`tags`, `privacy_tags`) are always sent. Defaults
//! mirror the service's documented defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::ObservationIds;

/// Body of `POST /v1/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default)]
    pub include_private: bool,
    #[serde(default)]
    pub debug: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            project: None,
            limit: None,
            include_private: false,
            debug: false,
        }
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn include_private(mut self, include_private: bool) -> Self {
        self.include_private = include_private;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Body of `POST /v1/timeline`: the observations around `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineRequest {
    pub id: String,
    #[serde(default = "default_window")]
    pub before: u32,
    #[serde(default = "default_window")]
    pub after: u32,
    #[serde(default)]
    pub include_private: bool,
}

fn default_window() -> u32 {
    5
}

impl TimelineRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            before: default_window(),
            after: default_window(),
            include_private: false,
        }
    }

    pub fn window(mut self, before: u32, after: u32) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    pub fn include_private(mut self, include_private: bool) -> Self {
        self.include_private = include_private;
        self
    }
}

/// Body of `POST /v1/observations/get`.
///
/// `ids` is sent as given here; the client normalizes it before building
/// the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetObservationsRequest {
    pub ids: Vec<String>,
    #[serde(default)]
    pub include_private: bool,
    #[serde(default = "default_compact")]
    pub compact: bool,
}

fn default_compact() -> bool {
    true
}

impl GetObservationsRequest {
    pub fn new(ids: impl Into<ObservationIds>) -> Self {
        let ids = match ids.into() {
            ObservationIds::One(id) => vec![id],
            ObservationIds::Many(ids) => ids,
        };
        Self {
            ids,
            include_private: false,
            compact: default_compact(),
        }
    }

    pub fn include_private(mut self, include_private: bool) -> Self {
        self.include_private = include_private;
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }
}

/// A raw platform event, sent as `{"event": …}` to `/v1/events/record`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub privacy_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecordEventBody<'a> {
    pub event: &'a EventEnvelope,
}

/// Body of `POST /v1/checkpoints/record`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub session_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub privacy_tags: Vec<String>,
}

impl CheckpointRequest {
    pub fn new(session_id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            platform: None,
            project: None,
            session_id: session_id.into(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            privacy_tags: Vec::new(),
        }
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn privacy_tags<I, S>(mut self, privacy_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privacy_tags = privacy_tags.into_iter().map(Into::into).collect();
        self
    }
}

/// How much summary the service should produce when a session closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    #[default]
    Standard,
    Short,
    Detailed,
}

/// Body of `POST /v1/sessions/finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeSessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub session_id: String,
    #[serde(default)]
    pub summary_mode: SummaryMode,
}

impl FinalizeSessionRequest {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            platform: None,
            project: None,
            session_id: session_id.into(),
            summary_mode: SummaryMode::default(),
        }
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn summary_mode(mut self, summary_mode: SummaryMode) -> Self {
        self.summary_mode = summary_mode;
        self
    }
}

/// Body of `POST /v1/resume-pack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePackRequest {
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default)]
    pub include_private: bool,
}

impl ResumePackRequest {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            session_id: None,
            limit: None,
            include_private: false,
        }
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn include_private(mut self, include_private: bool) -> Self {
        self.include_private = include_private;
        self
    }
}

pub const DEFAULT_CONSOLIDATION_REASON: &str = "rust-sdk";

/// Body of `POST /v1/admin/consolidation/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationRequest {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Default for ConsolidationRequest {
    fn default() -> Self {
        Self {
            reason: DEFAULT_CONSOLIDATION_REASON.to_string(),
            project: None,
            session_id: None,
            limit: None,
        }
    }
}

impl ConsolidationRequest {
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Query of `GET /v1/admin/audit-log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    pub limit: u32,
    pub action: Option<String>,
    pub target_type: Option<String>,
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            action: None,
            target_type: None,
        }
    }
}

impl AuditLogQuery {
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_omits_unset_optionals() {
        let body = serde_json::to_value(SearchRequest::new("q")).unwrap();
        assert_eq!(body, json!({"query": "q", "include_private": false, "debug": false}));
    }

    #[test]
    fn timeline_defaults_to_five_each_side() {
        let body = serde_json::to_value(TimelineRequest::new("obs-1")).unwrap();
        assert_eq!(body, json!({"id": "obs-1", "before": 5, "after": 5, "include_private": false}));
    }

    #[test]
    fn checkpoint_always_sends_tag_lists() {
        let body = serde_json::to_value(CheckpointRequest::new("s", "t", "c")).unwrap();
        assert_eq!(body["tags"], json!([]));
        assert_eq!(body["privacy_tags"], json!([]));
        assert!(body.get("platform").is_none());
    }

    #[test]
    fn summary_mode_is_lowercase() {
        let body = serde_json::to_value(FinalizeSessionRequest::new("s").summary_mode(SummaryMode::Short)).unwrap();
        assert_eq!(body["summary_mode"], "short");
        let body = serde_json::to_value(FinalizeSessionRequest::new("s")).unwrap();
        assert_eq!(body["summary_mode"], "standard");
    }

    #[test]
    fn get_observations_compacts_by_default() {
        let req = GetObservationsRequest::new("obs-1");
        assert_eq!(req.ids, vec!["obs-1"]);
        assert!(req.compact);
        assert!(!req.include_private);
    }

    #[test]
    fn event_envelope_keeps_extra_fields() {
        let event: EventEnvelope = serde_json::from_value(json!({
            "event_id": "e1",
            "payload": {"content": "hello"},
            "correlation_id": "c-9"
        }))
        .unwrap();
        assert_eq!(event.extra["correlation_id"], "c-9");
        let body = serde_json::to_value(&event).unwrap();
        assert_eq!(body["correlation_id"], "c-9");
        assert!(body.get("tags").is_none());
    }

    #[test]
    fn consolidation_reason_defaults() {
        assert_eq!(ConsolidationRequest::default().reason, "rust-sdk");
        assert_eq!(AuditLogQuery::default().limit, 50);
    }
}
