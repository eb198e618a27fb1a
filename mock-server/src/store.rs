//! In-memory state behind the mock service: observations, finalized
//! sessions, consolidation runs, and the audit trail.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

pub const PRIVATE_TAG: &str = "private";
const COMPACT_CONTENT_CHARS: usize = 120;

#[derive(Clone, Debug, Serialize)]
pub struct Observation {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub platform: String,
    pub project: String,
    pub session_id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub tags: Vec<String>,
    pub privacy_tags: Vec<String>,
}

impl Observation {
    pub fn is_private(&self) -> bool {
        self.privacy_tags.iter().any(|t| t == PRIVATE_TAG)
    }

    pub fn visible(&self, include_private: bool) -> bool {
        include_private || !self.is_private()
    }

    pub fn to_item(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_compact_item(&self) -> Value {
        let mut item = self.to_item();
        if let Some(object) = item.as_object_mut() {
            let content: String = self.content.chars().take(COMPACT_CONTENT_CHARS).collect();
            object.insert("content".to_string(), Value::String(content));
        }
        item
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub details_json: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Default)]
pub struct ConsolidationState {
    pub runs: u64,
    pub last_run_at: Option<String>,
    pub last_reason: Option<String>,
}

/// Fields shared by every write that creates an observation.
pub struct NewObservation {
    pub event_id: Option<String>,
    pub platform: Option<String>,
    pub project: Option<String>,
    pub session_id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub privacy_tags: Vec<String>,
}

#[derive(Default)]
pub struct Store {
    observations: Vec<Observation>,
    finalized: HashMap<String, Value>,
    consolidation: ConsolidationState,
    audit: Vec<AuditEntry>,
}

pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Store {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Insert an observation. A repeated `event_id` returns the stored one.
    pub fn insert(&mut self, input: NewObservation) -> Observation {
        if let Some(event_id) = input.event_id.as_deref() {
            if let Some(existing) = self
                .observations
                .iter()
                .find(|o| o.event_id.as_deref() == Some(event_id))
            {
                return existing.clone();
            }
        }
        let observation = Observation {
            id: format!("obs_{}", Uuid::new_v4().simple()),
            event_id: input.event_id,
            platform: input.platform.unwrap_or_else(|| "unknown".to_string()),
            project: input.project.unwrap_or_else(|| "default".to_string()),
            session_id: input.session_id,
            title: input.title,
            content: input.content,
            created_at: now(),
            tags: input.tags,
            privacy_tags: input.privacy_tags,
        };
        self.observations.push(observation.clone());
        observation
    }

    /// Case-insensitive term match over title and content, best match first,
    /// newest first among equal scores.
    pub fn search(&self, query: &str, project: Option<&str>, include_private: bool, limit: usize) -> Vec<Value> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(f64, usize, &Observation)> = self
            .observations
            .iter()
            .enumerate()
            .filter(|(_, o)| o.visible(include_private))
            .filter(|(_, o)| project.map_or(true, |p| o.project == p))
            .filter_map(|(idx, o)| {
                let haystack = format!("{} {}", o.title, o.content).to_lowercase();
                let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (hits > 0).then(|| (hits as f64 / terms.len() as f64, idx, o))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
        scored
            .into_iter()
            .take(limit)
            .map(|(score, _, o)| {
                let mut item = o.to_item();
                if let Some(object) = item.as_object_mut() {
                    object.insert("similarity".to_string(), json!(score));
                    object.insert("hybrid_score".to_string(), json!(score));
                }
                item
            })
            .collect()
    }

    /// The observation `id` plus up to `before`/`after` neighbours from the
    /// same session, oldest first. `None` when `id` is unknown or hidden.
    pub fn timeline(&self, id: &str, before: usize, after: usize, include_private: bool) -> Option<Vec<Value>> {
        let anchor = self.observations.iter().find(|o| o.id == id)?;
        if !anchor.visible(include_private) {
            return None;
        }
        let session: Vec<&Observation> = self
            .observations
            .iter()
            .filter(|o| o.session_id == anchor.session_id && o.visible(include_private))
            .collect();
        let pos = session.iter().position(|o| o.id == id)?;
        let start = pos.saturating_sub(before);
        let end = (pos + after + 1).min(session.len());
        Some(
            session[start..end]
                .iter()
                .map(|o| {
                    let mut item = o.to_item();
                    if let Some(object) = item.as_object_mut() {
                        object.insert("is_anchor".to_string(), json!(o.id == id));
                    }
                    item
                })
                .collect(),
        )
    }

    pub fn get_many(&self, ids: &[String], include_private: bool, compact: bool) -> Vec<Value> {
        ids.iter()
            .filter_map(|id| self.observations.iter().find(|o| &o.id == id))
            .filter(|o| o.visible(include_private))
            .map(|o| if compact { o.to_compact_item() } else { o.to_item() })
            .collect()
    }

    pub fn resume_pack(&self, project: &str, session_id: Option<&str>, include_private: bool, limit: usize) -> Vec<Value> {
        self.observations
            .iter()
            .rev()
            .filter(|o| o.project == project && o.visible(include_private))
            .filter(|o| session_id.map_or(true, |s| o.session_id == s))
            .take(limit)
            .map(Observation::to_item)
            .collect()
    }

    pub fn finalize(&mut self, session_id: &str, project: Option<&str>, summary_mode: &str) -> Value {
        let titles: Vec<&str> = self
            .observations
            .iter()
            .filter(|o| o.session_id == session_id)
            .filter(|o| project.map_or(true, |p| o.project == p))
            .map(|o| o.title.as_str())
            .collect();
        let shown = match summary_mode {
            "short" => 1,
            "detailed" => titles.len(),
            _ => 5,
        };
        let summary = if titles.is_empty() {
            "no observations recorded".to_string()
        } else {
            titles.iter().take(shown).copied().collect::<Vec<_>>().join("; ")
        };
        let item = json!({
            "session_id": session_id,
            "summary_mode": summary_mode,
            "summary": summary,
            "finalized_at": now(),
        });
        self.finalized.insert(session_id.to_string(), item.clone());
        self.audit("session.finalize", "session", session_id, json!({"summary_mode": summary_mode}));
        item
    }

    pub fn run_consolidation(&mut self, reason: &str, project: Option<&str>, session_id: Option<&str>) -> Value {
        let processed = self
            .observations
            .iter()
            .filter(|o| project.map_or(true, |p| o.project == p))
            .filter(|o| session_id.map_or(true, |s| o.session_id == s))
            .count();
        let ran_at = now();
        self.consolidation.runs += 1;
        self.consolidation.last_run_at = Some(ran_at.clone());
        self.consolidation.last_reason = Some(reason.to_string());
        let job_id = format!("job_{}", Uuid::new_v4().simple());
        self.audit(
            "admin.consolidation.run",
            "consolidation",
            &job_id,
            json!({"reason": reason, "processed": processed}),
        );
        json!({
            "job_id": job_id,
            "status": "completed",
            "reason": reason,
            "processed": processed,
            "ran_at": ran_at,
        })
    }

    pub fn consolidation_status(&self) -> Value {
        json!({
            "runs": self.consolidation.runs,
            "last_run_at": self.consolidation.last_run_at,
            "last_reason": self.consolidation.last_reason,
            "observations": self.observations.len(),
            "finalized_sessions": self.finalized.len(),
        })
    }

    pub fn audit(&mut self, action: &str, target_type: &str, target_id: &str, details: Value) {
        let id = self.audit.len() as i64 + 1;
        self.audit.push(AuditEntry {
            id,
            action: action.to_string(),
            target_type: target_type.to_string(),
            target_id: target_id.to_string(),
            details_json: details.to_string(),
            created_at: now(),
        });
    }

    /// Newest entries first.
    pub fn audit_log(&self, limit: usize, action: Option<&str>, target_type: Option<&str>) -> Vec<Value> {
        self.audit
            .iter()
            .rev()
            .filter(|e| action.map_or(true, |a| e.action == a))
            .filter(|e| target_type.map_or(true, |t| e.target_type == t))
            .take(limit)
            .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
            .collect()
    }
}

/// Best-effort text of an event payload: `content`, then `prompt`, then the
/// payload serialized as JSON.
pub fn event_content(payload: Option<&Map<String, Value>>) -> String {
    let Some(payload) = payload else {
        return String::new();
    };
    ["content", "prompt", "text"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| Value::Object(payload.clone()).to_string())
}
