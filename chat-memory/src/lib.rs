//! Chat-memory adapter over `harness-mem-core`.
//!
//! # Overview
//! Maps the three verbs a chat framework expects from a memory component
//! onto the harness-mem API:
//! - `load_memory_variables` → `/v1/resume-pack`
//! - `save_context` → `/v1/checkpoints/record`
//! - `clear` → `/v1/sessions/finalize`
//!
//! plus a `Retriever` that exposes `/v1/search` as a document lookup.
//! Nothing here has behavior of its own beyond shaping payloads; errors
//! come straight from the core client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use harness_mem_core::{
    CheckpointRequest, FinalizeSessionRequest, HarnessMemClient, ResumePackRequest, Result,
    SearchRequest, SummaryMode, Transport, UreqTransport,
};

pub const MAX_TITLE_CHARS: usize = 120;
pub const MAX_CONTENT_CHARS: usize = 4000;
pub const PLATFORM: &str = "codex";
pub const TAG: &str = "langchain";
pub const DEFAULT_INPUT_TITLE: &str = "langchain-input";
const RESUME_LIMIT: u32 = 5;

/// Variables handed back to the chat framework.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryVariables {
    pub history: String,
}

/// Session-scoped chat memory backed by harness-mem.
#[derive(Debug, Clone)]
pub struct ChatMemory<T: Transport = UreqTransport> {
    client: HarnessMemClient<T>,
    pub project: String,
    pub session_id: String,
    pub include_private: bool,
}

impl<T: Transport> ChatMemory<T> {
    pub fn new(client: HarnessMemClient<T>, project: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
            session_id: session_id.into(),
            include_private: false,
        }
    }

    pub fn include_private(mut self, include_private: bool) -> Self {
        self.include_private = include_private;
        self
    }

    pub fn client(&self) -> &HarnessMemClient<T> {
        &self.client
    }

    /// Render the session's resume pack as one `title: content` line per item.
    pub fn load_memory_variables(&self) -> Result<MemoryVariables> {
        let request = ResumePackRequest::new(self.project.as_str())
            .session_id(self.session_id.as_str())
            .limit(RESUME_LIMIT)
            .include_private(self.include_private);
        let envelope = self.client.resume_pack(&request)?;
        let history = envelope
            .items()
            .iter()
            .map(render_item)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(MemoryVariables { history })
    }

    /// Record one exchange as a checkpoint. The title is the (truncated) user
    /// input and the content the (truncated) model output.
    pub fn save_context(&self, input: &str, output: &str) -> Result<()> {
        let title = if input.is_empty() { DEFAULT_INPUT_TITLE } else { input };
        let request = CheckpointRequest::new(
            self.session_id.as_str(),
            truncate_chars(title, MAX_TITLE_CHARS),
            truncate_chars(output, MAX_CONTENT_CHARS),
        )
        .platform(PLATFORM)
        .project(self.project.as_str())
        .tags([TAG]);
        self.client.record_checkpoint(&request)?;
        tracing::debug!(session_id = %self.session_id, "saved chat context");
        Ok(())
    }

    /// Finalize the session with a short summary.
    pub fn clear(&self) -> Result<()> {
        let request = FinalizeSessionRequest::new(self.session_id.as_str())
            .platform(PLATFORM)
            .project(self.project.as_str())
            .summary_mode(SummaryMode::Short);
        self.client.finalize_session(&request)?;
        Ok(())
    }
}

/// Search-backed document retriever for one project.
#[derive(Debug, Clone)]
pub struct Retriever<T: Transport = UreqTransport> {
    client: HarnessMemClient<T>,
    pub project: String,
    pub include_private: bool,
}

impl<T: Transport> Retriever<T> {
    pub fn new(client: HarnessMemClient<T>, project: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
            include_private: false,
        }
    }

    pub fn include_private(mut self, include_private: bool) -> Self {
        self.include_private = include_private;
        self
    }

    pub fn client(&self) -> &HarnessMemClient<T> {
        &self.client
    }

    pub fn invoke(&self, query: &str, limit: u32) -> Result<Vec<Value>> {
        let request = SearchRequest::new(query)
            .project(self.project.as_str())
            .limit(limit)
            .include_private(self.include_private);
        let envelope = self.client.search(&request)?;
        Ok(envelope.items().to_vec())
    }

    pub fn relevant_documents(&self, query: &str) -> Result<Vec<Value>> {
        self.invoke(query, RESUME_LIMIT)
    }
}

/// First field among `keys` holding a non-empty value, rendered as text.
/// Empty strings, zero, `false`, `null` and empty containers are skipped.
fn first_present(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| item.get(*key)).find_map(|value| match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(a) if !a.is_empty() => Some(value.to_string()),
        Value::Object(o) if !o.is_empty() => Some(value.to_string()),
        _ => None,
    })
}

fn render_item(item: &Value) -> String {
    let title = first_present(item, &["title", "type"]).unwrap_or_else(|| "memory".to_string());
    let content = first_present(item, &["content", "summary"]).unwrap_or_default();
    format!("{title}: {content}").trim().to_string()
}

/// Longest prefix of `s` with at most `max` chars.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
