//! Typed operation surface of the harness-mem API.
//!
//! # Design
//! Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a one-call method that builds, executes it through the
//! configured `Transport`, and validates the reply with
//! `contract::parse_response`. Hosts with their own HTTP stack can use the
//! `build_*` half plus `parse_response` and never touch the transport.
//!
//! The client keeps no mutable state between calls; it can be shared across
//! threads as long as its transport can.

use std::time::Instant;

use crate::call::EndpointCall;
use crate::config::ClientConfig;
use crate::contract;
use crate::envelope::ResponseEnvelope;
use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::ids::normalize_ids;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    AuditLogQuery, CheckpointRequest, ConsolidationRequest, EventEnvelope, FinalizeSessionRequest,
    GetObservationsRequest, RecordEventBody, ResumePackRequest, SearchRequest, TimelineRequest,
};

pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const SEARCH: &str = "/v1/search";
    pub const TIMELINE: &str = "/v1/timeline";
    pub const GET_OBSERVATIONS: &str = "/v1/observations/get";
    pub const RECORD_EVENT: &str = "/v1/events/record";
    pub const RECORD_CHECKPOINT: &str = "/v1/checkpoints/record";
    pub const FINALIZE_SESSION: &str = "/v1/sessions/finalize";
    pub const RESUME_PACK: &str = "/v1/resume-pack";
    pub const RUN_CONSOLIDATION: &str = "/v1/admin/consolidation/run";
    pub const CONSOLIDATION_STATUS: &str = "/v1/admin/consolidation/status";
    pub const AUDIT_LOG: &str = "/v1/admin/audit-log";
}

/// Synchronous client for the harness-mem memory service.
#[derive(Debug, Clone)]
pub struct HarnessMemClient<T: Transport = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl HarnessMemClient<UreqTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::from_config(ClientConfig::new(base_url))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport)
    }

    pub fn from_env() -> Self {
        Self::from_config(ClientConfig::from_env())
    }
}

impl Default for HarnessMemClient<UreqTransport> {
    fn default() -> Self {
        Self::from_config(ClientConfig::default())
    }
}

impl<T: Transport> HarnessMemClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Bind `call` to this client's base URL and token.
    pub fn build(&self, call: EndpointCall) -> Result<HttpRequest> {
        call.into_request(&self.config)
    }

    /// Execute an already-built request and validate the reply.
    pub fn execute(&self, request: &HttpRequest) -> Result<ResponseEnvelope> {
        tracing::debug!(method = %request.method, url = %request.url, "harness-mem request");
        let started = Instant::now();
        let response = self.transport.execute(request, self.config.timeout)?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "harness-mem response"
        );
        self.parse_response(response)
    }

    /// Build, execute, and validate `call`.
    pub fn send(&self, call: EndpointCall) -> Result<ResponseEnvelope> {
        let request = self.build(call)?;
        self.execute(&request)
    }

    pub fn parse_response(&self, response: HttpResponse) -> Result<ResponseEnvelope> {
        contract::parse_response(response)
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_health(&self) -> Result<HttpRequest> {
        self.build(EndpointCall::get(paths::HEALTH))
    }

    pub fn build_search(&self, request: &SearchRequest) -> Result<HttpRequest> {
        self.build(EndpointCall::post(paths::SEARCH).json(request)?)
    }

    pub fn build_timeline(&self, request: &TimelineRequest) -> Result<HttpRequest> {
        self.build(EndpointCall::post(paths::TIMELINE).json(request)?)
    }

    /// Fails with a validation error when no non-blank id remains.
    pub fn build_get_observations(&self, request: &GetObservationsRequest) -> Result<HttpRequest> {
        let normalized = GetObservationsRequest {
            ids: normalize_ids(request.ids.as_slice())?,
            ..request.clone()
        };
        self.build(EndpointCall::post(paths::GET_OBSERVATIONS).json(&normalized)?)
    }

    pub fn build_record_event(&self, event: &EventEnvelope) -> Result<HttpRequest> {
        self.build(EndpointCall::post(paths::RECORD_EVENT).json(&RecordEventBody { event })?)
    }

    pub fn build_record_checkpoint(&self, request: &CheckpointRequest) -> Result<HttpRequest> {
        self.build(EndpointCall::post(paths::RECORD_CHECKPOINT).json(request)?)
    }

    pub fn build_finalize_session(&self, request: &FinalizeSessionRequest) -> Result<HttpRequest> {
        self.build(EndpointCall::post(paths::FINALIZE_SESSION).json(request)?)
    }

    pub fn build_resume_pack(&self, request: &ResumePackRequest) -> Result<HttpRequest> {
        self.build(EndpointCall::post(paths::RESUME_PACK).json(request)?)
    }

    pub fn build_run_consolidation(&self, request: &ConsolidationRequest) -> Result<HttpRequest> {
        self.build(EndpointCall::post(paths::RUN_CONSOLIDATION).json(request)?)
    }

    pub fn build_consolidation_status(&self) -> Result<HttpRequest> {
        self.build(EndpointCall::get(paths::CONSOLIDATION_STATUS))
    }

    pub fn build_audit_log(&self, query: &AuditLogQuery) -> Result<HttpRequest> {
        self.build(
            EndpointCall::get(paths::AUDIT_LOG)
                .query("limit", Some(query.limit))
                .query("action", query.action.as_deref())
                .query("target_type", query.target_type.as_deref()),
        )
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub fn health(&self) -> Result<ResponseEnvelope> {
        self.execute(&self.build_health()?)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<ResponseEnvelope> {
        self.execute(&self.build_search(request)?)
    }

    pub fn timeline(&self, request: &TimelineRequest) -> Result<ResponseEnvelope> {
        self.execute(&self.build_timeline(request)?)
    }

    pub fn get_observations(&self, request: &GetObservationsRequest) -> Result<ResponseEnvelope> {
        self.execute(&self.build_get_observations(request)?)
    }

    pub fn record_event(&self, event: &EventEnvelope) -> Result<ResponseEnvelope> {
        self.execute(&self.build_record_event(event)?)
    }

    pub fn record_checkpoint(&self, request: &CheckpointRequest) -> Result<ResponseEnvelope> {
        self.execute(&self.build_record_checkpoint(request)?)
    }

    pub fn finalize_session(&self, request: &FinalizeSessionRequest) -> Result<ResponseEnvelope> {
        self.execute(&self.build_finalize_session(request)?)
    }

    pub fn resume_pack(&self, request: &ResumePackRequest) -> Result<ResponseEnvelope> {
        self.execute(&self.build_resume_pack(request)?)
    }

    pub fn run_consolidation(&self, request: &ConsolidationRequest) -> Result<ResponseEnvelope> {
        self.execute(&self.build_run_consolidation(request)?)
    }

    pub fn consolidation_status(&self) -> Result<ResponseEnvelope> {
        self.execute(&self.build_consolidation_status()?)
    }

    pub fn audit_log(&self, query: &AuditLogQuery) -> Result<ResponseEnvelope> {
        self.execute(&self.build_audit_log(query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::http::HttpMethod;
    use crate::types::SummaryMode;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every request and answers each with the same canned response.
    struct CannedTransport {
        status: u16,
        body: String,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl CannedTransport {
        fn ok(body: Value) -> Self {
            Self::with_status(200, &body.to_string())
        }

        fn with_status(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for CannedTransport {
        fn execute(&self, request: &HttpRequest, _timeout: Duration) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(HttpResponse::new(self.status, self.body.clone()))
        }
    }

    fn client_with(transport: CannedTransport) -> HarnessMemClient<CannedTransport> {
        HarnessMemClient::with_transport(ClientConfig::new("http://example.local"), transport)
    }

    fn body_of(req: &HttpRequest) -> Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn build_health_is_bodyless_get() {
        let req = HarnessMemClient::new("http://localhost:37888/").build_health().unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:37888/health");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_search_posts_query_payload() {
        let client = HarnessMemClient::new("http://example.local");
        let req = client
            .build_search(&SearchRequest::new("python sdk").project("sdk").limit(5))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://example.local/v1/search");
        assert_eq!(
            body_of(&req),
            json!({"query": "python sdk", "project": "sdk", "limit": 5, "include_private": false, "debug": false})
        );
    }

    #[test]
    fn record_checkpoint_sends_tags_and_privacy_tags() {
        let client = client_with(CannedTransport::ok(json!({"ok": true, "items": []})));
        client
            .record_checkpoint(
                &CheckpointRequest::new("session-1", "checkpoint", "content")
                    .tags(["phase5"])
                    .privacy_tags(["private"]),
            )
            .unwrap();
        let body = body_of(&client.transport().requests()[0]);
        assert_eq!(body["tags"], json!(["phase5"]));
        assert_eq!(body["privacy_tags"], json!(["private"]));
    }

    #[test]
    fn get_observations_accepts_single_id_string() {
        let client = client_with(CannedTransport::ok(json!({"ok": true, "items": []})));
        client
            .get_observations(&GetObservationsRequest::new("obs-1").include_private(true))
            .unwrap();
        let body = body_of(&client.transport().requests()[0]);
        assert_eq!(body["ids"], json!(["obs-1"]));
        assert_eq!(body["include_private"], true);
        assert_eq!(body["compact"], true);
    }

    #[test]
    fn get_observations_rejects_blank_ids_before_sending() {
        let client = client_with(CannedTransport::ok(json!({"ok": true})));
        for ids in [Vec::<&str>::new(), vec!["  "]] {
            let err = client.get_observations(&GetObservationsRequest::new(ids)).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert!(client.transport().requests().is_empty());
    }

    #[test]
    fn api_error_uses_message_field_when_present() {
        let client = client_with(CannedTransport::with_status(400, r#"{"message":"bad request payload"}"#));
        let err = client.search(&SearchRequest::new("x")).unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.message(), "bad request payload");
    }

    #[test]
    fn ok_false_envelope_is_api_error() {
        let client = client_with(CannedTransport::ok(json!({"ok": false, "error": "x"})));
        let err = client.health().unwrap_err();
        assert_eq!(err.status_code(), Some(200));
        assert_eq!(err.message(), "x");
    }

    #[test]
    fn token_is_sent_on_every_request() {
        let config = ClientConfig::new("http://example.local").with_token(Some("secret-token"));
        let client = HarnessMemClient::with_transport(config, CannedTransport::ok(json!({"ok": true})));
        client.health().unwrap();
        client.consolidation_status().unwrap();
        client.finalize_session(&FinalizeSessionRequest::new("s")).unwrap();
        for req in client.transport().requests() {
            assert_eq!(req.header("x-harness-mem-token"), Some("secret-token"));
            assert_eq!(req.header("authorization"), Some("Bearer secret-token"));
        }
    }

    #[test]
    fn audit_log_uses_query_string_without_body() {
        let client = HarnessMemClient::new("http://example.local");
        let req = client.build_audit_log(&AuditLogQuery::default().action("finalize")).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://example.local/v1/admin/audit-log?limit=50&action=finalize");
        assert!(req.body.is_none());
    }

    #[test]
    fn record_event_wraps_event() {
        let client = HarnessMemClient::new("http://example.local");
        let event = EventEnvelope {
            event_id: Some("e-1".to_string()),
            event_type: Some("user_prompt".to_string()),
            ..Default::default()
        };
        let req = client.build_record_event(&event).unwrap();
        assert_eq!(body_of(&req), json!({"event": {"event_id": "e-1", "event_type": "user_prompt"}}));
    }

    #[test]
    fn finalize_and_consolidation_payloads() {
        let client = HarnessMemClient::new("http://example.local");
        let req = client
            .build_finalize_session(&FinalizeSessionRequest::new("s-1").summary_mode(SummaryMode::Detailed))
            .unwrap();
        assert_eq!(body_of(&req), json!({"session_id": "s-1", "summary_mode": "detailed"}));

        let req = client
            .build_run_consolidation(&ConsolidationRequest::default().project("p"))
            .unwrap();
        assert_eq!(req.url, "http://example.local/v1/admin/consolidation/run");
        assert_eq!(body_of(&req), json!({"reason": "rust-sdk", "project": "p"}));
    }

    #[test]
    fn envelope_is_returned_unchanged() {
        let raw = json!({"ok": true, "source": "core", "items": [{"id": "a", "x": 1}], "meta": {"count": 1}});
        let client = client_with(CannedTransport::ok(raw.clone()));
        let envelope = client.resume_pack(&ResumePackRequest::new("p")).unwrap();
        assert_eq!(serde_json::to_value(&envelope).unwrap(), raw);
    }
}
