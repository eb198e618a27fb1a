//! Synchronous client core for the harness-mem memory service.
//!
//! # Overview
//! Records events and checkpoints, searches and fetches observations, builds
//! timelines, finalizes sessions, and drives the admin endpoints of a
//! harness-mem daemon over HTTP/JSON.
//!
//! # Design
//! - `call` turns a typed operation into an `HttpRequest` (query encoding,
//!   JSON body, token headers).
//! - `transport` executes it with a bounded timeout. `UreqTransport` is the
//!   default; any `Transport` impl can be plugged in.
//! - `contract` validates the reply envelope and classifies failures into
//!   the three `Error` kinds.
//! - `HarnessMemClient` is stateless apart from its config, so one call never
//!   affects another.

pub mod call;
pub mod client;
pub mod config;
pub mod contract;
pub mod envelope;
pub mod error;
pub mod http;
pub mod ids;
pub mod transport;
pub mod types;

pub use call::EndpointCall;
pub use client::HarnessMemClient;
pub use config::ClientConfig;
pub use contract::{extract_error_message, parse_response};
pub use envelope::{
    ApiMeta, AuditLogItem, ObservationItem, OkFlag, ResponseEnvelope, SessionFinalizeItem, Source,
    TokenEstimateMeta,
};
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use ids::{normalize_ids, ObservationIds};
pub use transport::{Transport, UreqTransport};
pub use types::{
    AuditLogQuery, CheckpointRequest, ConsolidationRequest, EventEnvelope, FinalizeSessionRequest,
    GetObservationsRequest, ResumePackRequest, SearchRequest, SummaryMode, TimelineRequest,
};
