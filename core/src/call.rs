//! Endpoint calls: the method/path/query/body tuple that every typed
//! operation reduces to before it touches the wire.

use serde::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};

pub const TOKEN_HEADER: &str = "x-harness-mem-token";

/// One call against the service, before it is bound to a base URL.
///
/// Query entries keep insertion order. Entries whose value is `None` stay in
/// the list so callers can describe the full parameter set, but they never
/// reach the encoded query string.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCall {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, Option<String>)>,
    pub body: Option<Value>,
}

impl EndpointCall {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn query<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        self.query.push((key.to_string(), value.map(|v| v.to_string())));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Form-encode the present query entries in insertion order. Returns
    /// `None` when nothing is left to send.
    pub fn encode_query(&self) -> Option<String> {
        let mut present = self
            .query
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| (key.as_str(), v)))
            .peekable();
        present.peek()?;
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(present);
        Some(serializer.finish())
    }

    /// Bind the call to `config`: absolute URL, JSON content type, token
    /// headers, and the serialized body for methods that carry one.
    pub fn into_request(self, config: &ClientConfig) -> Result<HttpRequest> {
        let base = config.base_url.trim_end_matches('/');
        let mut url = format!("{base}{}", self.path);
        if let Some(query) = self.encode_query() {
            url.push('?');
            url.push_str(&query);
        }

        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let Some(token) = config.active_token() {
            headers.push((TOKEN_HEADER.to_string(), token.to_string()));
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        let body = if self.method.carries_body() {
            let payload = self.body.unwrap_or_else(|| Value::Object(Map::new()));
            Some(serde_json::to_string(&payload)?)
        } else {
            None
        };

        Ok(HttpRequest {
            method: self.method,
            url,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ClientConfig {
        ClientConfig::new("http://localhost:3000")
    }

    #[test]
    fn absent_query_values_are_omitted() {
        let call = EndpointCall::get("/v1/admin/audit-log")
            .query("limit", Some(50))
            .query("action", None::<String>)
            .query("target_type", Some("session"));
        assert_eq!(call.encode_query().as_deref(), Some("limit=50&target_type=session"));
    }

    #[test]
    fn all_absent_query_yields_bare_path() {
        let req = EndpointCall::get("/health")
            .query("action", None::<&str>)
            .into_request(&config())
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/health");
    }

    #[test]
    fn query_values_are_url_safe() {
        let call = EndpointCall::get("/v1/admin/audit-log").query("action", Some("a&b c/d"));
        assert_eq!(call.encode_query().as_deref(), Some("action=a%26b+c%2Fd"));
    }

    #[test]
    fn get_drops_supplied_body() {
        let req = EndpointCall::get("/health")
            .json(&json!({"ignored": true}))
            .unwrap()
            .into_request(&config())
            .unwrap();
        assert!(req.body.is_none());
    }

    #[test]
    fn post_without_body_sends_empty_object() {
        let req = EndpointCall::post("/v1/search").into_request(&config()).unwrap();
        assert_eq!(req.body.as_deref(), Some("{}"));
    }

    #[test]
    fn content_type_is_always_json() {
        let req = EndpointCall::get("/health").into_request(&config()).unwrap();
        assert_eq!(req.headers, vec![("content-type".to_string(), "application/json".to_string())]);
    }

    #[test]
    fn token_sets_both_auth_headers() {
        let config = config().with_token(Some("secret-token"));
        let req = EndpointCall::post("/v1/search").into_request(&config).unwrap();
        assert_eq!(req.header(TOKEN_HEADER), Some("secret-token"));
        assert_eq!(req.header("authorization"), Some("Bearer secret-token"));
    }
}
