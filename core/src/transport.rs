//! Request execution.
//!
//! # Design
//! `Transport` is the only place the client touches the network. It returns
//! every HTTP status as data, including 4xx/5xx, and reports only failures
//! that prevented a response from arriving. Status interpretation belongs to
//! `contract::parse_response`.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one `HttpRequest` and waits for the single response.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse> {
        (**self).execute(request, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse> {
        (**self).execute(request, timeout)
    }
}

/// Blocking transport backed by `ureq`.
///
/// A fresh agent is built per call so that the timeout applies to the whole
/// round trip and no connection outlives the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

/// A 2xx body must be UTF-8. Any other status reads an undecodable body as
/// empty, leaving the status for the contract to classify.
fn decode_body(status: u16, bytes: Vec<u8>) -> Result<String> {
    match String::from_utf8(bytes) {
        Ok(body) => Ok(body),
        Err(_) if !(200..300).contains(&status) => Ok(String::new()),
        Err(e) => Err(Error::transport(format!("response body is not valid UTF-8: {e}"))),
    }
}

impl UreqTransport {
    fn agent(timeout: Duration) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent()
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse> {
        let agent = Self::agent(timeout);
        let url = request.url.as_str();
        let body = request.body.as_deref().unwrap_or("{}").as_bytes();

        let result = match request.method {
            HttpMethod::Get => with_headers(agent.get(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(url), &request.headers).call(),
            HttpMethod::Post => with_headers(agent.post(url), &request.headers).send(body),
            HttpMethod::Put => with_headers(agent.put(url), &request.headers).send(body),
            HttpMethod::Patch => with_headers(agent.patch(url), &request.headers).send(body),
        };
        let mut response = result.map_err(|e| {
            tracing::warn!(method = %request.method, url, error = %e, "harness-mem transport failure");
            Error::transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| Error::transport(format!("failed to read response body: {e}")))?;
        let body = decode_body(status, bytes)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
