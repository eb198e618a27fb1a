//! Response contract validation.
//!
//! Turns a raw `HttpResponse` into a `ResponseEnvelope` or a classified
//! error:
//!
//! 1. 2xx with an empty body reads as `{}`; 2xx with invalid JSON is a
//!    transport error. A non-2xx body that is not JSON reads as absent.
//! 2. Any parsed value that is not a JSON object is a transport error,
//!    whatever the status.
//! 3. Non-2xx is an API error carrying that status.
//! 4. `ok: false` is an API error with status 200.
//! 5. Anything else is returned as the envelope, unchanged.

use serde_json::{Map, Value};

use crate::envelope::{OkFlag, ResponseEnvelope};
use crate::error::{Error, Result};
use crate::http::HttpResponse;

/// Keys consulted, in order, when looking for an error message.
pub const MESSAGE_KEYS: [&str; 3] = ["error", "message", "detail"];

pub const OK_FALSE_FALLBACK: &str = "harness-mem API returned ok=false";

/// Validate `response` against the envelope contract.
pub fn parse_response(response: HttpResponse) -> Result<ResponseEnvelope> {
    let status = response.status;
    let success = response.is_success();

    let parsed = if success {
        if response.body.trim().is_empty() {
            Some(Value::Object(Map::new()))
        } else {
            Some(
                serde_json::from_str::<Value>(&response.body)
                    .map_err(|e| Error::transport(format!("invalid JSON response: {e}")))?,
            )
        }
    } else {
        serde_json::from_str::<Value>(&response.body).ok()
    };

    let object = match parsed {
        Some(Value::Object(object)) => Some(object),
        Some(_) => return Err(Error::transport("API response is not a JSON object")),
        None => None,
    };

    if !success {
        let body = object.map(Value::Object);
        let message = extract_error_message(body.as_ref(), &http_error_fallback(status));
        tracing::warn!(status, %message, "harness-mem request rejected");
        return Err(Error::api(status, message, body));
    }

    let object = object.unwrap_or_default();
    if OkFlag::classify(&object) == OkFlag::ExplicitFailure {
        let body = Value::Object(object);
        let message = extract_error_message(Some(&body), OK_FALSE_FALLBACK);
        tracing::warn!(%message, "harness-mem returned ok=false");
        return Err(Error::api(200, message, Some(body)));
    }

    // Every documented field is held as raw JSON, so any object converts.
    serde_json::from_value(Value::Object(object)).map_err(Error::from)
}

/// First non-blank string among `error`, `message` and `detail`, else
/// `fallback`. The chosen value is returned as sent, not trimmed.
pub fn extract_error_message(payload: Option<&Value>, fallback: &str) -> String {
    let Some(Value::Object(object)) = payload else {
        return fallback.to_string();
    };
    MESSAGE_KEYS
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .find(|value| !value.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn http_error_fallback(status: u16) -> String {
    let reason = ureq::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason());
    match reason {
        Some(reason) => format!("HTTP Error {status}: {reason}"),
        None => format!("HTTP Error {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, body)
    }

    #[test]
    fn ok_false_is_api_error_with_status_200() {
        let err = parse_response(response(200, r#"{"ok": false, "error": "x"}"#)).unwrap_err();
        match err {
            Error::Api { status_code, message, body } => {
                assert_eq!(status_code, 200);
                assert_eq!(message, "x");
                assert_eq!(body, Some(json!({"ok": false, "error": "x"})));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn ok_false_without_message_uses_fallback() {
        let err = parse_response(response(200, r#"{"ok": false}"#)).unwrap_err();
        assert_eq!(err.message(), OK_FALSE_FALLBACK);
    }

    #[test]
    fn http_400_uses_message_field() {
        let err = parse_response(response(400, r#"{"message":"bad request payload"}"#)).unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.message(), "bad request payload");
    }

    #[test]
    fn http_error_with_unparsable_body_has_no_body() {
        let err = parse_response(response(502, "<html>Bad Gateway</html>")).unwrap_err();
        match err {
            Error::Api { status_code, message, body } => {
                assert_eq!(status_code, 502);
                assert_eq!(message, "HTTP Error 502: Bad Gateway");
                assert!(body.is_none());
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn non_object_is_transport_error_regardless_of_status() {
        for (status, body) in [(200, "[1,2]"), (200, "42"), (500, "[]"), (404, "\"missing\"")] {
            let err = parse_response(response(status, body)).unwrap_err();
            assert!(err.is_transport(), "status {status} body {body}: {err:?}");
        }
    }

    #[test]
    fn invalid_json_on_success_is_transport_error() {
        let err = parse_response(response(200, "not json")).unwrap_err();
        assert!(err.is_transport());
        assert!(err.message().starts_with("invalid JSON response"));
    }

    #[test]
    fn empty_success_body_reads_as_empty_envelope() {
        let envelope = parse_response(response(200, "")).unwrap();
        assert_eq!(envelope, ResponseEnvelope::default());
    }

    #[test]
    fn missing_ok_is_success() {
        let envelope = parse_response(response(200, r#"{"items": [{"id": "a"}]}"#)).unwrap();
        assert_eq!(envelope.first_id(), Some("a"));
    }

    #[test]
    fn null_ok_is_success() {
        assert!(parse_response(response(200, r#"{"ok": null}"#)).is_ok());
    }

    #[test]
    fn off_type_meta_passes_through_on_success() {
        let body = r#"{"ok":true,"items":[],"meta":{"count":-1}}"#;
        let envelope = parse_response(response(200, body)).unwrap();
        assert_eq!(envelope.meta, Some(json!({"count": -1})));
        assert!(envelope.meta_as().unwrap_err().is_serialization());

        let body = r#"{"ok":true,"meta":{"warnings":[{"code":"w1"}]}}"#;
        let envelope = parse_response(response(200, body)).unwrap();
        assert_eq!(serde_json::to_value(&envelope).unwrap(), json!({"ok": true, "meta": {"warnings": [{"code": "w1"}]}}));
    }

    #[test]
    fn non_string_error_on_success_is_not_a_failure() {
        let envelope = parse_response(response(200, r#"{"ok":true,"error":{"code":"soft"}}"#)).unwrap();
        assert_eq!(envelope.error, Some(json!({"code": "soft"})));
        assert!(envelope.error_message().is_none());
    }

    #[test]
    fn message_precedence_is_error_message_detail() {
        let payload = json!({"error": "E", "message": "M", "detail": "D"});
        assert_eq!(extract_error_message(Some(&payload), "fb"), "E");
        let payload = json!({"message": "M", "detail": "D"});
        assert_eq!(extract_error_message(Some(&payload), "fb"), "M");
        let payload = json!({"detail": "D"});
        assert_eq!(extract_error_message(Some(&payload), "fb"), "D");
    }

    #[test]
    fn blank_and_non_string_messages_are_skipped() {
        let payload = json!({"error": "   ", "message": 12, "detail": "D"});
        assert_eq!(extract_error_message(Some(&payload), "fb"), "D");
        let payload = json!({"error": null});
        assert_eq!(extract_error_message(Some(&payload), "fb"), "fb");
    }

    #[test]
    fn non_object_payload_uses_fallback() {
        assert_eq!(extract_error_message(Some(&json!(["error"])), "fb"), "fb");
        assert_eq!(extract_error_message(None, "fb"), "fb");
    }
}
