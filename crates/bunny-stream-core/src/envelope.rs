//! Uniform success/failure wrapper returned by every request method.
//!
//! On the wire an envelope looks like
//! `{"status": "success" | "failure", "statusCode": 200, "data": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestFailed;
use crate::models::{RemoteMessage, ValidationProblem};

/// Message used when a remote error body carries neither `title` nor `Message`.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Message used when the request never produced an HTTP response.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Unable to reach the remote API";

/// Message used when a successful response body does not match the expected shape.
pub const DECODE_FAILURE_MESSAGE: &str = "Unexpected response body";

/// Message used when request data cannot be encoded as JSON.
pub const ENCODE_FAILURE_MESSAGE: &str = "Invalid request data";

/// Status assigned to failures that never reached the remote API.
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResponseEnvelope<T> {
    Success {
        #[serde(rename = "statusCode")]
        status_code: u16,
        data: T,
    },
    Failure {
        #[serde(rename = "statusCode")]
        status_code: u16,
        data: ErrorPayload,
    },
}

impl<T> ResponseEnvelope<T> {
    pub fn success(status_code: u16, data: T) -> Self {
        ResponseEnvelope::Success { status_code, data }
    }

    pub fn failure(status_code: u16, data: ErrorPayload) -> Self {
        ResponseEnvelope::Failure { status_code, data }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ResponseEnvelope::Success { status_code, .. }
            | ResponseEnvelope::Failure { status_code, .. } => *status_code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ResponseEnvelope::Success { data, .. } => Some(data),
            ResponseEnvelope::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorPayload> {
        match self {
            ResponseEnvelope::Success { .. } => None,
            ResponseEnvelope::Failure { data, .. } => Some(data),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ResponseEnvelope<U> {
        match self {
            ResponseEnvelope::Success { status_code, data } => ResponseEnvelope::Success {
                status_code,
                data: f(data),
            },
            ResponseEnvelope::Failure { status_code, data } => {
                ResponseEnvelope::Failure { status_code, data }
            }
        }
    }

    pub fn into_result(self) -> Result<T, RequestFailed> {
        match self {
            ResponseEnvelope::Success { data, .. } => Ok(data),
            ResponseEnvelope::Failure { status_code, data } => Err(RequestFailed {
                status_code,
                message: data.error,
                origin: data.origin,
            }),
        }
    }
}

/// Where a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    /// The remote API answered with an error status.
    Remote,
    /// The failure happened in this process (transport, encoding, decoding).
    Local,
}

/// Body of a failure envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub origin: ErrorOrigin,
    pub details: ErrorDetails,
}

/// The error shapes the remote API is known to produce, plus local failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum ErrorDetails {
    Validation(ValidationProblem),
    Message(RemoteMessage),
    Unrecognized(Value),
    Local,
}

impl ErrorPayload {
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            origin: ErrorOrigin::Local,
            details: ErrorDetails::Local,
        }
    }

    /// Classify an error body returned alongside a status >= 400.
    ///
    /// The message comes from `title`, then `Message`, then a generic fallback.
    pub fn from_remote_body(body: Value) -> Self {
        if let Some(title) = non_empty_str(&body, "title") {
            let error = title.to_string();
            let details = match serde_json::from_value::<ValidationProblem>(body.clone()) {
                Ok(problem) => ErrorDetails::Validation(problem),
                Err(_) => ErrorDetails::Unrecognized(body),
            };
            return Self {
                error,
                origin: ErrorOrigin::Remote,
                details,
            };
        }

        if let Some(message) = non_empty_str(&body, "Message") {
            return Self {
                error: message.to_string(),
                origin: ErrorOrigin::Remote,
                details: ErrorDetails::Message(RemoteMessage {
                    message: message.to_string(),
                }),
            };
        }

        Self {
            error: GENERIC_FAILURE_MESSAGE.to_string(),
            origin: ErrorOrigin::Remote,
            details: ErrorDetails::Unrecognized(body),
        }
    }
}

fn non_empty_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_is_preferred_over_message() {
        let payload = ErrorPayload::from_remote_body(json!({
            "type": "https://tools.ietf.org/html/rfc7231#section-6.5.1",
            "title": "One or more validation errors occurred.",
            "status": 400,
            "traceId": "00-abc-01",
            "errors": { "title": ["The title field is required."] },
            "Message": "ignored"
        }));

        assert_eq!(payload.error, "One or more validation errors occurred.");
        assert_eq!(payload.origin, ErrorOrigin::Remote);
        match payload.details {
            ErrorDetails::Validation(problem) => {
                assert_eq!(problem.status, Some(400));
                assert_eq!(problem.trace_id.as_deref(), Some("00-abc-01"));
                assert_eq!(problem.errors["title"].len(), 1);
            }
            other => panic!("expected validation details, got {:?}", other),
        }
    }

    #[test]
    fn message_is_used_without_title() {
        let payload = ErrorPayload::from_remote_body(json!({ "Message": "Video not found" }));
        assert_eq!(payload.error, "Video not found");
        assert_eq!(
            payload.details,
            ErrorDetails::Message(RemoteMessage {
                message: "Video not found".to_string()
            })
        );
    }

    #[test]
    fn unknown_shapes_fall_back_to_generic_message() {
        let payload = ErrorPayload::from_remote_body(json!({ "foo": "bar" }));
        assert_eq!(payload.error, GENERIC_FAILURE_MESSAGE);
        assert_eq!(payload.details, ErrorDetails::Unrecognized(json!({ "foo": "bar" })));

        let payload = ErrorPayload::from_remote_body(Value::Null);
        assert_eq!(payload.error, GENERIC_FAILURE_MESSAGE);

        let payload = ErrorPayload::from_remote_body(json!({ "title": "" }));
        assert_eq!(payload.error, GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn envelope_serializes_with_status_tag() {
        let envelope = ResponseEnvelope::success(200, json!({ "totalItems": 1 }));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "status": "success", "statusCode": 200, "data": { "totalItems": 1 } })
        );

        let envelope: ResponseEnvelope<Value> =
            ResponseEnvelope::failure(500, ErrorPayload::local(TRANSPORT_FAILURE_MESSAGE));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["statusCode"], 500);
        assert_eq!(value["data"]["origin"], "local");
        assert_eq!(value["data"]["error"], TRANSPORT_FAILURE_MESSAGE);
    }

    #[test]
    fn into_result_maps_failure() {
        let envelope: ResponseEnvelope<u32> =
            ResponseEnvelope::failure(403, ErrorPayload::from_remote_body(json!({ "Message": "Forbidden" })));
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.status_code, 403);
        assert_eq!(err.message, "Forbidden");
        assert_eq!(err.origin, ErrorOrigin::Remote);

        let envelope = ResponseEnvelope::success(200, 5u32);
        assert_eq!(envelope.status_code(), 200);
        assert_eq!(envelope.map(|n| n * 2).into_result().unwrap(), 10);
    }
}
