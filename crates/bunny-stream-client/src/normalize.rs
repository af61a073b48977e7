//! Turns a raw transport outcome into a [`ResponseEnvelope`]. Never fails.

use bunny_stream_core::envelope::{
    DECODE_FAILURE_MESSAGE, TRANSPORT_FAILURE_MESSAGE, TRANSPORT_FAILURE_STATUS,
};
use bunny_stream_core::{ErrorPayload, ResponseEnvelope};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::transport::{RawResponse, TransportError};

pub fn normalize<T: DeserializeOwned>(
    outcome: Result<RawResponse, TransportError>,
) -> ResponseEnvelope<T> {
    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            // Detail stays in the log; callers get a stable message.
            tracing::warn!(error = %err, "Transport failure");
            return ResponseEnvelope::failure(
                TRANSPORT_FAILURE_STATUS,
                ErrorPayload::local(TRANSPORT_FAILURE_MESSAGE),
            );
        }
    };

    let status = response.status;

    if status >= 400 {
        let body = parse_error_body(&response.body);
        let payload = ErrorPayload::from_remote_body(body);
        tracing::warn!(status, error = %payload.error, "Remote API rejected request");
        return ResponseEnvelope::failure(status, payload);
    }

    match decode_body::<T>(&response.body) {
        Ok(data) => ResponseEnvelope::success(status, data),
        Err(err) => {
            tracing::warn!(status, error = %err, "Failed to decode response body");
            ResponseEnvelope::failure(status, ErrorPayload::local(DECODE_FAILURE_MESSAGE))
        }
    }
}

/// Empty bodies decode as JSON `null` so `()` and `Option<T>` targets work.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(body)
    }
}

fn parse_error_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
