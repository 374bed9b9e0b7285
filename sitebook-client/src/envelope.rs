//! Response envelopes and error-message extraction.
//!
//! The backend wraps payloads in one of two shapes: `{message, data}` or
//! `{status, data}`. Both are decoded into typed structs at the service
//! boundary; a body that does not match is an
//! [`ErrorKind::UnexpectedShape`](crate::error::ErrorKind::UnexpectedShape)
//! failure rather than a partially trusted value.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ServiceError, ServiceResult, FALLBACK_MESSAGE};

/// `{message, data}` responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageEnvelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

impl<T> MessageEnvelope<T> {
    pub fn into_data(self) -> T {
        self.data
    }
}

/// Write acknowledgement: a message and, sometimes, the written record.
pub type Ack<T> = MessageEnvelope<Option<T>>;

impl<T> Ack<T> {
    /// The backend's message when it sent a non-blank one.
    pub fn backend_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// `{status, data}` responses. `status` is a boolean or a word such as
/// `"success"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusEnvelope<T> {
    pub status: Value,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

impl<T> StatusEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        match &self.status {
            Value::Bool(ok) => *ok,
            Value::String(word) => matches!(
                word.to_ascii_lowercase().as_str(),
                "success" | "ok" | "true"
            ),
            Value::Number(code) => code.as_u64().is_some_and(|c| (200..300).contains(&c)),
            _ => false,
        }
    }

    /// The payload, or a failure carrying the backend's message when the
    /// envelope reports an unsuccessful status inside a 2xx response.
    pub fn into_data(self) -> ServiceResult<T> {
        if self.is_ok() {
            Ok(self.data)
        } else {
            Err(ServiceError::unexpected_shape(
                self.message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            ))
        }
    }
}

/// Responses that carry only a message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageOnly {
    #[serde(default)]
    pub message: Option<String>,
}

/// Decode a 2xx body. An empty body decodes as `{}`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> ServiceResult<T> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|err| {
        tracing::warn!(
            error = %err,
            expected = std::any::type_name::<T>(),
            "Response did not match the expected shape"
        );
        ServiceError::unexpected_shape(FALLBACK_MESSAGE)
    })
}

/// Most specific message for a failed response: the backend's `message`,
/// then its `error`, then the status line a transport would report.
pub fn error_message(status: u16, body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        for field in ["message", "error"] {
            match map.get(field) {
                Some(Value::String(text)) if !text.trim().is_empty() => return text.clone(),
                Some(Value::Object(nested)) => {
                    if let Some(Value::String(text)) = nested.get("message") {
                        if !text.trim().is_empty() {
                            return text.clone();
                        }
                    }
                }
                _ => {}
            }
        }
    }
    if status == 0 {
        FALLBACK_MESSAGE.to_string()
    } else {
        format!("Request failed with status code {}", status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_message_wins_over_error() {
        let body = br#"{"message":"Token expired","error":"Unauthorized"}"#;
        assert_eq!(error_message(401, body), "Token expired");
    }

    #[test]
    fn test_error_used_when_message_missing() {
        let body = br#"{"error":"Business not found"}"#;
        assert_eq!(error_message(404, body), "Business not found");
        let blank = br#"{"message":"  ","error":"Business not found"}"#;
        assert_eq!(error_message(404, blank), "Business not found");
    }

    #[test]
    fn test_status_line_when_body_is_silent() {
        assert_eq!(error_message(502, b"<html>bad gateway</html>"), "Request failed with status code 502");
        assert_eq!(error_message(500, b"{}"), "Request failed with status code 500");
    }

    #[test]
    fn test_status_envelope_variants() {
        let ok: StatusEnvelope<u32> = decode(br#"{"status":true,"data":3}"#).unwrap();
        assert_eq!(ok.into_data().unwrap(), 3);
        let word: StatusEnvelope<u32> = decode(br#"{"status":"success","data":3}"#).unwrap();
        assert!(word.is_ok());
        let failed: StatusEnvelope<u32> =
            decode(br#"{"status":false,"message":"No sites","data":0}"#).unwrap();
        let err = failed.into_data().unwrap_err();
        assert_eq!(err.message, "No sites");
    }

    #[test]
    fn test_ack_without_data() {
        let ack: Ack<u32> = decode(br#"{"message":"ok"}"#).unwrap();
        assert_eq!(ack.backend_message(), Some("ok"));
        assert!(ack.data.is_none());
    }

    #[test]
    fn test_empty_body_decodes_as_message_only() {
        let ack: MessageOnly = decode(b"").unwrap();
        assert!(ack.message.is_none());
    }

    #[test]
    fn test_wrong_shape_is_unexpected() {
        let err = decode::<MessageEnvelope<Vec<u32>>>(br#"{"data":"nope"}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedShape);
        assert_eq!(err.message, FALLBACK_MESSAGE);
    }
}
