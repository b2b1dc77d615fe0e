//! The `{status, data, message}` envelope and the rules for turning a raw
//! HTTP response into one.
//!
//! # Design
//! The remote API is trusted only as far as its body describes itself. A
//! response is passed through when it carries a recognized `status` and
//! either arrived with a 2xx code or already admits to a failure. Every other
//! shape is replaced by a synthesized `error` envelope whose message is
//! prefixed with `[ERR:<code>]`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::http::HttpResponse;

/// Outcome reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
    Error,
}

/// Codes carried by synthesized envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unknown = 1,
    InvalidResponseStatus = 2,
    Internal = 3,
    InvalidRequest = 4,
}

/// Whether an operation returns a list or a single item. Decides what an
/// empty `data` becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Collection,
    Item,
}

/// A response envelope.
///
/// `data` is `None` when the key was absent and `Some(Value::Null)` when the
/// server sent an explicit `null`. `message` is usually a string but is kept
/// as whatever JSON the server sent. Unknown top-level keys are kept in
/// `extra` so a passed-through payload loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Envelope {
    /// Build an `error` envelope with `data: null`.
    pub fn synthesized(code: ErrorCode, message: &str) -> Self {
        Self::with_status(Status::Error, code, message)
    }

    fn with_status(status: Status, code: ErrorCode, message: &str) -> Self {
        Self {
            status,
            data: Some(Value::Null),
            message: Some(Value::String(format!("[ERR:{}] {message}", code as u8))),
            extra: Map::new(),
        }
    }

    /// The message, when the server sent it as a string.
    pub fn message_text(&self) -> Option<&str> {
        self.message.as_ref().and_then(Value::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Replace an empty (`null` or `""`) `data` on a successful envelope with
    /// `[]` for collections or `null` for single items.
    pub fn normalize(mut self, shape: Shape) -> Self {
        if self.status != Status::Success {
            return self;
        }
        if let Some(data) = self.data.as_mut() {
            let empty = data.is_null() || data.as_str() == Some("");
            if empty {
                *data = match shape {
                    Shape::Collection => Value::Array(Vec::new()),
                    Shape::Item => Value::Null,
                };
            }
        }
        self
    }

    /// Deserialize `data` into a caller-chosen type.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.data.as_ref().unwrap_or(&Value::Null))
    }
}

/// Interpret a raw HTTP response. A non-2xx status plays the role of a
/// transport error with the response attached.
pub fn check_response(response: &HttpResponse) -> Envelope {
    if response.body.is_empty() {
        return synthesized(ErrorCode::Unknown, "Unknown error");
    }

    let payload = serde_json::from_str::<Value>(&response.body)
        .ok()
        .filter(|v| !v.is_null());
    let Some(payload) = payload else {
        if response.status == 403 {
            warn!(code = ErrorCode::InvalidRequest as u8, "Forbidden");
            return Envelope::with_status(Status::Fail, ErrorCode::InvalidRequest, "Forbidden");
        }
        return invalid_status();
    };

    let recognized = payload
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| matches!(s, "success" | "fail" | "error"));
    if !recognized {
        return invalid_status();
    }
    let envelope: Envelope = match serde_json::from_value(payload) {
        Ok(envelope) => envelope,
        Err(_) => return invalid_status(),
    };

    if response.is_success() {
        return envelope;
    }
    match envelope.status {
        Status::Error | Status::Fail => envelope,
        Status::Success => synthesized(ErrorCode::Unknown, "Unknown error"),
    }
}

fn invalid_status() -> Envelope {
    synthesized(
        ErrorCode::InvalidResponseStatus,
        "The 'status' field either empty or has invalid value",
    )
}

pub(crate) fn synthesized(code: ErrorCode, message: &str) -> Envelope {
    warn!(code = code as u8, "{message}");
    Envelope::synthesized(code, message)
}
