//! The response envelope shared by every queue endpoint:
//! `{ "ok": bool, "payload": ..., "message": string }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::model::Dequeued;

pub const MSG_BAD_REQUEST: &str = "Bad request";
pub const MSG_INTERNAL_ERROR: &str = "Internal error";
pub const MSG_EMPTY_QUEUE: &str = "Queue is empty";
pub const MSG_INSERT_ERROR: &str = "Error inserting item";
pub const MSG_COUNT_ERROR: &str = "Error getting count";
pub const MSG_LIST_ERROR: &str = "Error getting tasks list";
pub const MSG_POP_ERROR: &str = "Error popping item";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Method not allowed";

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub payload: T,
    pub message: String,
}

/// Serializes as `{}`.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

/// Payload of a successful dequeue.
#[derive(Debug, Serialize)]
pub struct DequeueBody {
    pub key: String,
    pub data: String,
}

impl From<Dequeued> for DequeueBody {
    fn from(d: Dequeued) -> Self {
        Self {
            data: d.data(),
            key: d.key,
        }
    }
}

/// 200 with `ok: true` and an empty message.
pub fn ok<T: Serialize>(payload: T) -> Response {
    let envelope = Envelope {
        ok: true,
        payload,
        message: String::new(),
    };
    (StatusCode::OK, Json(envelope)).into_response()
}

/// `ok: false` with an empty payload. An empty message falls back to the
/// status reason phrase.
pub fn error(status: StatusCode, message: &str) -> Response {
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or_default()
    } else {
        message
    };
    let envelope = Envelope {
        ok: false,
        payload: Empty {},
        message: message.to_string(),
    };
    (status, Json(envelope)).into_response()
}
