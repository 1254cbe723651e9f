//! Core data model.
//!
//! A queue is a named, implicitly existing set of task entries. An entry is a
//! unique payload carrying a score: the number of times it has been enqueued
//! since it was last dequeued. Higher score is dequeued first.

use serde::Serialize;

/// Maximum number of keys returned by a list operation.
pub const LIST_LIMIT: usize = 100;

/// Separator between queue name and payload in a composite task key.
pub const KEY_SEPARATOR: char = ':';

/// Build the composite key `queue:payload`.
///
/// No escaping is applied, so the key is ambiguous when either part contains
/// a colon. Payload bytes that are not valid UTF-8 are rendered with U+FFFD.
pub fn task_key(queue: &str, payload: &[u8]) -> String {
    let payload = String::from_utf8_lossy(payload);
    let mut key = String::with_capacity(queue.len() + 1 + payload.len());
    key.push_str(queue);
    key.push(KEY_SEPARATOR);
    key.push_str(&payload);
    key
}

// ---------------------------------------------------------------------------
// Store-level types
// ---------------------------------------------------------------------------

/// A payload together with its score, as returned by a pop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredPayload {
    pub payload: Vec<u8>,
    pub score: i64,
}

// ---------------------------------------------------------------------------
// Engine results
// ---------------------------------------------------------------------------

/// Result of an enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enqueued {
    pub key: String,
}

/// Result of a list: top keys by score and the total distinct entry count.
///
/// The two halves come from separate store reads, so `count` may disagree
/// with `keys.len()` under concurrent mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskList {
    #[serde(rename = "tasks")]
    pub keys: Vec<String>,
    pub count: u64,
}

/// Result of a successful dequeue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dequeued {
    pub key: String,
    pub payload: Vec<u8>,
}

impl Dequeued {
    /// Payload as text, lossy for non-UTF-8 bytes.
    pub fn data(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
