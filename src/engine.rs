//! Queue engine: enqueue with score accumulation, bounded listing, and
//! atomic highest-score extraction.
//!
//! The engine is stateless. Every operation maps onto one or two score store
//! calls and all coordination between concurrent callers is left to the
//! store's atomic primitives. Errors are returned to the caller untouched;
//! nothing is retried or logged here.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model::{Dequeued, Enqueued, LIST_LIMIT, TaskList, task_key};
use crate::store::ScoreStore;

/// Queue operations over an injected score store.
#[derive(Debug)]
pub struct QueueEngine<S> {
    store: S,
    timeout: Option<Duration>,
}

impl<S: ScoreStore> QueueEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Bound every store call. An elapsed call reports `StoreUnavailable`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Increment the payload's score by one, creating it at 1 if absent.
    ///
    /// Returns the composite key `queue:payload`.
    pub async fn enqueue(&self, queue: &str, payload: &[u8]) -> Result<Enqueued> {
        self.bounded(self.store.increment_score(queue, payload, 1))
            .await?;
        Ok(Enqueued {
            key: task_key(queue, payload),
        })
    }

    /// Total entry count plus the top [`LIST_LIMIT`] keys by score.
    ///
    /// The two reads are not atomic together.
    pub async fn list(&self, queue: &str) -> Result<TaskList> {
        let count = self.count(queue).await?;
        let keys = self.top(queue).await?;
        Ok(TaskList { keys, count })
    }

    /// Number of entries in the queue.
    pub async fn count(&self, queue: &str) -> Result<u64> {
        self.bounded(self.store.cardinality(queue)).await
    }

    /// Keys of the top [`LIST_LIMIT`] entries, highest score first.
    pub async fn top(&self, queue: &str) -> Result<Vec<String>> {
        let payloads = self
            .bounded(self.store.range_by_score_desc(queue, LIST_LIMIT))
            .await?;

        if payloads.len() > LIST_LIMIT {
            return Err(Error::MalformedStoreResult(format!(
                "range returned {} entries, limit is {LIST_LIMIT}",
                payloads.len()
            )));
        }

        Ok(payloads.iter().map(|p| task_key(queue, p)).collect())
    }

    /// Atomically remove and return the highest-scored entry.
    ///
    /// Returns `Error::EmptyQueue` when there is nothing to remove.
    pub async fn dequeue(&self, queue: &str) -> Result<Dequeued> {
        let mut popped = self.bounded(self.store.pop_max_score(queue, 1)).await?;

        if popped.len() > 1 {
            return Err(Error::MalformedStoreResult(format!(
                "single pop from {queue} returned {} entries",
                popped.len()
            )));
        }

        let entry = popped
            .pop()
            .ok_or_else(|| Error::EmptyQueue(queue.to_string()))?;

        Ok(Dequeued {
            key: task_key(queue, &entry.payload),
            payload: entry.payload,
        })
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                Error::StoreUnavailable(format!("store call timed out after {limit:?}"))
            })?,
            None => call.await,
        }
    }
}
