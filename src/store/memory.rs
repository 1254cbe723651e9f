//! In-process score store.
//!
//! Each primitive runs under one mutex, which gives the same atomicity the
//! networked backends provide. State lives only as long as the process.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::ScoredPayload;

use super::ScoreStore;

/// Entries of one queue, indexed by payload and by (score desc, payload desc).
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<Vec<u8>, i64>,
    order: BTreeSet<(Reverse<i64>, Reverse<Vec<u8>>)>,
}

impl SortedSet {
    fn increment(&mut self, payload: &[u8], delta: i64) -> i64 {
        let score = match self.scores.get_mut(payload) {
            Some(score) => {
                self.order
                    .remove(&(Reverse(*score), Reverse(payload.to_vec())));
                *score += delta;
                *score
            }
            None => {
                self.scores.insert(payload.to_vec(), delta);
                delta
            }
        };
        self.order.insert((Reverse(score), Reverse(payload.to_vec())));
        score
    }

    fn pop_first(&mut self) -> Option<ScoredPayload> {
        let (Reverse(score), Reverse(payload)) = self.order.pop_first()?;
        self.scores.remove(&payload);
        Some(ScoredPayload { payload, score })
    }

    fn len(&self) -> usize {
        self.scores.len()
    }
}

/// Score store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    queues: Mutex<HashMap<String, SortedSet>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SortedSet>>> {
        self.queues
            .lock()
            .map_err(|_| Error::StoreUnavailable("memory store lock poisoned".to_string()))
    }
}

impl ScoreStore for MemoryScoreStore {
    async fn increment_score(&self, queue: &str, payload: &[u8], delta: i64) -> Result<i64> {
        let mut queues = self.lock()?;
        Ok(queues
            .entry(queue.to_string())
            .or_default()
            .increment(payload, delta))
    }

    async fn pop_max_score(&self, queue: &str, n: usize) -> Result<Vec<ScoredPayload>> {
        let mut queues = self.lock()?;
        let Some(set) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };

        let mut popped = Vec::with_capacity(n.min(set.len()));
        while popped.len() < n {
            match set.pop_first() {
                Some(entry) => popped.push(entry),
                None => break,
            }
        }

        if set.scores.is_empty() {
            queues.remove(queue);
        }
        Ok(popped)
    }

    async fn cardinality(&self, queue: &str) -> Result<u64> {
        let queues = self.lock()?;
        Ok(queues.get(queue).map_or(0, |set| set.len() as u64))
    }

    async fn range_by_score_desc(&self, queue: &str, limit: usize) -> Result<Vec<Vec<u8>>> {
        let queues = self.lock()?;
        Ok(queues
            .get(queue)
            .map(|set| {
                set.order
                    .iter()
                    .take(limit)
                    .map(|(_, Reverse(payload))| payload.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
