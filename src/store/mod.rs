//! Score store backends.
//!
//! A score store maps, per queue name, each distinct payload to an integer
//! score. Every primitive is a single atomic call against the backend; the
//! queue engine relies on that and adds no locking of its own.
//!
//! Equal scores are ordered by payload bytes descending in every backend,
//! both for ranges and for pops, so the first listed entry is the next one
//! popped.

pub mod memory;
pub mod postgres;
pub mod redis;

use std::future::Future;

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::model::ScoredPayload;

pub use self::memory::MemoryScoreStore;
pub use self::postgres::PgScoreStore;
pub use self::redis::RedisScoreStore;

/// Primitives the queue engine needs from its backing store.
pub trait ScoreStore: Send + Sync {
    /// Add `delta` to the payload's score, creating it at `delta` if absent.
    /// Returns the new score.
    fn increment_score(
        &self,
        queue: &str,
        payload: &[u8],
        delta: i64,
    ) -> impl Future<Output = Result<i64>> + Send;

    /// Remove and return up to `n` highest-scored entries, highest first.
    /// Empty when the queue is absent or empty.
    fn pop_max_score(
        &self,
        queue: &str,
        n: usize,
    ) -> impl Future<Output = Result<Vec<ScoredPayload>>> + Send;

    /// Number of distinct entries in the queue.
    fn cardinality(&self, queue: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Up to `limit` payloads ordered by score descending.
    fn range_by_score_desc(
        &self,
        queue: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Vec<u8>>>> + Send;
}

/// The backend selected by configuration.
pub enum Store {
    Memory(MemoryScoreStore),
    Postgres(PgScoreStore),
    Redis(RedisScoreStore),
}

impl Store {
    /// Connect to the backend named in the config. Postgres migrations are
    /// applied on connect.
    pub async fn connect(config: &Config) -> Result<Self> {
        match config.backend {
            Backend::Memory => Ok(Store::Memory(MemoryScoreStore::new())),
            Backend::Postgres => {
                let url = config.postgres_url()?;
                let store = PgScoreStore::connect(url).await?;
                store.migrate().await?;
                Ok(Store::Postgres(store))
            }
            Backend::Redis => Ok(Store::Redis(
                RedisScoreStore::connect(config.redis_connection_info()?).await?,
            )),
        }
    }

    /// Round trip to the backend.
    pub async fn health_check(&self) -> Result<()> {
        match self {
            Store::Memory(_) => Ok(()),
            Store::Postgres(s) => s.health_check().await,
            Store::Redis(s) => s.health_check().await,
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Store::Memory(_) => Backend::Memory,
            Store::Postgres(_) => Backend::Postgres,
            Store::Redis(_) => Backend::Redis,
        }
    }
}

impl ScoreStore for Store {
    async fn increment_score(&self, queue: &str, payload: &[u8], delta: i64) -> Result<i64> {
        match self {
            Store::Memory(s) => s.increment_score(queue, payload, delta).await,
            Store::Postgres(s) => s.increment_score(queue, payload, delta).await,
            Store::Redis(s) => s.increment_score(queue, payload, delta).await,
        }
    }

    async fn pop_max_score(&self, queue: &str, n: usize) -> Result<Vec<ScoredPayload>> {
        match self {
            Store::Memory(s) => s.pop_max_score(queue, n).await,
            Store::Postgres(s) => s.pop_max_score(queue, n).await,
            Store::Redis(s) => s.pop_max_score(queue, n).await,
        }
    }

    async fn cardinality(&self, queue: &str) -> Result<u64> {
        match self {
            Store::Memory(s) => s.cardinality(queue).await,
            Store::Postgres(s) => s.cardinality(queue).await,
            Store::Redis(s) => s.cardinality(queue).await,
        }
    }

    async fn range_by_score_desc(&self, queue: &str, limit: usize) -> Result<Vec<Vec<u8>>> {
        match self {
            Store::Memory(s) => s.range_by_score_desc(queue, limit).await,
            Store::Postgres(s) => s.range_by_score_desc(queue, limit).await,
            Store::Redis(s) => s.range_by_score_desc(queue, limit).await,
        }
    }
}
