//! Redis score store: one sorted set per queue name.
//!
//! ZINCRBY, ZPOPMAX, ZCARD and ZRANGE BYSCORE REV are each atomic on the
//! server. Redis orders equal scores by member bytes, so REV ranges and
//! ZPOPMAX both yield payloads in descending byte order on ties.

use redis::IntoConnectionInfo;
use redis::aio::ConnectionManager;

use crate::error::{Error, Result};
use crate::model::ScoredPayload;

use super::ScoreStore;

/// Redis handle. The connection manager multiplexes one connection across
/// all callers and reconnects on failure.
#[derive(Clone)]
pub struct RedisScoreStore {
    conn: ConnectionManager,
}

impl RedisScoreStore {
    /// Connect to Redis given a URL or prebuilt `ConnectionInfo`.
    pub async fn connect(info: impl IntoConnectionInfo) -> Result<Self> {
        let client = redis::Client::open(info)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Round trip with PING.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(Error::MalformedStoreResult(format!("unexpected PING reply {pong}")));
        }
        Ok(())
    }
}

impl ScoreStore for RedisScoreStore {
    async fn increment_score(&self, queue: &str, payload: &[u8], delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let score: i64 = redis::cmd("ZINCRBY")
            .arg(queue)
            .arg(delta)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(score)
    }

    async fn pop_max_score(&self, queue: &str, n: usize) -> Result<Vec<ScoredPayload>> {
        let mut conn = self.conn.clone();
        let reply: Vec<(Vec<u8>, i64)> = redis::cmd("ZPOPMAX")
            .arg(queue)
            .arg(n)
            .query_async(&mut conn)
            .await?;

        if reply.len() > n {
            return Err(Error::MalformedStoreResult(format!(
                "asked to pop {n} entries from {queue}, got {}",
                reply.len()
            )));
        }

        reply
            .into_iter()
            .map(|(payload, score)| {
                if score <= 0 {
                    return Err(Error::MalformedStoreResult(format!(
                        "non-positive score {score} in {queue}"
                    )));
                }
                Ok(ScoredPayload { payload, score })
            })
            .collect()
    }

    async fn cardinality(&self, queue: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = redis::cmd("ZCARD").arg(queue).query_async(&mut conn).await?;
        Ok(count)
    }

    async fn range_by_score_desc(&self, queue: &str, limit: usize) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let members: Vec<Vec<u8>> = redis::cmd("ZRANGE")
            .arg(queue)
            .arg("+inf")
            .arg("-inf")
            .arg("BYSCORE")
            .arg("REV")
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }
}
