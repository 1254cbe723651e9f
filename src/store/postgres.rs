//! Postgres score store via direct SQLx.
//!
//! One row per (queue_name, payload) in `queue_entries`. Increment is an
//! upsert and pop is a `DELETE ... RETURNING`. Both run in a transaction
//! holding a per-queue advisory lock, so calls on one queue apply one at a
//! time and a pop always sees every committed increment.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

use crate::error::{Error, Result};
use crate::model::ScoredPayload;

use super::ScoreStore;

/// Postgres handle. Owns the connection pool shared by all engine calls.
#[derive(Clone)]
pub struct PgScoreStore {
    pool: PgPool,
}

impl PgScoreStore {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }

    /// Simple health check: run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl ScoreStore for PgScoreStore {
    async fn increment_score(&self, queue: &str, payload: &[u8], delta: i64) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        lock_queue(&mut tx, queue).await?;

        let row: (i64,) = sqlx::query_as(
            "INSERT INTO queue_entries (queue_name, payload, score)
             VALUES ($1, $2, $3)
             ON CONFLICT (queue_name, payload)
             DO UPDATE SET score = queue_entries.score + EXCLUDED.score
             RETURNING score",
        )
        .bind(queue)
        .bind(payload)
        .bind(delta)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.0)
    }

    async fn pop_max_score(&self, queue: &str, n: usize) -> Result<Vec<ScoredPayload>> {
        let mut tx = self.pool.begin().await?;
        lock_queue(&mut tx, queue).await?;

        // Plain FOR UPDATE: a row held by a writer outside the advisory lock
        // is waited for, never skipped.
        let rows: Vec<(Vec<u8>, i64)> = sqlx::query_as(
            "DELETE FROM queue_entries
             WHERE (queue_name, payload) IN (
                 SELECT queue_name, payload FROM queue_entries
                 WHERE queue_name = $1
                 ORDER BY score DESC, payload DESC
                 LIMIT $2
                 FOR UPDATE
             )
             RETURNING payload, score",
        )
        .bind(queue)
        .bind(limit_param(n))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        if rows.len() > n {
            return Err(Error::MalformedStoreResult(format!(
                "asked to pop {n} entries from {queue}, got {}",
                rows.len()
            )));
        }

        let mut popped = rows
            .into_iter()
            .map(|(payload, score)| {
                if score <= 0 {
                    return Err(Error::MalformedStoreResult(format!(
                        "non-positive score {score} in {queue}"
                    )));
                }
                Ok(ScoredPayload { payload, score })
            })
            .collect::<Result<Vec<_>>>()?;

        // RETURNING carries no order
        popped.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| b.payload.cmp(&a.payload)));
        Ok(popped)
    }

    async fn cardinality(&self, queue: &str) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT count(*) FROM queue_entries WHERE queue_name = $1")
            .bind(queue)
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(row.0)
            .map_err(|_| Error::MalformedStoreResult(format!("negative count {}", row.0)))
    }

    async fn range_by_score_desc(&self, queue: &str, limit: usize) -> Result<Vec<Vec<u8>>> {
        let rows: Vec<(Vec<u8>,)> = sqlx::query_as(
            "SELECT payload FROM queue_entries
             WHERE queue_name = $1
             ORDER BY score DESC, payload DESC
             LIMIT $2",
        )
        .bind(queue)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(payload,)| payload).collect())
    }
}

/// Take the transaction-scoped advisory lock for `queue`. Released on commit
/// or rollback.
async fn lock_queue(conn: &mut PgConnection, queue: &str) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(queue)
        .execute(conn)
        .await?;
    Ok(())
}

fn limit_param(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
