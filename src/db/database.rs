use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Quota counter store. One row per (identity hash, calendar day) for
/// the daily quota, plus an event row per generation attempt for the
/// burst window. Counters never hold raw caller identity, only the
/// salted hash.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn init(database_url: &str) -> Result<Self> {
        // An in-memory sqlite database exists per connection, so the
        // pool must not hand out more than one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS daily_quota (\
                identity_hash TEXT NOT NULL,\
                day TEXT NOT NULL,\
                count INTEGER NOT NULL DEFAULT 0,\
                PRIMARY KEY (identity_hash, day)\
            );",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS burst_events (\
                id INTEGER PRIMARY KEY AUTOINCREMENT,\
                identity_hash TEXT NOT NULL,\
                endpoint TEXT NOT NULL,\
                at_unix_ms INTEGER NOT NULL\
            );",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_burst_events_identity \
             ON burst_events(identity_hash, endpoint, at_unix_ms);",
        )
        .execute(&pool)
        .await?;

        info!("Quota tables created successfully");
        Ok(Database { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn daily_count(&self, identity_hash: &str, day: &str) -> Result<i64> {
        let row = sqlx::query("SELECT count FROM daily_quota WHERE identity_hash = ? AND day = ?")
            .bind(identity_hash)
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<i64, _>(0)).unwrap_or(0))
    }

    /// Single-statement atomic upsert; concurrent requests from the
    /// same identity cannot lose increments. Returns the new count.
    pub async fn increment_daily_count(&self, identity_hash: &str, day: &str) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO daily_quota (identity_hash, day, count) VALUES (?, ?, 1) \
             ON CONFLICT(identity_hash, day) DO UPDATE SET count = count + 1 \
             RETURNING count",
        )
        .bind(identity_hash)
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    /// Count events inside the sliding window and record this one.
    /// Returns the number of prior events in the window.
    pub async fn burst_count_and_record(
        &self,
        identity_hash: &str,
        endpoint: &str,
        now_unix_ms: i64,
        window_ms: i64,
    ) -> Result<i64> {
        let cutoff = now_unix_ms - window_ms;
        sqlx::query("DELETE FROM burst_events WHERE at_unix_ms < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            "SELECT COUNT(*) FROM burst_events \
             WHERE identity_hash = ? AND endpoint = ? AND at_unix_ms >= ?",
        )
        .bind(identity_hash)
        .bind(endpoint)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        let prior = row.get::<i64, _>(0);

        sqlx::query(
            "INSERT INTO burst_events (identity_hash, endpoint, at_unix_ms) VALUES (?, ?, ?)",
        )
        .bind(identity_hash)
        .bind(endpoint)
        .bind(now_unix_ms)
        .execute(&self.pool)
        .await?;

        Ok(prior)
    }

    #[allow(dead_code)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> Database {
        Database::init("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn daily_count_starts_at_zero_and_increments_atomically() {
        let db = memory_db().await;
        assert_eq!(db.daily_count("abc", "2026-08-29").await.unwrap(), 0);
        assert_eq!(db.increment_daily_count("abc", "2026-08-29").await.unwrap(), 1);
        assert_eq!(db.increment_daily_count("abc", "2026-08-29").await.unwrap(), 2);
        assert_eq!(db.daily_count("abc", "2026-08-29").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn day_rollover_resets_implicitly() {
        let db = memory_db().await;
        for _ in 0..8 {
            db.increment_daily_count("abc", "2026-08-29").await.unwrap();
        }
        assert_eq!(db.daily_count("abc", "2026-08-29").await.unwrap(), 8);
        assert_eq!(db.daily_count("abc", "2026-08-30").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn identities_do_not_share_counters() {
        let db = memory_db().await;
        db.increment_daily_count("abc", "2026-08-29").await.unwrap();
        assert_eq!(db.daily_count("def", "2026-08-29").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn burst_window_counts_only_recent_events() {
        let db = memory_db().await;
        let window_ms = 900_000;
        let base = 1_700_000_000_000i64;
        assert_eq!(
            db.burst_count_and_record("abc", "restyle", base, window_ms)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            db.burst_count_and_record("abc", "restyle", base + 1_000, window_ms)
                .await
                .unwrap(),
            1
        );
        // An event a full window later only sees itself.
        assert_eq!(
            db.burst_count_and_record("abc", "restyle", base + window_ms + 2_000, window_ms)
                .await
                .unwrap(),
            0
        );
    }
}
