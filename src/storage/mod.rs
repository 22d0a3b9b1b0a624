//! Persistence layer.
//!
//! SQLite via `sqlx`. One table per record family, each with a surrogate
//! `id` plus a unique index on the record's identity key; writes go
//! through [`upsert`] and always target that index.

pub mod upsert;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use crate::types::{AdvancedStat, IngestError, ShotEvent, StatKey, TotalStat};

pub use upsert::Upsertable;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "advanced_stats" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "external_id" INTEGER NOT NULL DEFAULT 0,
        "player_id" TEXT NOT NULL,
        "player_name" TEXT NOT NULL DEFAULT '',
        "position" TEXT NOT NULL DEFAULT '',
        "age" INTEGER NOT NULL DEFAULT 0,
        "games" INTEGER NOT NULL DEFAULT 0,
        "minutes_played" INTEGER NOT NULL DEFAULT 0,
        "per" REAL NOT NULL DEFAULT 0,
        "ts_percent" REAL NOT NULL DEFAULT 0,
        "three_par" REAL NOT NULL DEFAULT 0,
        "ftr" REAL NOT NULL DEFAULT 0,
        "orb_percent" REAL NOT NULL DEFAULT 0,
        "drb_percent" REAL NOT NULL DEFAULT 0,
        "trb_percent" REAL NOT NULL DEFAULT 0,
        "ast_percent" REAL NOT NULL DEFAULT 0,
        "stl_percent" REAL NOT NULL DEFAULT 0,
        "blk_percent" REAL NOT NULL DEFAULT 0,
        "tov_percent" REAL NOT NULL DEFAULT 0,
        "usg_percent" REAL NOT NULL DEFAULT 0,
        "offensive_ws" REAL NOT NULL DEFAULT 0,
        "defensive_ws" REAL NOT NULL DEFAULT 0,
        "win_shares" REAL NOT NULL DEFAULT 0,
        "win_shares_per_48" REAL NOT NULL DEFAULT 0,
        "obpm" REAL NOT NULL DEFAULT 0,
        "dbpm" REAL NOT NULL DEFAULT 0,
        "bpm" REAL NOT NULL DEFAULT 0,
        "vorp" REAL NOT NULL DEFAULT 0,
        "team" TEXT NOT NULL,
        "season" INTEGER NOT NULL,
        "is_playoff" INTEGER NOT NULL,
        "created_at" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        "updated_at" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "advanced_stats_identity"
        ON "advanced_stats" ("player_id", "season", "team", "is_playoff")"#,
    r#"CREATE TABLE IF NOT EXISTS "total_stats" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "external_id" INTEGER NOT NULL DEFAULT 0,
        "player_id" TEXT NOT NULL,
        "player_name" TEXT NOT NULL DEFAULT '',
        "position" TEXT NOT NULL DEFAULT '',
        "age" INTEGER NOT NULL DEFAULT 0,
        "games" INTEGER NOT NULL DEFAULT 0,
        "games_started" INTEGER NOT NULL DEFAULT 0,
        "minutes_played" REAL NOT NULL DEFAULT 0,
        "field_goals" INTEGER NOT NULL DEFAULT 0,
        "field_attempts" INTEGER NOT NULL DEFAULT 0,
        "field_percent" REAL NOT NULL DEFAULT 0,
        "three_fg" INTEGER NOT NULL DEFAULT 0,
        "three_attempts" INTEGER NOT NULL DEFAULT 0,
        "three_percent" REAL NOT NULL DEFAULT 0,
        "two_fg" INTEGER NOT NULL DEFAULT 0,
        "two_attempts" INTEGER NOT NULL DEFAULT 0,
        "two_percent" REAL NOT NULL DEFAULT 0,
        "effective_fg_percent" REAL NOT NULL DEFAULT 0,
        "free_throws" INTEGER NOT NULL DEFAULT 0,
        "free_throw_attempts" INTEGER NOT NULL DEFAULT 0,
        "free_throw_percent" REAL NOT NULL DEFAULT 0,
        "offensive_rb" INTEGER NOT NULL DEFAULT 0,
        "defensive_rb" INTEGER NOT NULL DEFAULT 0,
        "total_rb" INTEGER NOT NULL DEFAULT 0,
        "assists" INTEGER NOT NULL DEFAULT 0,
        "steals" INTEGER NOT NULL DEFAULT 0,
        "blocks" INTEGER NOT NULL DEFAULT 0,
        "turnovers" INTEGER NOT NULL DEFAULT 0,
        "personal_fouls" INTEGER NOT NULL DEFAULT 0,
        "points" INTEGER NOT NULL DEFAULT 0,
        "team" TEXT NOT NULL,
        "season" INTEGER NOT NULL,
        "is_playoff" INTEGER NOT NULL,
        "created_at" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        "updated_at" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "total_stats_identity"
        ON "total_stats" ("player_id", "season", "team", "is_playoff")"#,
    r#"CREATE TABLE IF NOT EXISTS "shot_events" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "player_id" TEXT NOT NULL,
        "player_name" TEXT NOT NULL DEFAULT '',
        "season" INTEGER NOT NULL,
        "date" TEXT NOT NULL,
        "qtr" TEXT NOT NULL,
        "time_remaining" TEXT NOT NULL,
        "top" INTEGER NOT NULL,
        "left" INTEGER NOT NULL,
        "result" INTEGER NOT NULL,
        "shot_type" TEXT NOT NULL DEFAULT '',
        "distance_ft" INTEGER NOT NULL DEFAULT 0,
        "team_score" INTEGER NOT NULL DEFAULT 0,
        "opponent_score" INTEGER NOT NULL DEFAULT 0,
        "lead" INTEGER NOT NULL DEFAULT 0,
        "team" TEXT NOT NULL DEFAULT '',
        "opponent" TEXT NOT NULL DEFAULT '',
        "created_at" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        "updated_at" TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "shot_events_identity"
        ON "shot_events" ("player_id", "season", "date", "qtr", "time_remaining", "top", "left")"#,
];

/// Handle to the record store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, IngestError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        info!(url, max_connections, "Store connected");
        Ok(Self { pool })
    }

    /// A migrated private in-memory database.
    ///
    /// Every pooled connection to `:memory:` is its own database, so the
    /// pool is pinned to one connection that never expires.
    pub async fn in_memory() -> Result<Self, IngestError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and identity indexes. Idempotent.
    pub async fn migrate(&self) -> Result<(), IngestError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!(statements = SCHEMA.len(), "Schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write a batch of records. See [`upsert::upsert`].
    pub async fn upsert<T: Upsertable>(&self, records: &[T], unit: &str) -> Result<usize, IngestError> {
        upsert::upsert(&self.pool, records, unit).await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Row count of the table holding `T`.
    pub async fn count<T: Upsertable>(&self) -> Result<i64, IngestError> {
        let sql = format!(r#"SELECT COUNT(*) FROM "{}""#, T::TABLE);
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(n)
    }

    pub async fn advanced_stat(&self, key: &StatKey) -> Result<Option<AdvancedStat>, IngestError> {
        let sql = format!(
            r#"SELECT * FROM "{}" WHERE "player_id" = ? AND "season" = ? AND "team" = ? AND "is_playoff" = ?"#,
            AdvancedStat::TABLE
        );
        let row = sqlx::query_as::<_, AdvancedStat>(&sql)
            .bind(&key.player_id)
            .bind(key.season)
            .bind(&key.team)
            .bind(key.is_playoff)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn total_stat(&self, key: &StatKey) -> Result<Option<TotalStat>, IngestError> {
        let sql = format!(
            r#"SELECT * FROM "{}" WHERE "player_id" = ? AND "season" = ? AND "team" = ? AND "is_playoff" = ?"#,
            TotalStat::TABLE
        );
        let row = sqlx::query_as::<_, TotalStat>(&sql)
            .bind(&key.player_id)
            .bind(key.season)
            .bind(&key.team)
            .bind(key.is_playoff)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// A player's stored shots for one season, in insertion order.
    pub async fn shot_events(&self, player_id: &str, season: i32) -> Result<Vec<ShotEvent>, IngestError> {
        let sql = format!(
            r#"SELECT * FROM "{}" WHERE "player_id" = ? AND "season" = ? ORDER BY "id""#,
            ShotEvent::TABLE
        );
        let rows = sqlx::query_as::<_, ShotEvent>(&sql)
            .bind(player_id)
            .bind(season)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Distinct player ids seen in the totals table, sorted.
    pub async fn known_player_ids(&self) -> Result<Vec<String>, IngestError> {
        let sql = format!(
            r#"SELECT DISTINCT "player_id" FROM "{}" ORDER BY "player_id""#,
            TotalStat::TABLE
        );
        let ids: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
