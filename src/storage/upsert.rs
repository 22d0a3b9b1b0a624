//! Batch upsert keyed on identity columns.
//!
//! A batch is made unique on its identity key (last occurrence wins), then
//! written in bind-limit-sized chunks inside one transaction:
//!
//! ```text
//! INSERT INTO "t" (cols...) VALUES (...), (...)
//! ON CONFLICT ("k1", "k2", ...) DO UPDATE SET "v1" = excluded."v1", ...
//! ```
//!
//! Identity columns never appear in the update set.

use sqlx::query_builder::Separated;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, warn};

use crate::types::{AdvancedStat, IngestError, ShotEvent, ShotKey, StatKey, TotalStat};

/// Stay under SQLite's host-parameter limit (32766 on current builds).
const MAX_BINDS_PER_STATEMENT: usize = 32_000;

/// A record family that can be written through [`upsert`].
pub trait Upsertable: Send + Sync {
    type Key: Eq + Hash;

    const TABLE: &'static str;
    /// Every written column, in the order [`Upsertable::bind_row`] binds.
    const COLUMNS: &'static [&'static str];
    /// The identity subset of `COLUMNS`; the conflict target.
    const KEY_COLUMNS: &'static [&'static str];

    fn identity(&self) -> Self::Key;

    /// Push one bind per entry of `COLUMNS`.
    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>);

    /// Columns rewritten on conflict.
    fn update_columns() -> Vec<&'static str> {
        Self::COLUMNS
            .iter()
            .copied()
            .filter(|c| !Self::KEY_COLUMNS.contains(c))
            .collect()
    }
}

fn quoted(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keep only the last occurrence of each identity key, preserving the
/// relative order of survivors.
pub fn dedup_last<T: Upsertable>(records: &[T]) -> Vec<&T> {
    let mut last: HashMap<T::Key, usize> = HashMap::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        last.insert(rec.identity(), i);
    }
    records
        .iter()
        .enumerate()
        .filter(|(i, rec)| last.get(&rec.identity()) == Some(i))
        .map(|(_, rec)| rec)
        .collect()
}

/// Write `records` atomically. Returns the number of distinct records
/// written. `unit` labels any failure.
pub async fn upsert<T: Upsertable>(
    pool: &SqlitePool,
    records: &[T],
    unit: &str,
) -> Result<usize, IngestError> {
    if records.is_empty() {
        return Ok(0);
    }

    let unique = dedup_last(records);
    let dropped = records.len() - unique.len();
    if dropped > 0 {
        warn!(unit, table = T::TABLE, dropped, "Duplicate identity keys in batch, keeping last");
    }

    let write_err = |source: sqlx::Error| IngestError::Write { unit: unit.to_string(), source };

    let insert_head = format!(r#"INSERT INTO "{}" ({}) "#, T::TABLE, quoted(T::COLUMNS));
    let mut conflict_tail = format!(" ON CONFLICT ({}) DO UPDATE SET ", quoted(T::KEY_COLUMNS));
    for col in T::update_columns() {
        conflict_tail.push_str(&format!("\"{col}\" = excluded.\"{col}\", "));
    }
    conflict_tail.push_str(r#""updated_at" = CURRENT_TIMESTAMP"#);

    let chunk_size = (MAX_BINDS_PER_STATEMENT / T::COLUMNS.len()).max(1);
    let mut tx = pool.begin().await.map_err(write_err)?;

    for chunk in unique.chunks(chunk_size) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(insert_head.as_str());
        qb.push_values(chunk, |mut row, rec| rec.bind_row(&mut row));
        qb.push(conflict_tail.as_str());
        qb.build().execute(&mut *tx).await.map_err(write_err)?;
    }

    tx.commit().await.map_err(write_err)?;
    debug!(unit, table = T::TABLE, written = unique.len(), "Batch upserted");
    Ok(unique.len())
}

// ---------------------------------------------------------------------------
// Record families
// ---------------------------------------------------------------------------

const STAT_KEY_COLUMNS: &[&str] = &["player_id", "season", "team", "is_playoff"];

impl Upsertable for AdvancedStat {
    type Key = StatKey;

    const TABLE: &'static str = "advanced_stats";
    const COLUMNS: &'static [&'static str] = &[
        "external_id",
        "player_id",
        "player_name",
        "position",
        "age",
        "games",
        "minutes_played",
        "per",
        "ts_percent",
        "three_par",
        "ftr",
        "orb_percent",
        "drb_percent",
        "trb_percent",
        "ast_percent",
        "stl_percent",
        "blk_percent",
        "tov_percent",
        "usg_percent",
        "offensive_ws",
        "defensive_ws",
        "win_shares",
        "win_shares_per_48",
        "obpm",
        "dbpm",
        "bpm",
        "vorp",
        "team",
        "season",
        "is_playoff",
    ];
    const KEY_COLUMNS: &'static [&'static str] = STAT_KEY_COLUMNS;

    fn identity(&self) -> StatKey {
        self.key()
    }

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.external_id)
            .push_bind(self.player_id.clone())
            .push_bind(self.player_name.clone())
            .push_bind(self.position.clone())
            .push_bind(self.age)
            .push_bind(self.games)
            .push_bind(self.minutes_played)
            .push_bind(self.per)
            .push_bind(self.ts_percent)
            .push_bind(self.three_par)
            .push_bind(self.ftr)
            .push_bind(self.orb_percent)
            .push_bind(self.drb_percent)
            .push_bind(self.trb_percent)
            .push_bind(self.ast_percent)
            .push_bind(self.stl_percent)
            .push_bind(self.blk_percent)
            .push_bind(self.tov_percent)
            .push_bind(self.usg_percent)
            .push_bind(self.offensive_ws)
            .push_bind(self.defensive_ws)
            .push_bind(self.win_shares)
            .push_bind(self.win_shares_per_48)
            .push_bind(self.obpm)
            .push_bind(self.dbpm)
            .push_bind(self.bpm)
            .push_bind(self.vorp)
            .push_bind(self.team.clone())
            .push_bind(self.season)
            .push_bind(self.is_playoff);
    }
}

impl Upsertable for TotalStat {
    type Key = StatKey;

    const TABLE: &'static str = "total_stats";
    const COLUMNS: &'static [&'static str] = &[
        "external_id",
        "player_id",
        "player_name",
        "position",
        "age",
        "games",
        "games_started",
        "minutes_played",
        "field_goals",
        "field_attempts",
        "field_percent",
        "three_fg",
        "three_attempts",
        "three_percent",
        "two_fg",
        "two_attempts",
        "two_percent",
        "effective_fg_percent",
        "free_throws",
        "free_throw_attempts",
        "free_throw_percent",
        "offensive_rb",
        "defensive_rb",
        "total_rb",
        "assists",
        "steals",
        "blocks",
        "turnovers",
        "personal_fouls",
        "points",
        "team",
        "season",
        "is_playoff",
    ];
    const KEY_COLUMNS: &'static [&'static str] = STAT_KEY_COLUMNS;

    fn identity(&self) -> StatKey {
        self.key()
    }

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.external_id)
            .push_bind(self.player_id.clone())
            .push_bind(self.player_name.clone())
            .push_bind(self.position.clone())
            .push_bind(self.age)
            .push_bind(self.games)
            .push_bind(self.games_started)
            .push_bind(self.minutes_played)
            .push_bind(self.field_goals)
            .push_bind(self.field_attempts)
            .push_bind(self.field_percent)
            .push_bind(self.three_fg)
            .push_bind(self.three_attempts)
            .push_bind(self.three_percent)
            .push_bind(self.two_fg)
            .push_bind(self.two_attempts)
            .push_bind(self.two_percent)
            .push_bind(self.effective_fg_percent)
            .push_bind(self.free_throws)
            .push_bind(self.free_throw_attempts)
            .push_bind(self.free_throw_percent)
            .push_bind(self.offensive_rb)
            .push_bind(self.defensive_rb)
            .push_bind(self.total_rb)
            .push_bind(self.assists)
            .push_bind(self.steals)
            .push_bind(self.blocks)
            .push_bind(self.turnovers)
            .push_bind(self.personal_fouls)
            .push_bind(self.points)
            .push_bind(self.team.clone())
            .push_bind(self.season)
            .push_bind(self.is_playoff);
    }
}

impl Upsertable for ShotEvent {
    type Key = ShotKey;

    const TABLE: &'static str = "shot_events";
    const COLUMNS: &'static [&'static str] = &[
        "player_id",
        "player_name",
        "season",
        "date",
        "qtr",
        "time_remaining",
        "top",
        "left",
        "result",
        "shot_type",
        "distance_ft",
        "team_score",
        "opponent_score",
        "lead",
        "team",
        "opponent",
    ];
    const KEY_COLUMNS: &'static [&'static str] =
        &["player_id", "season", "date", "qtr", "time_remaining", "top", "left"];

    fn identity(&self) -> ShotKey {
        self.key()
    }

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.player_id.clone())
            .push_bind(self.player_name.clone())
            .push_bind(self.season)
            .push_bind(self.date.clone())
            .push_bind(self.quarter.clone())
            .push_bind(self.time_remaining.clone())
            .push_bind(self.top)
            .push_bind(self.left)
            .push_bind(self.made)
            .push_bind(self.shot_type.clone())
            .push_bind(self.distance_ft)
            .push_bind(self.team_score)
            .push_bind(self.opponent_score)
            .push_bind(self.lead())
            .push_bind(self.team.clone())
            .push_bind(self.opponent.clone());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
