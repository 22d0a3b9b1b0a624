//! Core domain types for courtside.
//!
//! Records scraped from the reference site, their identity keys, crawl
//! units and the accumulated crawl report. All modules depend on these
//! types; this module depends on nothing internal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Season type
// ---------------------------------------------------------------------------

/// Regular season or playoffs. Part of the stat identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeasonType {
    Regular,
    Playoffs,
}

impl SeasonType {
    pub fn from_playoff_flag(is_playoff: bool) -> Self {
        if is_playoff {
            SeasonType::Playoffs
        } else {
            SeasonType::Regular
        }
    }

    pub fn is_playoff(self) -> bool {
        self == SeasonType::Playoffs
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonType::Regular => write!(f, "regular"),
            SeasonType::Playoffs => write!(f, "playoffs"),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity keys
// ---------------------------------------------------------------------------

/// Identity of a player-season-team observation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatKey {
    pub player_id: String,
    pub season: i32,
    pub team: String,
    pub is_playoff: bool,
}

/// Identity of a shot attempt: court position plus game clock.
///
/// The source exposes no event id, so two shots sharing all seven values
/// are treated as the same event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShotKey {
    pub player_id: String,
    pub season: i32,
    pub date: String,
    pub quarter: String,
    pub time_remaining: String,
    pub top: i32,
    pub left: i32,
}

// ---------------------------------------------------------------------------
// Stat records
// ---------------------------------------------------------------------------

/// One row of the advanced stats table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedStat {
    /// Rank on the source table.
    pub external_id: i32,
    pub player_id: String,
    pub player_name: String,
    pub position: String,
    pub age: i32,
    pub games: i32,
    pub minutes_played: i32,
    pub per: f64,
    pub ts_percent: f64,
    pub three_par: f64,
    pub ftr: f64,
    pub orb_percent: f64,
    pub drb_percent: f64,
    pub trb_percent: f64,
    pub ast_percent: f64,
    pub stl_percent: f64,
    pub blk_percent: f64,
    pub tov_percent: f64,
    pub usg_percent: f64,
    pub offensive_ws: f64,
    pub defensive_ws: f64,
    pub win_shares: f64,
    pub win_shares_per_48: f64,
    pub obpm: f64,
    pub dbpm: f64,
    pub bpm: f64,
    pub vorp: f64,
    pub team: String,
    pub season: i32,
    pub is_playoff: bool,
}

impl AdvancedStat {
    pub fn key(&self) -> StatKey {
        StatKey {
            player_id: self.player_id.clone(),
            season: self.season,
            team: self.team.clone(),
            is_playoff: self.is_playoff,
        }
    }
}

/// One row of the season totals table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TotalStat {
    pub external_id: i32,
    pub player_id: String,
    pub player_name: String,
    pub position: String,
    pub age: i32,
    pub games: i32,
    pub games_started: i32,
    pub minutes_played: f64,
    pub field_goals: i32,
    pub field_attempts: i32,
    pub field_percent: f64,
    pub three_fg: i32,
    pub three_attempts: i32,
    pub three_percent: f64,
    pub two_fg: i32,
    pub two_attempts: i32,
    pub two_percent: f64,
    pub effective_fg_percent: f64,
    pub free_throws: i32,
    pub free_throw_attempts: i32,
    pub free_throw_percent: f64,
    pub offensive_rb: i32,
    pub defensive_rb: i32,
    pub total_rb: i32,
    pub assists: i32,
    pub steals: i32,
    pub blocks: i32,
    pub turnovers: i32,
    pub personal_fouls: i32,
    pub points: i32,
    pub team: String,
    pub season: i32,
    pub is_playoff: bool,
}

impl TotalStat {
    pub fn key(&self) -> StatKey {
        StatKey {
            player_id: self.player_id.clone(),
            season: self.season,
            team: self.team.clone(),
            is_playoff: self.is_playoff,
        }
    }
}

// ---------------------------------------------------------------------------
// Shot events
// ---------------------------------------------------------------------------

/// One shot attempt from a player's shot chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShotEvent {
    pub player_id: String,
    pub player_name: String,
    pub season: i32,
    /// "Oct 20,2021": month-day and year joined without a space.
    pub date: String,
    #[sqlx(rename = "qtr")]
    pub quarter: String,
    pub time_remaining: String,
    pub top: i32,
    pub left: i32,
    #[sqlx(rename = "result")]
    pub made: bool,
    pub shot_type: String,
    pub distance_ft: i32,
    pub team_score: i32,
    pub opponent_score: i32,
    pub team: String,
    pub opponent: String,
}

impl ShotEvent {
    /// Whether the shooter's team led after the shot. Always derived from
    /// the two scores.
    pub fn lead(&self) -> bool {
        self.team_score > self.opponent_score
    }

    pub fn key(&self) -> ShotKey {
        ShotKey {
            player_id: self.player_id.clone(),
            season: self.season,
            date: self.date.clone(),
            quarter: self.quarter.clone(),
            time_remaining: self.time_remaining.clone(),
            top: self.top,
            left: self.left,
        }
    }
}

// ---------------------------------------------------------------------------
// Crawl units
// ---------------------------------------------------------------------------

/// Which season-wide table a unit scrapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    Advanced,
    Totals,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Advanced => write!(f, "advanced"),
            TableKind::Totals => write!(f, "totals"),
        }
    }
}

/// A season-wide stat table variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatTable {
    pub kind: TableKind,
    pub season_type: SeasonType,
}

impl StatTable {
    pub fn new(kind: TableKind, season_type: SeasonType) -> Self {
        Self { kind, season_type }
    }
}

impl fmt::Display for StatTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.season_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Table(StatTable),
    ShotChart { player_id: String },
}

/// One (subject, season) task. Pure orchestration state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlUnit {
    pub subject: Subject,
    pub season: i32,
}

impl CrawlUnit {
    pub fn table(table: StatTable, season: i32) -> Self {
        Self { subject: Subject::Table(table), season }
    }

    pub fn shot_chart(player_id: &str, season: i32) -> Self {
        Self {
            subject: Subject::ShotChart { player_id: player_id.to_string() },
            season,
        }
    }
}

impl fmt::Display for CrawlUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Subject::Table(table) => write!(f, "{table} {}", self.season),
            Subject::ShotChart { player_id } => {
                write!(f, "shot-chart {player_id} {}", self.season)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Crawl report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedUnit {
    pub unit: String,
    pub reason: String,
}

/// Accumulated outcome of a sequence of crawl units.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub units_attempted: usize,
    pub units_with_records: usize,
    pub records_written: usize,
    /// Units that failed outright (fetch, structure or write).
    pub units_failed: usize,
    pub skipped: Vec<SkippedUnit>,
}

impl CrawlReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            units_attempted: 0,
            units_with_records: 0,
            records_written: 0,
            units_failed: 0,
            skipped: Vec::new(),
        }
    }

    /// Fold one unit's outcome into the report.
    pub fn absorb(mut self, unit: &CrawlUnit, outcome: Result<usize, IngestError>) -> Self {
        self.units_attempted += 1;
        match outcome {
            Ok(0) => self.skipped.push(SkippedUnit {
                unit: unit.to_string(),
                reason: "no records found".to_string(),
            }),
            Ok(written) => {
                self.units_with_records += 1;
                self.records_written += written;
            }
            Err(e) => {
                self.units_failed += 1;
                self.skipped.push(SkippedUnit {
                    unit: unit.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    /// Combine a nested report (e.g. one player's range) into this one.
    pub fn merge(mut self, other: CrawlReport) -> Self {
        self.units_attempted += other.units_attempted;
        self.units_with_records += other.units_with_records;
        self.records_written += other.records_written;
        self.units_failed += other.units_failed;
        self.skipped.extend(other.skipped);
        self
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// An invocation is an error only when failures left nothing written.
    /// The error keeps the report so the per-unit reasons survive.
    pub fn into_result(self) -> Result<Self, IngestError> {
        if self.records_written == 0 && self.units_failed > 0 {
            return Err(IngestError::NothingWritten(Box::new(self)));
        }
        Ok(self)
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crawl {}: attempted={} with_records={} failed={} skipped={} written={}",
            self.run_id,
            self.units_attempted,
            self.units_with_records,
            self.units_failed,
            self.skipped.len(),
            self.records_written,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures of the ingestion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Structure missing ({unit}): {what}")]
    StructureMissing { unit: String, what: String },

    #[error("Write failed ({unit}): {source}")]
    Write {
        unit: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Invalid season range {start}..{end}")]
    InvalidRange { start: i32, end: i32 },

    #[error("Nothing written: {} of {} units failed", .0.units_failed, .0.units_attempted)]
    NothingWritten(Box<CrawlReport>),

    #[error("Invalid selector {css}: {message}")]
    Selector { css: String, message: String },

    #[error("Storage error: {0}")]
    Store(#[from] sqlx::Error),
}

impl IngestError {
    /// Short category used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Fetch { .. } | IngestError::Status { .. } => "fetch",
            IngestError::StructureMissing { .. } => "structure",
            IngestError::Write { .. } => "write",
            IngestError::InvalidRange { .. } => "range",
            IngestError::NothingWritten(_) => "nothing-written",
            IngestError::Selector { .. } => "selector",
            IngestError::Store(_) => "store",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
