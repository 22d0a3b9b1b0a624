//! Field map -> typed stat record construction.
//!
//! Column codes below are the site's `data-stat` names. Fields that move
//! between codes across page variants go through the alias table in
//! [`super::table`].

use tracing::{debug, warn};

use super::coerce::{coerce_float, coerce_int, CoercionMode};
use super::table::{resolve_int, resolve_text, Alias, FieldMap, GAMES, GAMES_STARTED, PLAYER_NAME, RANK, TEAM};
use crate::types::{AdvancedStat, SeasonType, TotalStat};

/// A row refused in strict mode because numeric cells failed to parse.
#[derive(Debug, thiserror::Error)]
#[error("row for {player_id} rejected: unparseable {fields:?}")]
pub struct RowRejected {
    pub player_id: String,
    pub fields: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// Row reader
// ---------------------------------------------------------------------------

/// Reads typed values out of a field map, remembering which non-blank
/// cells were coerced to zero.
struct RowReader<'a> {
    map: &'a FieldMap,
    invalid: Vec<&'static str>,
}

impl<'a> RowReader<'a> {
    fn new(map: &'a FieldMap) -> Self {
        Self { map, invalid: Vec::new() }
    }

    fn raw(&self, code: &str) -> &'a str {
        self.map.get(code).unwrap_or_default()
    }

    fn text(&self, code: &str) -> String {
        self.raw(code).to_string()
    }

    fn int(&mut self, code: &'static str) -> i32 {
        let raw = self.raw(code);
        let c = coerce_int(raw);
        if !c.ok && !raw.trim().is_empty() {
            self.invalid.push(code);
        }
        c.value
    }

    fn float(&mut self, code: &'static str) -> f64 {
        let raw = self.raw(code);
        let c = coerce_float(raw);
        if !c.ok && !raw.trim().is_empty() {
            self.invalid.push(code);
        }
        c.value
    }

    fn alias_int(&mut self, alias: &Alias) -> i32 {
        let c = resolve_int(self.map, alias);
        let any_filled = alias
            .codes
            .iter()
            .any(|code| !self.raw(code).trim().is_empty());
        if !c.ok && any_filled {
            self.invalid.push(alias.field);
        }
        c.value
    }

    fn alias_text(&self, alias: &Alias) -> String {
        resolve_text(self.map, alias).to_string()
    }

    fn finish(self, mode: CoercionMode) -> Result<(), RowRejected> {
        if self.invalid.is_empty() {
            return Ok(());
        }
        match mode {
            CoercionMode::Lenient => {
                debug!(
                    player_id = self.map.player_id(),
                    fields = ?self.invalid,
                    "Unparseable cells defaulted to zero"
                );
                Ok(())
            }
            CoercionMode::Strict => Err(RowRejected {
                player_id: self.map.player_id().to_string(),
                fields: self.invalid,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build one advanced stat record from a mapped row.
pub fn advanced_stat(
    map: &FieldMap,
    season: i32,
    season_type: SeasonType,
    mode: CoercionMode,
) -> Result<AdvancedStat, RowRejected> {
    let mut r = RowReader::new(map);
    let stat = AdvancedStat {
        external_id: r.alias_int(&RANK),
        player_id: map.player_id().to_string(),
        player_name: r.alias_text(&PLAYER_NAME),
        position: r.text("pos"),
        age: r.int("age"),
        games: r.alias_int(&GAMES),
        minutes_played: r.int("mp"),
        per: r.float("per"),
        ts_percent: r.float("ts_pct"),
        three_par: r.float("fg3a_per_fga_pct"),
        ftr: r.float("fta_per_fga_pct"),
        orb_percent: r.float("orb_pct"),
        drb_percent: r.float("drb_pct"),
        trb_percent: r.float("trb_pct"),
        ast_percent: r.float("ast_pct"),
        stl_percent: r.float("stl_pct"),
        blk_percent: r.float("blk_pct"),
        tov_percent: r.float("tov_pct"),
        usg_percent: r.float("usg_pct"),
        offensive_ws: r.float("ows"),
        defensive_ws: r.float("dws"),
        win_shares: r.float("ws"),
        win_shares_per_48: r.float("ws_per_48"),
        obpm: r.float("obpm"),
        dbpm: r.float("dbpm"),
        bpm: r.float("bpm"),
        vorp: r.float("vorp"),
        team: r.alias_text(&TEAM),
        season,
        is_playoff: season_type.is_playoff(),
    };
    r.finish(mode)?;
    Ok(stat)
}

/// Build one totals record from a mapped row.
pub fn total_stat(
    map: &FieldMap,
    season: i32,
    season_type: SeasonType,
    mode: CoercionMode,
) -> Result<TotalStat, RowRejected> {
    let mut r = RowReader::new(map);
    let stat = TotalStat {
        external_id: r.alias_int(&RANK),
        player_id: map.player_id().to_string(),
        player_name: r.alias_text(&PLAYER_NAME),
        position: r.text("pos"),
        age: r.int("age"),
        games: r.alias_int(&GAMES),
        games_started: r.alias_int(&GAMES_STARTED),
        minutes_played: r.float("mp"),
        field_goals: r.int("fg"),
        field_attempts: r.int("fga"),
        field_percent: r.float("fg_pct"),
        three_fg: r.int("fg3"),
        three_attempts: r.int("fg3a"),
        three_percent: r.float("fg3_pct"),
        two_fg: r.int("fg2"),
        two_attempts: r.int("fg2a"),
        two_percent: r.float("fg2_pct"),
        effective_fg_percent: r.float("efg_pct"),
        free_throws: r.int("ft"),
        free_throw_attempts: r.int("fta"),
        free_throw_percent: r.float("ft_pct"),
        offensive_rb: r.int("orb"),
        defensive_rb: r.int("drb"),
        total_rb: r.int("trb"),
        assists: r.int("ast"),
        steals: r.int("stl"),
        blocks: r.int("blk"),
        turnovers: r.int("tov"),
        personal_fouls: r.int("pf"),
        points: r.int("pts"),
        team: r.alias_text(&TEAM),
        season,
        is_playoff: season_type.is_playoff(),
    };
    r.finish(mode)?;
    Ok(stat)
}

/// Build records for every row, logging and dropping rejected rows.
pub fn build_records<T>(
    rows: &[FieldMap],
    mut build: impl FnMut(&FieldMap) -> Result<T, RowRejected>,
) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match build(row) {
            Ok(record) => Some(record),
            Err(rejected) => {
                warn!(
                    player_id = %rejected.player_id,
                    fields = ?rejected.fields,
                    "Row rejected by strict coercion"
                );
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
