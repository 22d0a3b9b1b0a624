//! Table-to-field-map mapping.
//!
//! A stat table is read by its `data-stat` codes rather than its display
//! labels. Each body row becomes a [`FieldMap`] keyed by those codes plus
//! a synthetic `player-additional` key holding the player's permanent id,
//! which the site only exposes as a `data-append-csv` cell attribute.

use scraper::{ElementRef, Html};
use tracing::debug;

use super::coerce::{coerce_int, Coerced};
use super::comment::{container_anchor, find_commented_markup};
use super::selector;
use crate::types::IngestError;

/// Synthetic trailing key for the out-of-band player id.
pub const PLAYER_ID_KEY: &str = "player-additional";

const ID_ATTR: &str = "data-append-csv";
const STAT_ATTR: &str = "data-stat";
/// Class the site puts on header rows repeated inside the body.
const REPEATED_HEADER_CLASS: &str = "thead";

// ---------------------------------------------------------------------------
// Field map
// ---------------------------------------------------------------------------

/// Ordered stat-code -> cell-text mapping for one table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; an existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The row's permanent player id. Present on every mapped row.
    pub fn player_id(&self) -> &str {
        self.get(PLAYER_ID_KEY).unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Column aliases
// ---------------------------------------------------------------------------

/// A logical field and the stat codes it may appear under, in priority
/// order. Page variants (regular/playoffs, totals/advanced) disagree on
/// codes for the same column.
#[derive(Debug, Clone, Copy)]
pub struct Alias {
    pub field: &'static str,
    pub codes: &'static [&'static str],
}

pub const RANK: Alias = Alias { field: "external_id", codes: &["rk", "ranker"] };
pub const PLAYER_NAME: Alias = Alias { field: "player_name", codes: &["player", "name_display"] };
pub const TEAM: Alias = Alias { field: "team", codes: &["team_id", "team_name_abbr"] };
pub const GAMES: Alias = Alias { field: "games", codes: &["games", "g"] };
pub const GAMES_STARTED: Alias = Alias { field: "games_started", codes: &["games_started", "gs"] };

/// Every alias the record builders use.
pub const ALIASES: &[Alias] = &[RANK, PLAYER_NAME, TEAM, GAMES, GAMES_STARTED];

/// First candidate that coerces to a non-zero integer. Absent or zero
/// candidates fall through. When none hit the value is zero, and it counts
/// as parsed if any candidate held a measured zero.
pub fn resolve_int(map: &FieldMap, alias: &Alias) -> Coerced<i32> {
    let mut zero = Coerced { value: 0, ok: false };
    for code in alias.codes {
        let Some(raw) = map.get(code) else { continue };
        let c = coerce_int(raw);
        if c.value != 0 {
            return c;
        }
        zero.ok |= c.ok;
    }
    zero
}

/// First candidate that is present and non-empty.
pub fn resolve_text<'a>(map: &'a FieldMap, alias: &Alias) -> &'a str {
    alias
        .codes
        .iter()
        .filter_map(|code| map.get(code))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Header and row extraction
// ---------------------------------------------------------------------------

/// Stat codes of the header cells, in order. Cells without a code are
/// skipped. The synthetic player-id key is not included.
pub fn header_codes(table: ElementRef<'_>) -> Result<Vec<String>, IngestError> {
    let th = selector("thead tr th")?;
    Ok(table
        .select(&th)
        .filter_map(|cell| cell.value().attr(STAT_ATTR))
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect())
}

/// Map every data row of `table` to a [`FieldMap`].
pub fn map_table(table: ElementRef<'_>) -> Result<Vec<FieldMap>, IngestError> {
    let headers = header_codes(table)?;
    let tr = selector("tbody tr")?;
    let cell = selector("th, td")?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for row in table.select(&tr) {
        let class = row.value().attr("class").unwrap_or_default();
        if class.contains(REPEATED_HEADER_CLASS) {
            continue;
        }

        let mut map = FieldMap::new();
        let mut player_id = None;
        for (i, td) in row.select(&cell).enumerate() {
            if let Some(id) = td.value().attr(ID_ATTR) {
                player_id = Some(id.trim().to_string());
            }
            if let Some(key) = headers.get(i) {
                map.insert(key.as_str(), cell_text(td));
            }
        }

        match player_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                map.insert(PLAYER_ID_KEY, id);
                rows.push(map);
            }
            None => skipped += 1,
        }
    }

    debug!(
        headers = headers.len(),
        rows = rows.len(),
        skipped,
        "Mapped table rows"
    );
    Ok(rows)
}

/// Locate `table#<table_id>` directly, falling back to the copy hidden
/// inside a comment, and map its rows.
pub fn map_table_by_id(
    document: &Html,
    table_id: &str,
    unit: &str,
) -> Result<Vec<FieldMap>, IngestError> {
    let table_sel = selector(&format!("table#{table_id}"))?;
    if let Some(table) = document.select(&table_sel).next() {
        return map_table(table);
    }

    let hidden = find_commented_markup(document, &container_anchor(table_id)).ok_or_else(|| {
        IngestError::StructureMissing {
            unit: unit.to_string(),
            what: format!("table#{table_id} (not visible, no commented copy)"),
        }
    })?;
    debug!(table_id, "Table found inside comment");

    let inner = Html::parse_document(&hidden);
    let table = inner
        .select(&table_sel)
        .next()
        .ok_or_else(|| IngestError::StructureMissing {
            unit: unit.to_string(),
            what: format!("table#{table_id} (absent after un-commenting)"),
        })?;
    map_table(table)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
