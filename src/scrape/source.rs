//! URL layout of the reference site and where each table lives.

use crate::types::{SeasonType, StatTable, TableKind};

pub const DEFAULT_BASE_URL: &str = "https://www.basketball-reference.com";

/// Element id of the stat table on a season page.
pub fn table_id(table: StatTable) -> &'static str {
    match (table.kind, table.season_type) {
        (TableKind::Advanced, SeasonType::Regular) => "advanced",
        (TableKind::Advanced, SeasonType::Playoffs) => "advanced_stats",
        (TableKind::Totals, _) => "totals_stats",
    }
}

/// Builds page URLs against a configurable base.
#[derive(Debug, Clone)]
pub struct SourceUrls {
    base: String,
}

impl SourceUrls {
    pub fn new(base: &str) -> Self {
        Self { base: base.trim_end_matches('/').to_string() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Season-wide page for `table`.
    pub fn table(&self, table: StatTable, season: i32) -> String {
        let section = match table.season_type {
            SeasonType::Regular => "leagues",
            SeasonType::Playoffs => "playoffs",
        };
        format!("{}/{section}/NBA_{season}_{}.html", self.base, table.kind)
    }

    /// A player's shooting page for one season. Player pages are bucketed
    /// by the first letter of the id.
    pub fn shooting(&self, player_id: &str, season: i32) -> String {
        let bucket: String = player_id.chars().take(1).collect();
        format!(
            "{}/players/{}/{}/shooting/{season}",
            self.base,
            urlencoding::encode(&bucket),
            urlencoding::encode(player_id),
        )
    }
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_urls() {
        let urls = SourceUrls::new("https://bbref.test/");
        let adv = StatTable::new(TableKind::Advanced, SeasonType::Regular);
        let tot_po = StatTable::new(TableKind::Totals, SeasonType::Playoffs);
        assert_eq!(urls.table(adv, 2022), "https://bbref.test/leagues/NBA_2022_advanced.html");
        assert_eq!(urls.table(tot_po, 2019), "https://bbref.test/playoffs/NBA_2019_totals.html");
    }

    #[test]
    fn test_shooting_url() {
        let urls = SourceUrls::default();
        assert_eq!(
            urls.shooting("curryst01", 2016),
            "https://www.basketball-reference.com/players/c/curryst01/shooting/2016"
        );
    }

    #[test]
    fn test_table_ids() {
        let id = |k, s| table_id(StatTable::new(k, s));
        assert_eq!(id(TableKind::Advanced, SeasonType::Regular), "advanced");
        assert_eq!(id(TableKind::Advanced, SeasonType::Playoffs), "advanced_stats");
        assert_eq!(id(TableKind::Totals, SeasonType::Regular), "totals_stats");
        assert_eq!(id(TableKind::Totals, SeasonType::Playoffs), "totals_stats");
    }
}
