//! Season crawl orchestration.
//!
//! A crawl is a sequence of units (one table or one player's shot chart for
//! one season). Each unit is fetched, parsed and written in order; a unit
//! that fails is logged and recorded in the [`CrawlReport`] and the crawl
//! moves on.

use futures::stream::{self, StreamExt};
use scraper::Html;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::pacing::Pacer;
use crate::config::{AppConfig, PacingConfig};
use crate::scrape::coerce::CoercionMode;
use crate::scrape::fetch::PageFetcher;
use crate::scrape::records::{advanced_stat, build_records, total_stat};
use crate::scrape::source::{table_id, SourceUrls};
use crate::scrape::table::{map_table_by_id, FieldMap};
use crate::scrape::tooltip::parse_shot_chart_page;
use crate::storage::{Store, Upsertable};
use crate::types::{
    CrawlReport, CrawlUnit, IngestError, SeasonType, StatTable, Subject, TableKind,
};

/// Season-wide tables in import order.
pub const IMPORT_TABLES: [StatTable; 4] = [
    StatTable { kind: TableKind::Advanced, season_type: SeasonType::Regular },
    StatTable { kind: TableKind::Advanced, season_type: SeasonType::Playoffs },
    StatTable { kind: TableKind::Totals, season_type: SeasonType::Regular },
    StatTable { kind: TableKind::Totals, season_type: SeasonType::Playoffs },
];

/// Drives fetch -> parse -> write for crawl units.
///
/// Holds no mutable state; concurrent crawls on one `Crawler` are fine.
pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    store: Store,
    urls: SourceUrls,
    pacing: PacingConfig,
    pacer: Pacer,
    mode: CoercionMode,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Store,
        urls: SourceUrls,
        pacing: PacingConfig,
        mode: CoercionMode,
    ) -> Self {
        let pacer = Pacer::new(pacing.min_delay());
        Self { fetcher, store, urls, pacing, pacer, mode }
    }

    pub fn from_config(cfg: &AppConfig, fetcher: Arc<dyn PageFetcher>, store: Store) -> Self {
        Self::new(
            fetcher,
            store,
            SourceUrls::new(&cfg.source.base_url),
            cfg.pacing.clone(),
            cfg.parsing.coercion_mode(),
        )
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Single-unit entry points
    // -----------------------------------------------------------------------

    /// Scrape and store one season's advanced table. Returns records written.
    pub async fn ingest_advanced(&self, season: i32, season_type: SeasonType) -> Result<usize, IngestError> {
        let table = StatTable::new(TableKind::Advanced, season_type);
        let unit = CrawlUnit::table(table, season).to_string();
        let rows = self.fetch_table_rows(table, season, &unit).await?;
        let mode = self.mode;
        let records = build_records(&rows, |row| advanced_stat(row, season, season_type, mode));
        self.write(&records, &unit).await
    }

    /// Scrape and store one season's totals table. Returns records written.
    pub async fn ingest_totals(&self, season: i32, season_type: SeasonType) -> Result<usize, IngestError> {
        let table = StatTable::new(TableKind::Totals, season_type);
        let unit = CrawlUnit::table(table, season).to_string();
        let rows = self.fetch_table_rows(table, season, &unit).await?;
        let mode = self.mode;
        let records = build_records(&rows, |row| total_stat(row, season, season_type, mode));
        self.write(&records, &unit).await
    }

    /// Scrape and store one player's shot chart for one season.
    pub async fn ingest_shot_chart(&self, player_id: &str, season: i32) -> Result<usize, IngestError> {
        let unit = CrawlUnit::shot_chart(player_id, season).to_string();
        let url = self.urls.shooting(player_id, season);
        let html = self.fetch_html(&url, self.pacing.shot_chart_base()).await?;

        let page = parse_shot_chart_page(&html, player_id, season, &unit)?;
        if page.malformed > 0 {
            warn!(unit = %unit, malformed = page.malformed, "Some tooltips were skipped");
        }
        self.write(&page.events, &unit).await
    }

    // -----------------------------------------------------------------------
    // Multi-unit entry points
    // -----------------------------------------------------------------------

    /// A player's shot charts from `start` back to `end`, newest first.
    pub async fn ingest_shot_chart_range(
        &self,
        player_id: &str,
        start: i32,
        end: i32,
    ) -> Result<CrawlReport, IngestError> {
        let seasons = descending(start, end)?;
        let units = seasons.map(|season| CrawlUnit::shot_chart(player_id, season)).collect();
        self.crawl(units).await.into_result()
    }

    /// One table over `first..=last`, oldest first.
    pub async fn import_seasons(
        &self,
        table: StatTable,
        first: i32,
        last: i32,
    ) -> Result<CrawlReport, IngestError> {
        let seasons = ascending(first, last)?;
        let units = seasons.map(|season| CrawlUnit::table(table, season)).collect();
        self.crawl(units).await.into_result()
    }

    /// Every season-wide table over `first..=last`: each table's seasons in
    /// turn, in [`IMPORT_TABLES`] order.
    pub async fn import_all(&self, first: i32, last: i32) -> Result<CrawlReport, IngestError> {
        let seasons = ascending(first, last)?;
        let units = IMPORT_TABLES
            .iter()
            .flat_map(|table| seasons.clone().map(|season| CrawlUnit::table(*table, season)))
            .collect();
        self.crawl(units).await.into_result()
    }

    /// Shot charts for every player in the totals table, each from `start`
    /// back to `end`.
    pub async fn crawl_all_shot_charts(&self, start: i32, end: i32) -> Result<CrawlReport, IngestError> {
        let seasons: Vec<i32> = descending(start, end)?.collect();
        let players = self.store.known_player_ids().await?;
        info!(players = players.len(), start, end, "Crawling shot charts for known players");

        let units = players
            .iter()
            .flat_map(|id| seasons.iter().map(move |season| CrawlUnit::shot_chart(id, *season)))
            .collect();
        self.crawl(units).await.into_result()
    }

    /// Run `units` in order, folding each outcome into one report.
    pub async fn crawl(&self, units: Vec<CrawlUnit>) -> CrawlReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("crawl", run_id = %run_id);

        async move {
            info!(units = units.len(), "Crawl started");
            let report = stream::iter(units)
                .fold(CrawlReport::new(run_id), |report, unit| async move {
                    let outcome = self.run_unit(&unit).await;
                    match &outcome {
                        Ok(0) => info!(unit = %unit, "No records found"),
                        Ok(written) => info!(unit = %unit, written, "Unit stored"),
                        Err(e) => warn!(unit = %unit, kind = e.kind(), error = %e, "Unit skipped"),
                    }
                    report.absorb(&unit, outcome)
                })
                .await
                .finish();
            info!(
                attempted = report.units_attempted,
                written = report.records_written,
                failed = report.units_failed,
                "Crawl finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn run_unit(&self, unit: &CrawlUnit) -> Result<usize, IngestError> {
        match &unit.subject {
            Subject::Table(table) => match table.kind {
                TableKind::Advanced => self.ingest_advanced(unit.season, table.season_type).await,
                TableKind::Totals => self.ingest_totals(unit.season, table.season_type).await,
            },
            Subject::ShotChart { player_id } => self.ingest_shot_chart(player_id, unit.season).await,
        }
    }

    // -----------------------------------------------------------------------
    // Fetch / write helpers
    // -----------------------------------------------------------------------

    /// Pace, fetch and require a 200.
    async fn fetch_html(&self, url: &str, base: std::time::Duration) -> Result<String, IngestError> {
        self.pacer.pause(base).await;
        let page = self.fetcher.fetch(url).await?;
        if !page.is_ok() {
            return Err(IngestError::Status { url: url.to_string(), status: page.status });
        }
        Ok(page.text().into_owned())
    }

    async fn fetch_table_rows(
        &self,
        table: StatTable,
        season: i32,
        unit: &str,
    ) -> Result<Vec<FieldMap>, IngestError> {
        let url = self.urls.table(table, season);
        let html = self.fetch_html(&url, self.pacing.table_base(table)).await?;
        let document = Html::parse_document(&html);
        map_table_by_id(&document, table_id(table), unit)
    }

    async fn write<T: Upsertable>(&self, records: &[T], unit: &str) -> Result<usize, IngestError> {
        if records.is_empty() {
            return Ok(0);
        }
        self.store.upsert(records, unit).await
    }
}

fn ascending(first: i32, last: i32) -> Result<std::ops::RangeInclusive<i32>, IngestError> {
    if first > last {
        return Err(IngestError::InvalidRange { start: first, end: last });
    }
    Ok(first..=last)
}

fn descending(start: i32, end: i32) -> Result<std::iter::Rev<std::ops::RangeInclusive<i32>>, IngestError> {
    if start < end {
        return Err(IngestError::InvalidRange { start, end });
    }
    Ok((end..=start).rev())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
