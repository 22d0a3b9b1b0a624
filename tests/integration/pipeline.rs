//! Full pipeline runs against the mock fetcher and an in-memory store.

use std::sync::Arc;

use courtside::config::PacingConfig;
use courtside::engine::Crawler;
use courtside::scrape::coerce::CoercionMode;
use courtside::scrape::source::SourceUrls;
use courtside::storage::Store;
use courtside::types::{
    AdvancedStat, IngestError, SeasonType, ShotEvent, StatKey, StatTable, TableKind, TotalStat,
};

use crate::mock_fetcher::{advanced_playoffs_page, shooting_page, shot, totals_page, MockFetcher};

const BASE: &str = "https://bbref.test";

async fn setup(mode: CoercionMode) -> (MockFetcher, Store, Crawler) {
    let fetcher = MockFetcher::new();
    let store = Store::in_memory().await.unwrap();
    let crawler = Crawler::new(
        Arc::new(fetcher.clone()),
        store.clone(),
        SourceUrls::new(BASE),
        PacingConfig::none(),
        mode,
    );
    (fetcher, store, crawler)
}

fn key(player_id: &str, season: i32, team: &str, is_playoff: bool) -> StatKey {
    StatKey { player_id: player_id.into(), season, team: team.into(), is_playoff }
}

#[tokio::test]
async fn test_hidden_totals_table_is_stored() {
    let (fetcher, store, crawler) = setup(CoercionMode::Lenient).await;
    fetcher.serve(
        &format!("{BASE}/playoffs/NBA_2022_totals.html"),
        totals_page(
            &[
                ("curryst01", "Stephen Curry", "GSW", "22", "598"),
                ("doncilu01", "Luka Dončić", "DAL", "15", "490"),
            ],
            true,
        ),
    );

    let written = crawler.ingest_totals(2022, SeasonType::Playoffs).await.unwrap();
    assert_eq!(written, 2);

    let curry = store.total_stat(&key("curryst01", 2022, "GSW", true)).await.unwrap().unwrap();
    assert_eq!(curry.player_name, "Stephen Curry");
    assert_eq!(curry.external_id, 1);
    assert_eq!(curry.games, 22);
    assert_eq!(curry.games_started, 22);
    assert_eq!(curry.points, 598);
    assert!((curry.field_percent - 0.48).abs() < 1e-9);
    assert_eq!(curry.steals, 0);
}

#[tokio::test]
async fn test_rescrape_overwrites_without_duplicating() {
    let (fetcher, store, crawler) = setup(CoercionMode::Lenient).await;
    let url = format!("{BASE}/leagues/NBA_2021_totals.html");

    fetcher.serve(&url, totals_page(&[("jamesle01", "LeBron James", "LAL", "40", "1000")], false));
    crawler.ingest_totals(2021, SeasonType::Regular).await.unwrap();

    fetcher.serve(&url, totals_page(&[("jamesle01", "LeBron James", "LAL", "45", "1126")], false));
    crawler.ingest_totals(2021, SeasonType::Regular).await.unwrap();

    assert_eq!(store.count::<TotalStat>().await.unwrap(), 1);
    let row = store.total_stat(&key("jamesle01", 2021, "LAL", false)).await.unwrap().unwrap();
    assert_eq!(row.games, 45);
    assert_eq!(row.points, 1126);
}

#[tokio::test]
async fn test_playoff_advanced_uses_its_own_table_id() {
    let (fetcher, store, crawler) = setup(CoercionMode::Lenient).await;
    fetcher.serve(
        &format!("{BASE}/playoffs/NBA_2019_advanced.html"),
        advanced_playoffs_page("leonaka01", "Kawhi Leonard", "TOR", "28.6"),
    );

    assert_eq!(crawler.ingest_advanced(2019, SeasonType::Playoffs).await.unwrap(), 1);
    let row = store.advanced_stat(&key("leonaka01", 2019, "TOR", true)).await.unwrap().unwrap();
    assert_eq!(row.player_name, "Kawhi Leonard");
    assert_eq!(row.position, "PG");
    assert_eq!(row.games, 18);
    assert!((row.per - 28.6).abs() < 1e-9);
    assert!((row.win_shares - 3.1).abs() < 1e-9);
    assert_eq!(store.count::<AdvancedStat>().await.unwrap(), 1);
}

#[tokio::test]
async fn test_strict_mode_drops_rows_with_placeholders() {
    let (fetcher, store, crawler) = setup(CoercionMode::Strict).await;
    fetcher.serve(
        &format!("{BASE}/leagues/NBA_2020_totals.html"),
        totals_page(
            &[
                ("hardeja01", "James Harden", "HOU", "68", "2335"),
                ("zionwi01", "Zion Williamson", "NOP", "24", "n/a"),
            ],
            false,
        ),
    );

    assert_eq!(crawler.ingest_totals(2020, SeasonType::Regular).await.unwrap(), 1);
    assert!(store.total_stat(&key("zionwi01", 2020, "NOP", false)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_shot_chart_range_with_gaps() {
    let (fetcher, store, crawler) = setup(CoercionMode::Lenient).await;
    let page_2016 = shooting_page(
        "Stephen Curry",
        &[
            shot("Oct 27, 2015", "1st Qtr, 11:02 remaining", true, 25, "3-0", 50, 100),
            shot("Oct 27, 2015", "1st Qtr, 9:40 remaining", false, 28, "5-6", 40, 320),
            shot("Oct 27, 2015", "2nd Qtr, 0:01 remaining", true, 31, "60-58", 10, 240),
        ],
    );
    fetcher
        .serve(&format!("{BASE}/players/c/curryst01/shooting/2016"), page_2016)
        .fail(&format!("{BASE}/players/c/curryst01/shooting/2014"));

    let report = crawler.ingest_shot_chart_range("curryst01", 2016, 2014).await.unwrap();

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].ends_with("/2016"));
    assert!(requests[2].ends_with("/2014"));

    assert_eq!(report.units_attempted, 3);
    assert_eq!(report.units_with_records, 1);
    assert_eq!(report.units_failed, 2);
    assert_eq!(report.records_written, 3);
    assert!(report.finished_at.is_some());

    let events = store.shot_events("curryst01", 2016).await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].date, "Oct 27,2015");
    assert_eq!(events[0].team, "GSW");
    assert_eq!(events[0].opponent, "LAL");
    assert!(events[0].made);
    assert!(!events[1].made);
    assert!(!events[1].lead());
    assert_eq!(events[2].quarter, "2nd Qtr");
    assert_eq!(events[2].distance_ft, 31);
}

#[tokio::test]
async fn test_shot_chart_rescrape_is_idempotent() {
    let (fetcher, store, crawler) = setup(CoercionMode::Lenient).await;
    let url = format!("{BASE}/players/h/hardeja01/shooting/2022");
    let shots = vec![
        shot("Oct 20, 2021", "1st Qtr, 10:15 remaining", true, 12, "20-18", 120, 200),
        shot("Oct 20, 2021", "1st Qtr, 10:15 remaining", true, 12, "20-18", 120, 200),
        shot("Oct 22, 2021", "4th Qtr, 1:05 remaining", false, 24, "99-101", 30, 420),
    ];
    fetcher.serve(&url, shooting_page("James Harden", &shots));

    assert_eq!(crawler.ingest_shot_chart("hardeja01", 2022).await.unwrap(), 2);
    assert_eq!(crawler.ingest_shot_chart("hardeja01", 2022).await.unwrap(), 2);
    assert_eq!(store.count::<ShotEvent>().await.unwrap(), 2);
}

#[tokio::test]
async fn test_all_seasons_failing_is_an_error() {
    let (_fetcher, _store, crawler) = setup(CoercionMode::Lenient).await;
    let err = crawler.ingest_shot_chart_range("nobody01", 2020, 2019).await.unwrap_err();
    let IngestError::NothingWritten(report) = err else {
        panic!("expected NothingWritten, got {err:?}");
    };
    assert_eq!((report.units_attempted, report.units_failed), (2, 2));
    assert!(report.skipped.iter().all(|s| s.reason.contains("404")));
}

#[tokio::test]
async fn test_import_then_crawl_known_players() {
    let (fetcher, store, crawler) = setup(CoercionMode::Lenient).await;
    fetcher.serve(
        &format!("{BASE}/leagues/NBA_2023_totals.html"),
        totals_page(
            &[
                ("embiijo01", "Joel Embiid", "PHI", "66", "2183"),
                ("tatumja01", "Jayson Tatum", "BOS", "74", "2225"),
            ],
            false,
        ),
    );
    let totals = StatTable::new(TableKind::Totals, SeasonType::Regular);
    let report = crawler.import_seasons(totals, 2023, 2023).await.unwrap();
    assert_eq!(report.records_written, 2);

    fetcher.serve(
        &format!("{BASE}/players/t/tatumja01/shooting/2023"),
        shooting_page(
            "Jayson Tatum",
            &[shot("Oct 18, 2022", "1st Qtr, 11:40 remaining", true, 24, "3-0", 60, 90)],
        ),
    );

    let report = crawler.crawl_all_shot_charts(2023, 2023).await.unwrap();
    assert_eq!(report.units_attempted, 2);
    assert_eq!(report.units_with_records, 1);
    assert_eq!(report.units_failed, 1);

    let events = store.shot_events("tatumja01", 2023).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].player_name, "Jayson Tatum");
}

#[tokio::test]
async fn test_rejected_write_skips_only_that_season() {
    let (fetcher, store, crawler) = setup(CoercionMode::Lenient).await;
    sqlx::query(
        r#"CREATE TRIGGER "reject_2021" BEFORE INSERT ON "total_stats"
           WHEN NEW."season" = 2021
           BEGIN SELECT RAISE(ABORT, 'season locked'); END"#,
    )
    .execute(store.pool())
    .await
    .unwrap();

    for season in [2020, 2021] {
        fetcher.serve(
            &format!("{BASE}/leagues/NBA_{season}_totals.html"),
            totals_page(&[("lillada01", "Damian Lillard", "POR", "66", "1866")], false),
        );
    }

    let totals = StatTable::new(TableKind::Totals, SeasonType::Regular);
    let report = crawler.import_seasons(totals, 2020, 2021).await.unwrap();

    assert_eq!(report.units_attempted, 2);
    assert_eq!(report.units_with_records, 1);
    assert_eq!(report.units_failed, 1);
    assert_eq!(report.records_written, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].unit, "totals regular 2021");
    assert!(report.skipped[0].reason.contains("Write failed"));

    assert!(store.total_stat(&key("lillada01", 2020, "POR", false)).await.unwrap().is_some());
    assert!(store.total_stat(&key("lillada01", 2021, "POR", false)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reversed_import_range_is_rejected() {
    let (fetcher, _store, crawler) = setup(CoercionMode::Lenient).await;
    let table = StatTable::new(TableKind::Advanced, SeasonType::Regular);
    let err = crawler.import_seasons(table, 2022, 2017).await.unwrap_err();
    assert!(matches!(err, IngestError::InvalidRange { start: 2022, end: 2017 }));
    assert!(fetcher.requests().is_empty());
}
