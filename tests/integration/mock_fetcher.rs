//! Mock fetcher for integration testing.
//!
//! Serves canned HTML by exact URL and records every request. Unknown URLs
//! answer 404, like the real site does for seasons a player never played.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use courtside::scrape::fetch::{PageFetcher, RawPage};
use courtside::types::IngestError;

#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`, replacing any previous page.
    pub fn serve(&self, url: &str, html: impl Into<String>) -> &Self {
        self.pages.lock().unwrap().insert(url.to_string(), html.into());
        self
    }

    /// Make `url` fail at the transport level.
    pub fn fail(&self, url: &str) -> &Self {
        self.failing.lock().unwrap().push(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, IngestError> {
        self.requests.lock().unwrap().push(url.to_string());

        if self.failing.lock().unwrap().iter().any(|u| u == url) {
            return Err(IngestError::Fetch {
                url: url.to_string(),
                message: "connection reset by peer".into(),
            });
        }

        let page = match self.pages.lock().unwrap().get(url) {
            Some(html) => RawPage::ok(url, html.as_bytes()),
            None => RawPage { url: url.to_string(), status: 404, body: b"Page Not Found".to_vec() },
        };
        Ok(page)
    }
}

// ---------------------------------------------------------------------------
// Page builders
// ---------------------------------------------------------------------------

/// A totals row: (player id, name, team, games, points).
pub type TotalsRow<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str);

/// A season totals page with the table hidden in a comment, as the site
/// serves playoff pages.
pub fn totals_page(rows: &[TotalsRow<'_>], hidden: bool) -> String {
    let body: String = rows
        .iter()
        .enumerate()
        .map(|(i, (id, name, team, games, pts))| {
            format!(
                r#"<tr><th data-stat="ranker">{rank}</th>
                <td data-stat="name_display" data-append-csv="{id}">{name}</td>
                <td data-stat="team_name_abbr">{team}</td>
                <td data-stat="g">{games}</td>
                <td data-stat="gs">{games}</td>
                <td data-stat="fg_pct">.480</td>
                <td data-stat="pts">{pts}</td></tr>"#,
                rank = i + 1
            )
        })
        .collect();

    let table = format!(
        r#"<div class="table_container" id="div_totals_stats">
        <table id="totals_stats"><thead><tr>
          <th data-stat="ranker">Rk</th><th data-stat="name_display">Player</th>
          <th data-stat="team_name_abbr">Team</th><th data-stat="g">G</th>
          <th data-stat="gs">GS</th><th data-stat="fg_pct">FG%</th><th data-stat="pts">PTS</th>
        </tr></thead><tbody>{body}
          <tr><th></th><td>League Average</td><td></td><td>52</td><td>24</td><td>.471</td><td>650</td></tr>
        </tbody></table></div>"#
    );
    let table = if hidden { format!("<!--{table}-->") } else { table };
    format!(r#"<html><body><div id="all_totals_stats">{table}</div></body></html>"#)
}

/// A playoff advanced page (table id `advanced_stats`) using the older
/// column codes.
pub fn advanced_playoffs_page(player_id: &str, name: &str, team: &str, per: &str) -> String {
    format!(
        r#"<html><body><div id="all_advanced_stats"><!--
        <div class="table_container" id="div_advanced_stats">
        <table id="advanced_stats"><thead><tr>
          <th data-stat="rk">Rk</th><th data-stat="player">Player</th><th data-stat="pos">Pos</th>
          <th data-stat="team_id">Tm</th><th data-stat="games">G</th><th data-stat="per">PER</th>
          <th data-stat="ws">WS</th>
        </tr></thead><tbody>
          <tr><th>1</th><td data-append-csv="{player_id}">{name}</td><td>PG</td>
              <td>{team}</td><td>18</td><td>{per}</td><td>3.1</td></tr>
        </tbody></table></div>
        --></div></body></html>"#
    )
}

/// A shooting page with `shots` hidden in the usual comment block.
/// Each shot is (tip text with `<br>` separators, style).
pub fn shooting_page(name: &str, shots: &[(String, String)]) -> String {
    let markers: String = shots
        .iter()
        .map(|(tip, style)| {
            let class = if tip.contains("Made") { "make" } else { "miss" };
            let tip = tip.replace('<', "&lt;").replace('>', "&gt;");
            format!(r#"<div class="tooltip {class}" style="{style}" tip="{tip}">&#215;</div>"#)
        })
        .collect();
    format!(
        r#"<html><body><div id="meta"><h1><span itemprop="name">{name}</span></h1></div>
        <div id="all_shot-chart"><!--
          <div id="div_shot-chart"><div id="shot-wrapper">{markers}</div></div>
        --></div></body></html>"#
    )
}

pub fn shot(date: &str, clock: &str, made: bool, feet: u32, score: &str, top: u32, left: u32) -> (String, String) {
    let result = if made { "Made" } else { "Missed" };
    (
        format!("{date}, GSW at LAL<br>{clock}<br>{result} 3-pointer from {feet} ft<br>GSW now leads {score}"),
        format!("top:{top}px;left:{left}px"),
    )
}
