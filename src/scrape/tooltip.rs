//! Shot-chart tooltip parsing.
//!
//! Each shot marker carries a `tip` attribute of four `<br>`-separated
//! segments and a `style` attribute with its court position:
//!
//! ```text
//! tip   = "Oct 20, 2021, CHI at DET<br>1st Qtr, 10:15 remaining<br>Made 2-pointer from 12 ft<br>CHI now leads 20-18"
//! style = "top:120px;left:200px"
//! ```
//!
//! A malformed tooltip is an error for that event only; the page
//! collector skips it and keeps going.

use std::collections::HashSet;

use scraper::Html;
use tracing::{debug, warn};

use super::coerce::coerce_int;
use super::comment::{find_commented_markup, SHOT_CHART_ANCHOR};
use super::selector;
use crate::types::{IngestError, ShotEvent};

/// Separator between tooltip segments.
pub const SEGMENT_DELIMITER: &str = "<br>";

const PLAYER_NAME_CSS: &str = "#meta span[itemprop='name']";
const WRAPPER_CSS: &str = "div#div_shot-chart div#shot-wrapper";
const MARKER_CSS: &str = "div.tooltip.make, div.tooltip.miss";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a single tooltip could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TooltipError {
    #[error("tooltip has {found} segments, segment {missing} missing")]
    MissingSegment { missing: usize, found: usize },

    #[error("segment {segment} lacks {expected}: {text:?}")]
    Malformed {
        segment: usize,
        expected: &'static str,
        text: String,
    },

    #[error("style lacks {property}: {style:?}")]
    Position { property: &'static str, style: String },
}

// ---------------------------------------------------------------------------
// Single tooltip
// ---------------------------------------------------------------------------

/// Fields parsed from one tooltip, before the player/season context is
/// attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedShot {
    pub date: String,
    pub team: String,
    pub opponent: String,
    pub quarter: String,
    pub time_remaining: String,
    pub made: bool,
    pub shot_type: String,
    pub distance_ft: i32,
    pub team_score: i32,
    pub opponent_score: i32,
    pub top: i32,
    pub left: i32,
}

impl ParsedShot {
    pub fn lead(&self) -> bool {
        self.team_score > self.opponent_score
    }

    pub fn into_event(self, player_id: &str, player_name: &str, season: i32) -> ShotEvent {
        ShotEvent {
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
            season,
            date: self.date,
            quarter: self.quarter,
            time_remaining: self.time_remaining,
            top: self.top,
            left: self.left,
            made: self.made,
            shot_type: self.shot_type,
            distance_ft: self.distance_ft,
            team_score: self.team_score,
            opponent_score: self.opponent_score,
            team: self.team,
            opponent: self.opponent,
        }
    }
}

/// Parse one tooltip and its position style.
pub fn parse_tooltip(tip: &str, style: &str) -> Result<ParsedShot, TooltipError> {
    let segments: Vec<&str> = tip.split(SEGMENT_DELIMITER).collect();
    let segment = |i: usize| {
        segments
            .get(i)
            .copied()
            .ok_or(TooltipError::MissingSegment { missing: i + 1, found: segments.len() })
    };

    let (date, team, opponent) = parse_game(segment(0)?)?;
    let (quarter, time_remaining) = parse_clock(segment(1)?)?;
    let (made, shot_type, distance_ft) = parse_shot(segment(2)?)?;
    let (team_score, opponent_score) = parse_score(segment(3)?)?;
    let (top, left) = parse_position(style)?;

    Ok(ParsedShot {
        date,
        team,
        opponent,
        quarter,
        time_remaining,
        made,
        shot_type,
        distance_ft,
        team_score,
        opponent_score,
        top,
        left,
    })
}

/// `"Oct 20, 2021, CHI at DET"` -> ("Oct 20,2021", "CHI", "DET").
fn parse_game(text: &str) -> Result<(String, String, String), TooltipError> {
    let parts: Vec<&str> = text.splitn(3, ", ").collect();
    if parts.len() < 2 {
        return Err(TooltipError::Malformed {
            segment: 1,
            expected: "\", \" between date and year",
            text: text.to_string(),
        });
    }
    let date = format!("{},{}", parts[0], parts[1]);

    let (team, opponent) = match parts.get(2) {
        Some(game) => game
            .split_once(" at ")
            .or_else(|| game.split_once(" vs "))
            .map(|(t, o)| (t.to_string(), o.to_string()))
            .unwrap_or_default(),
        None => Default::default(),
    };
    Ok((date, team, opponent))
}

/// `"1st Qtr, 10:15 remaining"` -> ("1st Qtr", "10:15").
fn parse_clock(text: &str) -> Result<(String, String), TooltipError> {
    let (quarter, rest) = text.split_once(',').ok_or_else(|| TooltipError::Malformed {
        segment: 2,
        expected: "',' after the quarter",
        text: text.to_string(),
    })?;
    let time = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| TooltipError::Malformed {
            segment: 2,
            expected: "time remaining",
            text: text.to_string(),
        })?;
    Ok((quarter.to_string(), time.to_string()))
}

/// `"Made 2-pointer from 12 ft"` -> (true, "2-pointer", 12).
fn parse_shot(text: &str) -> Result<(bool, String, i32), TooltipError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(TooltipError::Malformed {
            segment: 3,
            expected: "result and shot type",
            text: text.to_string(),
        });
    }
    let made = tokens[0] == "Made";
    let distance = coerce_int(tokens[tokens.len() - 2]).value;
    Ok((made, tokens[1].to_string(), distance))
}

/// `"CHI now leads 20-18"` -> (20, 18).
fn parse_score(text: &str) -> Result<(i32, i32), TooltipError> {
    let malformed = || TooltipError::Malformed {
        segment: 4,
        expected: "\"{team}-{opponent}\" score",
        text: text.to_string(),
    };
    let last = text.split_whitespace().last().ok_or_else(malformed)?;
    let (team, opponent) = last.split_once('-').ok_or_else(malformed)?;
    Ok((coerce_int(team).value, coerce_int(opponent).value))
}

/// `"top:120px;left:200px"` -> (120, 200).
fn parse_position(style: &str) -> Result<(i32, i32), TooltipError> {
    let property = |name: &'static str| {
        style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .find(|(k, _)| k.trim() == name)
            .map(|(_, v)| coerce_int(v.trim().trim_end_matches("px")).value)
            .ok_or_else(|| TooltipError::Position { property: name, style: style.to_string() })
    };
    Ok((property("top")?, property("left")?))
}

// ---------------------------------------------------------------------------
// Page collection
// ---------------------------------------------------------------------------

/// Everything read from one player's shot-chart page for one season.
#[derive(Debug, Clone, Default)]
pub struct ShotChartPage {
    pub player_name: String,
    pub events: Vec<ShotEvent>,
    /// Tooltips skipped as malformed.
    pub malformed: usize,
    /// Markers dropped because the same event was already collected.
    pub duplicates: usize,
}

/// Display name from the page header, or `player_id` when absent.
pub fn player_display_name(document: &Html, player_id: &str) -> Result<String, IngestError> {
    let sel = selector(PLAYER_NAME_CSS)?;
    let name = document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| player_id.to_string());
    Ok(name)
}

/// Parse all shot markers on a player's shooting page.
///
/// The chart is normally hidden in a comment; a directly visible chart is
/// used as-is.
pub fn parse_shot_chart_page(
    html: &str,
    player_id: &str,
    season: i32,
    unit: &str,
) -> Result<ShotChartPage, IngestError> {
    let document = Html::parse_document(html);
    let player_name = player_display_name(&document, player_id)?;
    let wrapper_sel = selector(WRAPPER_CSS)?;

    let hidden;
    let chart = if document.select(&wrapper_sel).next().is_some() {
        &document
    } else {
        let markup = find_commented_markup(&document, SHOT_CHART_ANCHOR).ok_or_else(|| {
            IngestError::StructureMissing {
                unit: unit.to_string(),
                what: "shot-chart comment block".to_string(),
            }
        })?;
        hidden = Html::parse_document(&markup);
        &hidden
    };

    let wrapper = chart
        .select(&wrapper_sel)
        .next()
        .ok_or_else(|| IngestError::StructureMissing {
            unit: unit.to_string(),
            what: "div#shot-wrapper".to_string(),
        })?;

    let marker_sel = selector(MARKER_CSS)?;
    let mut page = ShotChartPage { player_name, ..Default::default() };
    let mut seen = HashSet::new();

    for (index, marker) in wrapper.select(&marker_sel).enumerate() {
        let tip = marker.value().attr("tip").unwrap_or_default();
        let style = marker.value().attr("style").unwrap_or_default();

        let shot = match parse_tooltip(tip, style) {
            Ok(shot) => shot,
            Err(e) => {
                warn!(player_id, season, index, error = %e, "Skipping malformed tooltip");
                page.malformed += 1;
                continue;
            }
        };

        let event = shot.into_event(player_id, &page.player_name, season);
        if !seen.insert(event.key()) {
            page.duplicates += 1;
            continue;
        }
        page.events.push(event);
    }

    debug!(
        player_id,
        season,
        events = page.events.len(),
        malformed = page.malformed,
        duplicates = page.duplicates,
        "Parsed shot chart"
    );
    Ok(page)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
