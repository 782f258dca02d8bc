//! Wire types for the upstream scoreboard payload.
//!
//! The payload is ESPN-shaped. Only the fields the widget consumes are
//! modelled; everything else is ignored. Identifiers and scores arrive as
//! either JSON numbers or strings depending on the source, so they go through
//! [`Loose`].

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDateTime, Utc};
use itertools::Itertools;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, WidgetError};
use crate::model::{
    Competitor, FormResult, MatchEvent, MatchRecord, MatchStatus, Season, Side,
};

/// A scalar that may be sent as a JSON number or a JSON string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(serde_json::Number),
    Text(String),
}

impl Display for Loose {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Loose::Number(n) => write!(f, "{}", number_text(n)),
            Loose::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Whole-valued floats print without a fraction, so `55.0` reads `55`.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// Whether a raw event's `id` has the string form `match_id`.
fn id_matches(event: &serde_json::Value, match_id: &str) -> bool {
    match event.get("id") {
        Some(serde_json::Value::Number(n)) => number_text(n) == match_id,
        Some(serde_json::Value::String(s)) => s == match_id,
        _ => false,
    }
}

impl Loose {
    /// Whether this value's string form equals `other`.
    pub fn matches(&self, other: &str) -> bool {
        match self {
            Loose::Number(n) => number_text(n) == other,
            Loose::Text(s) => s == other,
        }
    }

    fn as_score(&self) -> Option<u32> {
        match self {
            Loose::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Loose::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Top-level response of both data sources.
///
/// Events stay undecoded until one is picked by id, so an odd sibling event
/// never spoils the lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

impl FeedResponse {
    /// Take and decode the event whose identifier string-equals `match_id`.
    ///
    /// Fails only when that event itself cannot be decoded.
    pub fn take_event(self, match_id: &str) -> Result<Option<FeedEvent>> {
        self.events
            .into_iter()
            .find(|e| id_matches(e, match_id))
            .map(|raw| {
                serde_json::from_value(raw).map_err(|e| WidgetError::MalformedEvent {
                    match_id: match_id.to_owned(),
                    source: e,
                })
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEvent {
    pub id: Option<Loose>,
    pub date: Option<String>,
    pub status: Option<FeedStatus>,
    pub season: Option<FeedSeason>,
    #[serde(default)]
    pub competitions: Vec<FeedCompetition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub display_clock: Option<String>,
    pub clock: Option<Loose>,
    #[serde(rename = "type")]
    pub type_field: Option<FeedStatusType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedStatusType {
    /// `"pre"`, `"in"` or `"post"`.
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSeason {
    pub year: Option<i32>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedCompetition {
    #[serde(default)]
    pub competitors: Vec<FeedCompetitor>,
    pub details: Option<FeedDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCompetitor {
    pub home_away: Option<String>,
    pub team: Option<FeedTeam>,
    pub score: Option<Loose>,
    pub form: Option<String>,
    #[serde(default)]
    pub statistics: Vec<FeedStatistic>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedTeam {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatistic {
    pub name: Option<String>,
    pub display_value: Option<String>,
    pub value: Option<Loose>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedDetails {
    #[serde(default)]
    pub events: Vec<FeedDetailEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedDetailEvent {
    pub id: Option<Loose>,
    pub clock: Option<FeedClock>,
    pub text: Option<String>,
    pub description: Option<String>,
}

/// Event clocks come as text, a bare number, or an object with a display value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeedClock {
    Plain(Loose),
    #[serde(rename_all = "camelCase")]
    Detailed { display_value: Option<String> },
}

impl FeedEvent {
    /// Convert into a [`MatchRecord`] for `league_id`.
    ///
    /// Fails when the event has no identifier, no competition, or does not
    /// carry exactly one home and one away competitor.
    pub fn into_record(self, league_id: &str) -> Result<MatchRecord> {
        let match_id = self
            .id
            .as_ref()
            .map(Loose::to_string)
            .ok_or(WidgetError::InvalidRecord {
                context: "event without id",
            })?;

        let competition = self
            .competitions
            .into_iter()
            .next()
            .ok_or(WidgetError::InvalidRecord {
                context: "event without competition",
            })?;

        let (homes, aways): (Vec<_>, Vec<_>) = competition
            .competitors
            .into_iter()
            .filter_map(|c| parse_side(c.home_away.as_deref()).map(|side| (side, c)))
            .partition(|(side, _)| *side == Side::Home);
        let home = exactly_one(homes, "expected exactly one home competitor")?;
        let away = exactly_one(aways, "expected exactly one away competitor")?;

        let events = competition
            .details
            .map(|d| d.events.into_iter().map(parse_detail_event).collect_vec())
            .unwrap_or_default();

        let kickoff = self.date.as_deref().and_then(parse_kickoff);

        Ok(MatchRecord {
            match_id,
            league_id: league_id.to_string(),
            home: parse_competitor(Side::Home, home),
            away: parse_competitor(Side::Away, away),
            status: parse_status(self.status),
            kickoff,
            events,
            season: self.season.map(|s| Season {
                year: s.year,
                slug: s.slug,
            }),
        })
    }
}

fn parse_side(home_away: Option<&str>) -> Option<Side> {
    match home_away {
        Some("home") => Some(Side::Home),
        Some("away") => Some(Side::Away),
        _ => None,
    }
}

fn exactly_one(
    mut entries: Vec<(Side, FeedCompetitor)>,
    context: &'static str,
) -> Result<FeedCompetitor> {
    match entries.len() {
        1 => Ok(entries.remove(0).1),
        _ => Err(WidgetError::InvalidRecord { context }),
    }
}

fn parse_competitor(side: Side, competitor: FeedCompetitor) -> Competitor {
    let (name, logo_url) = competitor
        .team
        .map(|t| (t.name.or(t.display_name), t.logo))
        .unwrap_or_default();

    let recent_form = competitor
        .form
        .unwrap_or_default()
        .chars()
        .filter_map(|c| c.to_string().parse::<FormResult>().ok())
        .collect_vec();

    // A later duplicate name replaces an earlier one.
    let mut statistics = BTreeMap::new();
    for stat in competitor.statistics {
        let value = stat
            .display_value
            .or_else(|| stat.value.as_ref().map(Loose::to_string));
        if let (Some(name), Some(value)) = (stat.name, value) {
            statistics.insert(name, value);
        }
    }

    Competitor {
        side,
        name,
        logo_url,
        score: competitor.score.as_ref().and_then(Loose::as_score),
        recent_form,
        statistics,
    }
}

fn parse_status(status: Option<FeedStatus>) -> MatchStatus {
    let Some(status) = status else {
        return MatchStatus::Scheduled;
    };
    let state = status.type_field.and_then(|t| t.state);
    match state.as_deref() {
        Some("in") => MatchStatus::Live {
            clock: status
                .display_clock
                .or_else(|| status.clock.as_ref().map(Loose::to_string)),
        },
        Some("post") => MatchStatus::Completed,
        _ => MatchStatus::Scheduled,
    }
}

fn parse_detail_event(event: FeedDetailEvent) -> MatchEvent {
    let clock = event.clock.and_then(|c| match c {
        FeedClock::Plain(value) => Some(value.to_string()),
        FeedClock::Detailed { display_value } => display_value,
    });
    MatchEvent {
        id: event.id.as_ref().map(Loose::to_string),
        clock,
        description: event.text.or(event.description),
    }
}

/// Kickoff times come as full RFC 3339 or in the minute-precision form
/// `2024-08-17T11:30Z`.
fn parse_kickoff(date: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%MZ") {
        Ok(dt) => Some(dt.and_utc()),
        Err(e) => {
            debug!(date, error = %e, "unparseable kickoff time");
            None
        }
    }
}
