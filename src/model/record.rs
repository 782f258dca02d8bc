use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A single football match as resolved from a data source or the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub league_id: String,
    pub home: Competitor,
    pub away: Competitor,
    pub status: MatchStatus,
    pub kickoff: Option<DateTime<Utc>>,
    pub events: Vec<MatchEvent>,
    pub season: Option<Season>,
}

impl MatchRecord {
    /// Keep only the events whose identifier equals `sub_event_id`.
    ///
    /// An empty event list is left untouched; a non-empty one may end up empty.
    pub fn retain_sub_event(&mut self, sub_event_id: &str) {
        if self.events.is_empty() {
            return;
        }
        self.events
            .retain(|event| event.id.as_deref() == Some(sub_event_id));
    }

    /// Statistics of both sides merged by name.
    ///
    /// Rows are sorted by name within each side: the home side's names
    /// first, then names only the away side reports. A side without the stat
    /// yields `None`.
    pub fn stat_rows(&self) -> Vec<StatRow> {
        self.home
            .statistics
            .keys()
            .chain(self.away.statistics.keys())
            .unique()
            .map(|name| StatRow {
                name: name.clone(),
                home: self.home.statistics.get(name).cloned(),
                away: self.away.statistics.get(name).cloned(),
            })
            .collect_vec()
    }
}

/// Which side of the fixture a competitor plays on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

/// One of the two teams in a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub side: Side,
    pub name: Option<String>,
    pub logo_url: Option<String>,
    pub score: Option<u32>,
    /// Most recent result first.
    pub recent_form: Vec<FormResult>,
    /// Display value per stat name, ordered by name.
    pub statistics: BTreeMap<String, String>,
}

impl Competitor {
    /// The team name, or `"Home"` / `"Away"` when the feed had none.
    pub fn display_name(&self) -> &str {
        match (&self.name, self.side) {
            (Some(name), _) => name,
            (None, Side::Home) => "Home",
            (None, Side::Away) => "Away",
        }
    }
}

/// A single letter of a team's recent form.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::EnumString,
    strum_macros::Display,
)]
pub enum FormResult {
    #[strum(serialize = "W")]
    Win,
    #[strum(serialize = "D")]
    Draw,
    #[strum(serialize = "L")]
    Loss,
}

/// Where a match stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live { clock: Option<String> },
    Completed,
}

impl MatchStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, MatchStatus::Live { .. })
    }
}

/// An in-match event such as a goal or a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub id: Option<String>,
    pub clock: Option<String>,
    pub description: Option<String>,
}

/// The season a match belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub year: Option<i32>,
    pub slug: Option<String>,
}

impl Season {
    /// Human-readable season label, e.g. `"2024 premier league"`.
    pub fn display_name(&self) -> String {
        let year = self.year.map(|y| y.to_string());
        let slug = self.slug.as_ref().map(|s| s.replace('-', " "));
        [year, slug].into_iter().flatten().join(" ")
    }
}

/// A statistic as reported by both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRow {
    pub name: String,
    pub home: Option<String>,
    pub away: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competitor(side: Side, stats: &[(&str, &str)]) -> Competitor {
        Competitor {
            side,
            name: None,
            logo_url: None,
            score: Some(0),
            recent_form: vec![],
            statistics: stats
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn event(id: &str) -> MatchEvent {
        MatchEvent {
            id: Some(id.to_string()),
            clock: Some("12'".to_string()),
            description: Some("Goal".to_string()),
        }
    }

    fn record(events: Vec<MatchEvent>) -> MatchRecord {
        MatchRecord {
            match_id: "55".to_string(),
            league_id: "eng.1".to_string(),
            home: competitor(Side::Home, &[("possessionPct", "61"), ("fouls", "8")]),
            away: competitor(Side::Away, &[("fouls", "11"), ("offsides", "2")]),
            status: MatchStatus::Completed,
            kickoff: None,
            events,
            season: None,
        }
    }

    #[test]
    fn test_retain_sub_event() {
        let mut r = record(vec![event("1"), event("2"), event("1")]);
        r.retain_sub_event("1");
        assert_eq!(r.events.len(), 2);
        assert!(r.events.iter().all(|e| e.id.as_deref() == Some("1")));
    }

    #[test]
    fn test_retain_sub_event_without_match_empties_events() {
        let mut r = record(vec![event("1"), event("2")]);
        r.retain_sub_event("9");
        assert!(r.events.is_empty());
    }

    #[test]
    fn test_stat_rows_merge_sides() {
        let rows = record(vec![]).stat_rows();
        let names = rows.iter().map(|r| r.name.as_str()).collect_vec();
        assert_eq!(names, vec!["fouls", "possessionPct", "offsides"]);

        let offsides = &rows[2];
        assert_eq!(offsides.home, None);
        assert_eq!(offsides.away.as_deref(), Some("2"));
    }

    #[test]
    fn test_display_names() {
        let c = competitor(Side::Away, &[]);
        assert_eq!(c.display_name(), "Away");

        let season = Season {
            year: Some(2024),
            slug: Some("premier-league".to_string()),
        };
        assert_eq!(season.display_name(), "2024 premier league");
        let season = Season {
            year: None,
            slug: None,
        };
        assert_eq!(season.display_name(), "");
    }

    #[test]
    fn test_form_letters() {
        assert_eq!("W".parse::<FormResult>().unwrap(), FormResult::Win);
        assert_eq!("L".parse::<FormResult>().unwrap(), FormResult::Loss);
        assert!("X".parse::<FormResult>().is_err());
        assert_eq!(FormResult::Draw.to_string(), "D");
    }

    #[test]
    fn test_record_survives_serde() {
        let mut r = record(vec![event("3")]);
        r.status = MatchStatus::Live {
            clock: Some("67'".to_string()),
        };
        let json = serde_json::to_string(&r).unwrap();
        let back: MatchRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
