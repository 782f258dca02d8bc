use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, WidgetError};
use crate::source::SourceOrder;

pub const DEFAULT_LEAGUE: &str = "eng.1";
pub const DEFAULT_PRIMARY_URL: &str = "https://api.totalsportslive.co.zw";
pub const DEFAULT_LEAGUE_FEED_URL: &str = "https://love-weld-nine.vercel.app/api/espn";

const ENV_PREFIX: &str = "MATCH_WIDGET_";

/// Settings shared by every widget instance.
///
/// Durations are given in whole seconds when deserialized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub default_league: String,
    pub primary_url: String,
    pub league_feed_url: String,
    #[serde(rename = "fetch_timeout_secs", deserialize_with = "secs")]
    pub fetch_timeout: Duration,
    #[serde(rename = "refresh_interval_secs", deserialize_with = "secs")]
    pub refresh_interval: Duration,
    pub source_order: SourceOrder,
    /// Persist records on disk here; kept in memory when unset.
    pub cache_dir: Option<PathBuf>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            default_league: DEFAULT_LEAGUE.to_string(),
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            league_feed_url: DEFAULT_LEAGUE_FEED_URL.to_string(),
            fetch_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30),
            source_order: SourceOrder::default(),
            cache_dir: None,
        }
    }
}

fn secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl WidgetConfig {
    /// Build a config from `MATCH_WIDGET_*` environment variables.
    ///
    /// Unset variables keep their defaults. Recognised names: `LEAGUE`,
    /// `PRIMARY_URL`, `LEAGUE_FEED_URL`, `FETCH_TIMEOUT_SECS`,
    /// `REFRESH_INTERVAL_SECS`, `SOURCE_ORDER` and `CACHE_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = lookup("LEAGUE") {
            config.default_league = v;
        }
        if let Some(v) = lookup("PRIMARY_URL") {
            config.primary_url = v;
        }
        if let Some(v) = lookup("LEAGUE_FEED_URL") {
            config.league_feed_url = v;
        }
        if let Some(v) = lookup("FETCH_TIMEOUT_SECS") {
            config.fetch_timeout = Duration::from_secs(parse("FETCH_TIMEOUT_SECS", v)?);
        }
        if let Some(v) = lookup("REFRESH_INTERVAL_SECS") {
            config.refresh_interval = Duration::from_secs(parse("REFRESH_INTERVAL_SECS", v)?);
        }
        if let Some(v) = lookup("SOURCE_ORDER") {
            config.source_order = parse("SOURCE_ORDER", v)?;
        }
        if let Some(v) = lookup("CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(v));
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| WidgetError::Config { name, value })
}

/// One widget's request: which match to resolve and how to narrow it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchRequest {
    pub league_id: Option<String>,
    pub match_id: String,
    pub sub_event_id: Option<String>,
}

impl MatchRequest {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            league_id: None,
            match_id: match_id.into(),
            sub_event_id: None,
        }
    }

    pub fn league(mut self, league_id: impl Into<String>) -> Self {
        self.league_id = Some(league_id.into());
        self
    }

    pub fn sub_event(mut self, sub_event_id: impl Into<String>) -> Self {
        self.sub_event_id = Some(sub_event_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WidgetConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WidgetConfig::default());
        assert_eq!(config.default_league, "eng.1");
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = WidgetConfig::from_lookup(lookup(&[
            ("LEAGUE", "esp.1"),
            ("FETCH_TIMEOUT_SECS", " 5 "),
            ("SOURCE_ORDER", "league-feed-first"),
            ("CACHE_DIR", "/var/cache/widget"),
        ]))
        .unwrap();
        assert_eq!(config.default_league, "esp.1");
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.source_order, SourceOrder::LeagueFeedFirst);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/widget")));
    }

    #[test]
    fn test_rejects_bad_number() {
        let err = WidgetConfig::from_lookup(lookup(&[("REFRESH_INTERVAL_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            WidgetError::Config {
                name: "REFRESH_INTERVAL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: WidgetConfig = serde_json::from_str(
            r#"{ "default_league": "ger.1", "refresh_interval_secs": 60, "source_order": "league-feed-first" }"#,
        )
        .unwrap();
        assert_eq!(config.default_league, "ger.1");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.source_order, SourceOrder::LeagueFeedFirst);
    }

    #[test]
    fn test_request_builder() {
        let request = MatchRequest::new("55").league("fra.1").sub_event("9");
        assert_eq!(request.league_id.as_deref(), Some("fra.1"));
        assert_eq!(request.sub_event_id.as_deref(), Some("9"));
    }
}
