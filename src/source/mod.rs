pub(crate) mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::FeedResponse;

pub use http::HttpEventSource;

/// Which step of the fallback chain a source serves.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SourceKind {
    /// Queried by league and match id.
    Primary,
    /// Queried by league only; returns every current event of the league.
    LeagueFeed,
}

/// Order in which the two live sources are consulted.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SourceOrder {
    #[default]
    PrimaryFirst,
    LeagueFeedFirst,
}

impl SourceOrder {
    pub fn steps(self) -> [SourceKind; 2] {
        match self {
            SourceOrder::PrimaryFirst => [SourceKind::Primary, SourceKind::LeagueFeed],
            SourceOrder::LeagueFeedFirst => [SourceKind::LeagueFeed, SourceKind::Primary],
        }
    }
}

/// Parameters of a single source lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery<'a> {
    pub league_id: &'a str,
    /// Only sent to sources that filter by id.
    pub match_id: Option<&'a str>,
}

/// A provider of current events for a league.
///
/// Implementations return the whole decoded collection; the resolver does the
/// identifier matching itself.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self, query: &EventQuery<'_>) -> Result<FeedResponse>;
}
