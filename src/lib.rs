//! Resolve a football match's score, status, statistics and events for an
//! embeddable widget.
//!
//! A [`MatchResolver`] asks the id-filtered primary source first, then the
//! league-wide feed, and finally serves the last persisted record marked stale.
//! [`MatchClient`] wires it to HTTP sources and a store from [`WidgetConfig`].

mod client;
mod config;
mod error;
pub mod model;
mod refresh;
mod resolver;
mod source;
mod store;

pub use client::MatchClient;
pub use config::{
    MatchRequest, WidgetConfig, DEFAULT_LEAGUE, DEFAULT_LEAGUE_FEED_URL, DEFAULT_PRIMARY_URL,
};
pub use error::{NotFound, Result, WidgetError};
pub use model::*;
pub use refresh::{watch, MatchSink, RefreshHandle};
pub use resolver::{MatchResolver, Origin, Outcome, Resolution};
pub use source::{EventQuery, EventSource, HttpEventSource, SourceKind, SourceOrder};
pub use store::{cache_key, FileStore, MatchStore, MemoryStore};
