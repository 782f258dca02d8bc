use std::path::PathBuf;
use std::time::Duration;

use crate::source::SourceKind;

/// All errors that can occur while fetching, converting, or persisting match data.
///
/// None of these reach the caller of [`crate::MatchResolver::resolve`]: the
/// resolver recovers from each one by advancing its fallback chain. They are
/// public so that custom [`crate::EventSource`] and [`crate::MatchStore`]
/// implementations can report failures in the same vocabulary.
#[derive(thiserror::Error, Debug)]
pub enum WidgetError {
    /// HTTP request failed (network, DNS, TLS, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Server returned a non-success HTTP status code.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Failed to read the response body as text.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// Response body was not the expected JSON shape.
    #[error("malformed json from {url}: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },

    /// A source did not answer within the fetch deadline.
    #[error("{source_kind} source timed out after {after:?}")]
    Timeout {
        source_kind: SourceKind,
        after: Duration,
    },

    /// The response parsed fine but held no event with the requested id.
    #[error("{source_kind} source has no event {match_id}")]
    NoMatchInResponse {
        source_kind: SourceKind,
        match_id: String,
    },

    /// The event carrying the requested id did not have the expected shape.
    #[error("event {match_id} is malformed: {source}")]
    MalformedEvent {
        match_id: String,
        source: serde_json::Error,
    },

    /// A feed event could not be turned into a match record.
    #[error("invalid match record: {context}")]
    InvalidRecord { context: &'static str },

    /// The persistence layer could not be read or written.
    #[error("cache io failed at {path}: {source}")]
    CacheIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A persisted record could not be encoded or decoded.
    #[error("cache entry {key} could not be (de)serialized: {source}")]
    CacheCodec {
        key: String,
        source: serde_json::Error,
    },

    /// A configuration value could not be parsed.
    #[error("invalid config value for {name}: {value:?}")]
    Config { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, WidgetError>;

/// Terminal outcome of a resolution: no live source had the match and
/// nothing was persisted for it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("no data for match {match_id}")]
pub struct NotFound {
    pub match_id: String,
}
