use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, instrument};

use crate::error::{Result, WidgetError};
use crate::model::FeedResponse;
use crate::source::{EventQuery, EventSource, SourceKind};

/// An [`EventSource`] backed by a JSON HTTP endpoint.
///
/// The query is appended as `league=<id>` and, when present, `id=<match id>`.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    http: reqwest::Client,
    base_url: String,
    kind: SourceKind,
}

impl HttpEventSource {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            kind,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub(crate) fn url_for(&self, query: &EventQuery<'_>) -> Result<Url> {
        let mut params = vec![("league", query.league_id)];
        if let Some(match_id) = query.match_id {
            params.push(("id", match_id));
        }
        Url::parse_with_params(&self.base_url, &params).map_err(|_| WidgetError::Config {
            name: "source url",
            value: self.base_url.clone(),
        })
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    #[instrument(skip(self))]
    async fn fetch_events(&self, query: &EventQuery<'_>) -> Result<FeedResponse> {
        let url = self.url_for(query)?;
        debug!(kind = %self.kind, "querying source");
        get_feed(&self.http, url).await
    }
}

/// Fetch a URL and decode the body as a [`FeedResponse`].
pub(crate) async fn get_feed(client: &reqwest::Client, url: Url) -> Result<FeedResponse> {
    let url_text = url.to_string();
    debug!(url = %url_text, "fetching feed");

    let response = client.get(url).send().await.map_err(|e| WidgetError::Http {
        url: url_text.clone(),
        source: e,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(WidgetError::UnexpectedStatus {
            url: url_text,
            status,
        });
    }

    let body = response.text().await.map_err(|e| WidgetError::ResponseBody {
        url: url_text.clone(),
        source: e,
    })?;

    let feed: FeedResponse = serde_json::from_str(&body).map_err(|e| WidgetError::Json {
        url: url_text.clone(),
        source: e,
    })?;
    debug!(url = %url_text, events = feed.events.len(), "decoded feed");
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_url_carries_id() {
        let source = HttpEventSource::new(
            reqwest::Client::new(),
            "https://api.totalsportslive.co.zw",
            SourceKind::Primary,
        );
        let url = source
            .url_for(&EventQuery {
                league_id: "eng.1",
                match_id: Some("55"),
            })
            .unwrap();
        assert_eq!(url.as_str(), "https://api.totalsportslive.co.zw/?league=eng.1&id=55");
    }

    #[test]
    fn test_league_feed_url_has_no_id() {
        let source = HttpEventSource::new(
            reqwest::Client::new(),
            "https://love-weld-nine.vercel.app/api/espn",
            SourceKind::LeagueFeed,
        );
        let url = source
            .url_for(&EventQuery {
                league_id: "esp.1",
                match_id: None,
            })
            .unwrap();
        assert_eq!(url.as_str(), "https://love-weld-nine.vercel.app/api/espn?league=esp.1");
    }

    #[test]
    fn test_bad_base_url_is_config_error() {
        let source = HttpEventSource::new(reqwest::Client::new(), "not a url", SourceKind::Primary);
        let err = source
            .url_for(&EventQuery {
                league_id: "eng.1",
                match_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, WidgetError::Config { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let source = HttpEventSource::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/feed",
            SourceKind::LeagueFeed,
        );
        let err = source
            .fetch_events(&EventQuery {
                league_id: "eng.1",
                match_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WidgetError::Http { .. }));
    }
}
