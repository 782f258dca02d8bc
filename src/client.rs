use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{MatchRequest, WidgetConfig};
use crate::error::{Result, WidgetError};
use crate::refresh::{self, MatchSink, RefreshHandle};
use crate::resolver::{MatchResolver, Outcome};
use crate::source::{HttpEventSource, SourceKind};
use crate::store::{FileStore, MatchStore, MemoryStore};

/// The main entry point for embedding a match widget.
///
/// `MatchClient` wires the two HTTP data sources and a store into a
/// [`MatchResolver`] and exposes one-shot and recurring resolution.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> match_widget::Result<()> {
/// use match_widget::{MatchClient, MatchRequest};
///
/// let client = MatchClient::new()?;
/// match client.resolve(&MatchRequest::new("704512")).await {
///     Ok(resolution) => println!(
///         "{} {:?} - {:?} {}",
///         resolution.record.home.display_name(),
///         resolution.record.home.score,
///         resolution.record.away.score,
///         resolution.record.away.display_name(),
///     ),
///     Err(not_found) => println!("{not_found}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct MatchClient {
    resolver: Arc<MatchResolver>,
    config: WidgetConfig,
}

impl MatchClient {
    /// Create a client with default settings and an in-memory cache.
    pub fn new() -> Result<Self> {
        Self::from_config(WidgetConfig::default())
    }

    /// Create a client from `config`, building its own [`reqwest::Client`].
    pub fn from_config(config: WidgetConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(WidgetError::ClientBuild)?;
        Ok(Self::with_client(http, config))
    }

    /// Create a client using the provided [`reqwest::Client`].
    ///
    /// Use this when you need to configure proxies, headers, etc.
    pub fn with_client(http: reqwest::Client, config: WidgetConfig) -> Self {
        let primary = HttpEventSource::new(http.clone(), &config.primary_url, SourceKind::Primary);
        let league_feed =
            HttpEventSource::new(http, &config.league_feed_url, SourceKind::LeagueFeed);
        let store: Arc<dyn MatchStore> = match &config.cache_dir {
            Some(dir) => Arc::new(FileStore::new(dir)),
            None => Arc::new(MemoryStore::new()),
        };
        info!(
            primary = %config.primary_url,
            league_feed = %config.league_feed_url,
            order = %config.source_order,
            "match client ready"
        );
        let resolver = MatchResolver::from_config(
            &config,
            Arc::new(primary),
            Arc::new(league_feed),
            store,
        );
        Self {
            resolver: Arc::new(resolver),
            config,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<MatchResolver> {
        &self.resolver
    }

    /// Resolve a match once.
    #[instrument(skip(self))]
    pub async fn resolve(&self, request: &MatchRequest) -> Outcome {
        self.resolver.resolve(request).await
    }

    /// Re-resolve a match every configured refresh interval until the handle
    /// is stopped or dropped. Must be called within a tokio runtime.
    pub fn watch(&self, request: MatchRequest, sink: impl MatchSink) -> RefreshHandle {
        refresh::watch(
            self.resolver.clone(),
            request,
            self.config.refresh_interval,
            sink,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_uses_default_league() {
        let client = MatchClient::new().unwrap();
        assert_eq!(client.resolver().default_league(), "eng.1");
    }

    #[tokio::test]
    async fn test_unreachable_sources_yield_not_found() {
        let config = WidgetConfig {
            primary_url: "http://127.0.0.1:9/primary".to_string(),
            league_feed_url: "http://127.0.0.1:9/feed".to_string(),
            ..WidgetConfig::default()
        };
        let client = MatchClient::from_config(config).unwrap();
        let outcome = client.resolve(&MatchRequest::new("55")).await;
        assert_eq!(outcome.unwrap_err().match_id, "55");
    }
}
