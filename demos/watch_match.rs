//! Follow one match and log every refresh.
//!
//!   cargo run --example watch_match -- <match id> [league] [sub-event id]
//!
//! Settings come from `MATCH_WIDGET_*` variables, optionally via `.env`.

use std::time::Duration;

use anyhow::Result;
use dotenv::dotenv;
use match_widget::{MatchClient, MatchRequest, Outcome, WidgetConfig};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const RUN_FOR: Duration = Duration::from_secs(120);

fn report(outcome: &Outcome) {
    match outcome {
        Ok(resolution) => {
            let record = &resolution.record;
            info!(
                origin = %resolution.origin,
                stale = resolution.is_stale(),
                status = ?record.status,
                "{} {} - {} {}",
                record.home.display_name(),
                record.home.score.unwrap_or_default(),
                record.away.score.unwrap_or_default(),
                record.away.display_name(),
            );
            for row in record.stat_rows() {
                info!(
                    "  {:<24} {:>8} - {:<8}",
                    row.name,
                    row.home.as_deref().unwrap_or("-"),
                    row.away.as_deref().unwrap_or("-"),
                );
            }
            for event in &record.events {
                info!(
                    "  [{}] {}",
                    event.clock.as_deref().unwrap_or("FT"),
                    event.description.as_deref().unwrap_or("Event"),
                );
            }
        }
        Err(not_found) => warn!("{not_found}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(match_id) = args.next() else {
        eprintln!("usage: watch_match <match id> [league] [sub-event id]");
        return Ok(());
    };
    let mut request = MatchRequest::new(match_id);
    if let Some(league) = args.next() {
        request = request.league(league);
    }
    if let Some(sub_event) = args.next() {
        request = request.sub_event(sub_event);
    }

    let config = WidgetConfig::from_env()?;
    info!(?request, interval = ?config.refresh_interval, "watching match");
    let client = MatchClient::from_config(config)?;

    let handle = client.watch(request, report);
    tokio::time::sleep(RUN_FOR).await;
    handle.stop().await;
    info!("done");
    Ok(())
}
