use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::config::MatchRequest;
use crate::resolver::{MatchResolver, Outcome};

/// Receives every outcome of a recurring resolution, typically a renderer.
pub trait MatchSink: Send + Sync + 'static {
    fn deliver(&self, outcome: &Outcome);
}

impl<F> MatchSink for F
where
    F: Fn(&Outcome) + Send + Sync + 'static,
{
    fn deliver(&self, outcome: &Outcome) {
        self(outcome)
    }
}

/// Owner's handle on a recurring resolution started by [`watch`].
///
/// Dropping the handle stops the task as well; an in-flight resolution is
/// abandoned and its outcome never reaches the sink.
#[derive(Debug)]
pub struct RefreshHandle {
    match_id: String,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop refreshing and wait for the task to wind down.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Resolve `request` now and then every `interval` after each delivery,
/// handing each outcome to `sink`.
///
/// `NotFound` does not end the loop; every tick is an independent attempt.
pub fn watch(
    resolver: Arc<MatchResolver>,
    request: MatchRequest,
    interval: Duration,
    sink: impl MatchSink,
) -> RefreshHandle {
    let (stop_tx, stop_rx) = oneshot::channel();
    let match_id = request.match_id.clone();
    let task = tokio::spawn(refresh_loop(resolver, request, interval, sink, stop_rx));
    RefreshHandle {
        match_id,
        stop: Some(stop_tx),
        task,
    }
}

#[instrument(skip_all, fields(match_id = %request.match_id))]
async fn refresh_loop(
    resolver: Arc<MatchResolver>,
    request: MatchRequest,
    interval: Duration,
    sink: impl MatchSink,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticks: u64 = 0;
    loop {
        let outcome = tokio::select! {
            biased;
            _ = &mut stop => break,
            outcome = resolver.resolve(&request) => outcome,
        };
        ticks += 1;
        sink.deliver(&outcome);

        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(ticks, "refresh stopped");
}
