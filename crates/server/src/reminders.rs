use std::sync::Arc;
use std::time::Duration;

use hrdesk_engine::RequestService;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Re-prompts approvers for every open request once per `period`.
///
/// The first sweep runs one full period after start-up.
pub fn spawn(
    service: Arc<RequestService>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            event_name = "reminders.sweep.scheduled",
            correlation_id = "bootstrap",
            period_secs = period.as_secs(),
            "approval reminder sweep scheduled"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => sweep(&service).await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

async fn sweep(service: &RequestService) {
    if let Err(error) = service.send_reminders().await {
        warn!(
            event_name = "reminders.sweep.failed",
            correlation_id = "reminders",
            error = %error,
            "approval reminder sweep failed; retrying next period"
        );
    }
}
