pub mod ingest;
pub mod scheduler;
pub mod walker;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};

use crate::models::CycleOutcome;
use crate::scrapers::{ListingSource, SourceError, WalkMode};
use crate::store::{Store, StoreError};

pub use ingest::Ingestor;
pub use scheduler::{decide, lead_delay, Action, ScheduleError};
pub use walker::{walk, EnumerationError, RecordSink, STRIKE_LIMIT};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("listing source: {0}")]
    Source(#[from] SourceError),

    #[error("enumeration aborted: {0}")]
    Enumeration(#[from] EnumerationError),

    #[error("schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Run one reconciliation cycle and fold whatever happened into exactly one
/// [`CycleOutcome`].
///
/// Nothing is retried here: the next externally scheduled invocation is the
/// retry mechanism, starting again from stored truth.
pub async fn run_cycle(
    store: &dyn Store,
    source: &dyn ListingSource,
    now: DateTime<Utc>,
) -> CycleOutcome {
    match reconcile(store, source, now).await {
        Ok(action) => {
            info!(?action, "cycle complete");
            CycleOutcome::Success
        }
        Err(err) => {
            error!(error = %err, "cycle failed");
            CycleOutcome::failure(err.to_string())
        }
    }
}

async fn reconcile(
    store: &dyn Store,
    source: &dyn ListingSource,
    mut now: DateTime<Utc>,
) -> Result<Action, CycleError> {
    let window = store.current_offer().await?;

    // Hold back when the window edge is minutes away, so the decision below
    // lands cleanly on one side of it.
    if let Some(offer) = &window {
        if let Some(delay) = scheduler::lead_delay(now, offer.ends_at) {
            info!(ends_at = %offer.ends_at, "offer edge close, delaying cycle");
            tokio::time::sleep(delay).await;
            now = now + chrono::Duration::seconds(delay.as_secs() as i64);
        }
    }

    let live = source.count().await?;
    let stored = store.current_offer_size().await?;
    info!(live, stored, "listing counts");

    let action = scheduler::decide(window.as_ref(), now, i64::from(live), stored)?;

    match action {
        Action::Idle => {}
        Action::StatePoll => {
            let mut sink = Ingestor::new(store, now);
            walker::walk(source, WalkMode::State, live, &mut sink).await?;
        }
        Action::FullRescan => {
            // Apartments first so the offering pass can resolve them by name.
            let mut sink = Ingestor::new(store, now);
            walker::walk(source, WalkMode::Metadata, live, &mut sink).await?;
            walker::walk(source, WalkMode::Offering, live, &mut sink).await?;
        }
    }

    Ok(action)
}
