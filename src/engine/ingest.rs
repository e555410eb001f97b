use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::walker::RecordSink;
use crate::models::{ScrapeRecord, StateSnapshot};
use crate::store::{Store, StoreError};

/// Turns scraped records into idempotent store writes.
///
/// Records that reference an apartment the store has never seen are logged
/// and skipped: a half-rendered listing must not sink the rest of the walk.
/// Storage failures are returned to the walker, which treats them as
/// strikes.
pub struct Ingestor<'a> {
    store: &'a dyn Store,
    now: DateTime<Utc>,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a dyn Store, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }
}

#[async_trait]
impl RecordSink for Ingestor<'_> {
    async fn ingest(&mut self, record: ScrapeRecord) -> Result<(), StoreError> {
        match record {
            ScrapeRecord::Metadata(meta) => {
                let apartment_id = self.store.upsert_apartment(&meta).await?;
                match self.store.current_offer().await? {
                    Some(offer) => {
                        self.store.record_assignment(apartment_id, offer.id).await?;
                    }
                    None => {
                        // Virgin store: the offering walk that follows will
                        // open the offer and record the pairs.
                        debug!(name = %meta.name, "no offer yet, assignment deferred");
                    }
                }
            }

            ScrapeRecord::Offering(offering) => {
                let offer_id = self
                    .store
                    .resolve_or_create_offer(self.now, offering.ends_at)
                    .await?;
                match self.store.apartment_id(&offering.name).await? {
                    Some(apartment_id) => {
                        self.store.record_assignment(apartment_id, offer_id).await?;
                    }
                    None => {
                        warn!(name = %offering.name, "offering refers to unknown apartment, skipping");
                    }
                }
            }

            ScrapeRecord::State(state) => {
                let Some(apartment_id) = self.store.apartment_id(&state.name).await? else {
                    warn!(name = %state.name, "state refers to unknown apartment, skipping");
                    return Ok(());
                };
                let Some(offer) = self.store.current_offer().await? else {
                    warn!(name = %state.name, "no offer to attach state to, skipping");
                    return Ok(());
                };
                self.store
                    .append_state(&StateSnapshot {
                        observed_at: state.observed_at,
                        apartment_id,
                        offer_id: offer.id,
                        applicants: state.applicants,
                        top_credit: state.top_credit,
                    })
                    .await?;
            }
        }

        Ok(())
    }
}
